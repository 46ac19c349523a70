pub mod excerpt;
pub mod illustration;
pub mod narrative;

pub use excerpt::SourceExcerpt;
pub use illustration::IllustrationAsset;
pub use narrative::GeneratedNarrative;
