// Generation: narrative and illustration synthesis over the backend-neutral LLM traits.
// All LLM calls go through llm_client; no direct Gemini HTTP calls here.

pub mod illustration;
pub mod narrative;
pub mod prompts;

pub use illustration::IllustrationSynthesizer;
pub use narrative::NarrativeSynthesizer;
