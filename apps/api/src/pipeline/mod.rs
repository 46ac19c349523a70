// Run orchestration: the session-owned state cell, the staged generation pipeline and its
// HTTP handlers. All remote work goes through the collaborator traits.

pub mod handlers;
pub mod session;
pub mod state;

pub use session::Session;
pub use state::{PipelineRunState, Stage};
