use std::sync::Arc;

use crate::pipeline::Session;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single current-run session. Starting a run supersedes whatever was in flight.
    pub session: Arc<Session>,
}
