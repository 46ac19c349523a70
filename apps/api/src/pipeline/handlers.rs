//! Axum route handlers for the Runs API.

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, PipelineError};
use crate::pipeline::PipelineRunState;
use crate::sources::{FetchMode, UnknownFetchMode};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    /// `curated` (alias `hot`) or `randomized` (alias `random`).
    pub mode: String,
}

#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: u64,
    pub mode: FetchMode,
}

/// The run state plus the two flags a presentation layer renders first.
#[derive(Debug, Serialize)]
pub struct RunSnapshotResponse {
    #[serde(flatten)]
    pub state: PipelineRunState,
    pub loading: bool,
    /// The failure that ended the run (fetch or narrative); image and export errors
    /// stay in their own fields.
    pub error: Option<PipelineError>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/runs
///
/// Makes a new run current and drives it in a background task. Poll
/// `GET /api/v1/runs/current` for progress; the narrative appears before the image.
pub async fn handle_start_run(
    State(state): State<AppState>,
    Json(request): Json<StartRunRequest>,
) -> Result<(StatusCode, Json<StartRunResponse>), AppError> {
    let mode: FetchMode = request
        .mode
        .parse()
        .map_err(|e: UnknownFetchMode| AppError::Validation(e.to_string()))?;

    let ticket = state.session.begin_run(mode);
    let session = state.session.clone();
    tokio::spawn(async move {
        // Outcome and failures are recorded in the session state.
        let _ = session.drive(ticket).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            run_id: ticket.run_id,
            mode,
        }),
    ))
}

/// GET /api/v1/runs/current
pub async fn handle_get_current_run(State(state): State<AppState>) -> Json<RunSnapshotResponse> {
    let snapshot = state.session.snapshot();
    Json(RunSnapshotResponse {
        loading: snapshot.is_loading(),
        error: snapshot.primary_error().cloned(),
        state: snapshot,
    })
}

/// POST /api/v1/runs/current/export
///
/// Renders the current run and returns the PDF as an attachment.
pub async fn handle_export_current_run(
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let document = state.session.export_current_run().await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        document.filename
    ))
    .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}
