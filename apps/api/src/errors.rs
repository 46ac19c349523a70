use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{ser::SerializeStruct, Serialize, Serializer};
use serde_json::json;
use thiserror::Error;

/// Failure of one pipeline stage.
///
/// `SourceFetchFailed` and the three narrative kinds are fatal to a run. Image kinds are
/// recorded next to an otherwise usable narrative. Export kinds are per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Failed to fetch source excerpts: {0}")]
    SourceFetchFailed(String),

    #[error("The AI returned a malformed story structure: {0}")]
    MalformedNarrativeResponse(String),

    #[error("The AI response was not in the expected format: {0}")]
    IncompleteNarrativeResponse(String),

    #[error("The AI failed to generate a story: {0}")]
    NarrativeGenerationFailed(String),

    #[error("The AI did not generate an image. This could be due to safety filters or a temporary issue.")]
    NoImageReturned,

    #[error("The AI failed to generate an image: {0}")]
    ImageGenerationFailed(String),

    #[error("Cannot export the document: {0}")]
    ExportPreconditionFailed(String),

    #[error("Document export failed: {0}")]
    ExportFailed(String),
}

impl PipelineError {
    /// Stable machine-readable name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceFetchFailed(_) => "SourceFetchFailed",
            PipelineError::MalformedNarrativeResponse(_) => "MalformedNarrativeResponse",
            PipelineError::IncompleteNarrativeResponse(_) => "IncompleteNarrativeResponse",
            PipelineError::NarrativeGenerationFailed(_) => "NarrativeGenerationFailed",
            PipelineError::NoImageReturned => "NoImageReturned",
            PipelineError::ImageGenerationFailed(_) => "ImageGenerationFailed",
            PipelineError::ExportPreconditionFailed(_) => "ExportPreconditionFailed",
            PipelineError::ExportFailed(_) => "ExportFailed",
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Pipeline(e @ PipelineError::ExportPreconditionFailed(_)) => {
                (StatusCode::CONFLICT, e.kind(), e.to_string())
            }
            AppError::Pipeline(e @ PipelineError::ExportFailed(_)) => {
                tracing::error!("Export error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.kind(), e.to_string())
            }
            AppError::Pipeline(e) => {
                tracing::error!("Pipeline error: {e}");
                (StatusCode::BAD_GATEWAY, e.kind(), e.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
