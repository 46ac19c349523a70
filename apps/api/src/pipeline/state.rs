//! Observable state of the current run.
//!
//! Each stage's outcome is a [`StageStatus`], so a field can never be both present and
//! failed. `stage` is `Failed` exactly when the sources or narrative stage failed; image
//! and export failures sit next to a `Ready` stage.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::PipelineError;
use crate::models::{GeneratedNarrative, IllustrationAsset, SourceExcerpt};
use crate::sources::FetchMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    FetchingSources,
    SynthesizingNarrative,
    SynthesizingImage,
    Ready,
    Exporting,
    Failed,
}

impl Stage {
    /// A stage with a remote call or export outstanding.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Stage::FetchingSources
                | Stage::SynthesizingNarrative
                | Stage::SynthesizingImage
                | Stage::Exporting
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum StageStatus<T> {
    NotStarted,
    InProgress,
    Succeeded(T),
    Failed(PipelineError),
}

impl<T> StageStatus<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            StageStatus::Succeeded(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            StageStatus::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, StageStatus::InProgress)
    }

    pub fn from_result(result: Result<T, PipelineError>) -> Self {
        match result {
            Ok(v) => StageStatus::Succeeded(v),
            Err(e) => StageStatus::Failed(e),
        }
    }
}

/// What the last successful export produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub filename: String,
    pub page_count: usize,
    /// Where the document was written, when an export directory is configured.
    pub saved_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRunState {
    /// `None` until the first run begins.
    pub run_id: Option<u64>,
    pub mode: Option<FetchMode>,
    pub stage: Stage,
    pub sources: StageStatus<Vec<SourceExcerpt>>,
    pub narrative: StageStatus<GeneratedNarrative>,
    pub image: StageStatus<IllustrationAsset>,
    pub export: StageStatus<ExportSummary>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PipelineRunState {
    fn default() -> Self {
        Self {
            run_id: None,
            mode: None,
            stage: Stage::Idle,
            sources: StageStatus::NotStarted,
            narrative: StageStatus::NotStarted,
            image: StageStatus::NotStarted,
            export: StageStatus::NotStarted,
            updated_at: Utc::now(),
        }
    }
}

impl PipelineRunState {
    /// Clean state for a run that is about to fetch its sources.
    pub fn fresh(run_id: u64, mode: FetchMode) -> Self {
        Self {
            run_id: Some(run_id),
            mode: Some(mode),
            stage: Stage::FetchingSources,
            sources: StageStatus::InProgress,
            ..Self::default()
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Selected excerpts; empty until the fetch stage succeeds.
    pub fn sources(&self) -> &[SourceExcerpt] {
        self.sources.value().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn narrative(&self) -> Option<&GeneratedNarrative> {
        self.narrative.value()
    }

    pub fn image(&self) -> Option<&IllustrationAsset> {
        self.image.value()
    }

    /// The failure that ended the run, if any.
    pub fn primary_error(&self) -> Option<&PipelineError> {
        self.sources.error().or_else(|| self.narrative.error())
    }

    pub fn is_loading(&self) -> bool {
        self.stage.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle_and_empty() {
        let state = PipelineRunState::default();
        assert_eq!(state.stage(), Stage::Idle);
        assert_eq!(state.run_id, None);
        assert!(state.sources().is_empty());
        assert!(state.narrative().is_none());
        assert!(state.primary_error().is_none());
        assert!(!state.is_loading());
    }

    #[test]
    fn test_fresh_state_is_fetching() {
        let state = PipelineRunState::fresh(7, FetchMode::Randomized);
        assert_eq!(state.run_id, Some(7));
        assert_eq!(state.stage(), Stage::FetchingSources);
        assert!(state.sources.is_in_progress());
        assert_eq!(state.narrative, StageStatus::NotStarted);
        assert!(state.is_loading());
    }

    #[test]
    fn test_primary_error_prefers_sources() {
        let mut state = PipelineRunState::fresh(1, FetchMode::Curated);
        state.sources = StageStatus::Failed(PipelineError::SourceFetchFailed("down".into()));
        state.stage = Stage::Failed;
        assert_eq!(
            state.primary_error().map(PipelineError::kind),
            Some("SourceFetchFailed")
        );
    }

    #[test]
    fn test_image_error_is_not_primary() {
        let mut state = PipelineRunState::fresh(1, FetchMode::Curated);
        state.image = StageStatus::Failed(PipelineError::NoImageReturned);
        assert!(state.primary_error().is_none());
        assert_eq!(state.image.error(), Some(&PipelineError::NoImageReturned));
    }

    #[test]
    fn test_stage_status_serializes_tagged() {
        let status: StageStatus<u32> = StageStatus::Succeeded(3);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"status": "succeeded", "value": 3}));

        let failed: StageStatus<u32> = StageStatus::Failed(PipelineError::NoImageReturned);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["value"]["kind"], "NoImageReturned");

        let idle: StageStatus<u32> = StageStatus::NotStarted;
        assert_eq!(
            serde_json::to_value(&idle).unwrap(),
            serde_json::json!({"status": "not_started"})
        );
    }
}
