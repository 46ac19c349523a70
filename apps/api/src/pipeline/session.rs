//! Generation Orchestrator.
//!
//! # Architecture
//! - One `Session` owns the current run's [`PipelineRunState`] inside a `watch` channel.
//!   Every stage transition is broadcast, so the narrative is visible to subscribers the
//!   moment it lands, before the image call starts.
//! - `begin_run` allocates a run id and resets the state; `drive` executes the stages as a
//!   plain series of awaits. `start_run` does both.
//! - Every mutation is guarded by run id. A stage that finishes after a newer run began
//!   changes nothing and the older `drive` returns [`RunOutcome::Superseded`].
//! - Export recomputes the layout from scratch on the blocking pool.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::errors::PipelineError;
use crate::generation::{IllustrationSynthesizer, NarrativeSynthesizer};
use crate::layout::PageMetrics;
use crate::models::{GeneratedNarrative, IllustrationAsset, SourceExcerpt};
use crate::pipeline::state::{ExportSummary, PipelineRunState, Stage, StageStatus};
use crate::render::{export_document, ExportedDocument};
use crate::sources::{select_excerpts, ExcerptSource, FetchMode};

const EXPORT_MISSING_INPUTS: &str = "story, image, or sources are missing";
const EXPORT_IN_PROGRESS: &str = "an export is already in progress";
const BLANK_IMAGE_PROMPT: &str = "Could not generate an image prompt for the story.";

/// Handle for a run created by [`Session::begin_run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTicket {
    pub run_id: u64,
    pub mode: FetchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The run reached `Ready`. The image may still have failed; see the state.
    Ready { run_id: u64 },
    /// A newer run started before this one finished; its results were discarded.
    Superseded { run_id: u64 },
}

pub struct Session {
    source: Arc<dyn ExcerptSource>,
    narrative: NarrativeSynthesizer,
    illustration: IllustrationSynthesizer,
    metrics: PageMetrics,
    export_dir: Option<PathBuf>,
    last_run_id: AtomicU64,
    state: watch::Sender<PipelineRunState>,
}

impl Session {
    pub fn new(
        source: Arc<dyn ExcerptSource>,
        narrative: NarrativeSynthesizer,
        illustration: IllustrationSynthesizer,
        metrics: PageMetrics,
    ) -> Self {
        let (state, _) = watch::channel(PipelineRunState::default());
        Self {
            source,
            narrative,
            illustration,
            metrics,
            export_dir: None,
            last_run_id: AtomicU64::new(0),
            state,
        }
    }

    /// Also write every successful export into `dir`.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    pub fn snapshot(&self) -> PipelineRunState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineRunState> {
        self.state.subscribe()
    }

    /// Makes a new run current and resets the state for it.
    pub fn begin_run(&self, mode: FetchMode) -> RunTicket {
        // Id allocation and reset happen under the channel lock, so the newest id is
        // always the one left current.
        let mut run_id = 0;
        self.state.send_modify(|state| {
            run_id = self.last_run_id.fetch_add(1, Ordering::SeqCst) + 1;
            *state = PipelineRunState::fresh(run_id, mode);
        });
        info!(run_id, ?mode, "Run started");
        RunTicket { run_id, mode }
    }

    /// Begins a run and drives it to completion.
    pub async fn start_run(&self, mode: FetchMode) -> Result<RunOutcome, PipelineError> {
        let ticket = self.begin_run(mode);
        self.drive(ticket).await
    }

    /// Runs fetch, narrative and image stages for `ticket`.
    ///
    /// Returns `Err` when the fetch or narrative stage fails; the error is also recorded in
    /// the state. Image failures are recorded and the run still ends `Ready`.
    pub async fn drive(&self, ticket: RunTicket) -> Result<RunOutcome, PipelineError> {
        let run_id = ticket.run_id;

        // 1. Sources
        let excerpts = match self.fetch_excerpts(ticket.mode).await {
            Ok(excerpts) => excerpts,
            Err(err) => {
                return self.fail_run(run_id, err, |state, err| {
                    state.sources = StageStatus::Failed(err);
                })
            }
        };
        info!(run_id, count = excerpts.len(), "Sources fetched");
        let texts: Vec<String> = excerpts.iter().map(|e| e.text.clone()).collect();
        let applied = self.update(run_id, |state| {
            state.sources = StageStatus::Succeeded(excerpts);
            state.narrative = StageStatus::InProgress;
            state.stage = Stage::SynthesizingNarrative;
        });
        if !applied {
            return Ok(self.superseded(run_id));
        }

        // 2. Narrative
        let narrative = match self.narrative.synthesize(&texts).await {
            Ok(narrative) => narrative,
            Err(err) => {
                return self.fail_run(run_id, err, |state, err| {
                    state.narrative = StageStatus::Failed(err);
                })
            }
        };
        let image_prompt = narrative.image_prompt.clone();
        let applied = self.update(run_id, |state| {
            state.narrative = StageStatus::Succeeded(narrative);
            state.image = StageStatus::InProgress;
            state.stage = Stage::SynthesizingImage;
        });
        if !applied {
            return Ok(self.superseded(run_id));
        }

        // 3. Image
        let image = if image_prompt.trim().is_empty() {
            Err(PipelineError::ImageGenerationFailed(
                BLANK_IMAGE_PROMPT.to_string(),
            ))
        } else {
            self.illustration.synthesize(&image_prompt).await
        };
        if let Err(err) = &image {
            warn!(run_id, kind = err.kind(), "Image stage failed: {err}");
        }
        let applied = self.update(run_id, |state| {
            state.image = StageStatus::from_result(image);
            state.stage = Stage::Ready;
        });
        if !applied {
            return Ok(self.superseded(run_id));
        }

        info!(run_id, "Run ready");
        Ok(RunOutcome::Ready { run_id })
    }

    /// Renders the current run as a PDF.
    ///
    /// Requires a `Ready` run with a narrative, an image and at least one source. Success
    /// or failure is recorded in the export field only.
    pub async fn export_current_run(&self) -> Result<ExportedDocument, PipelineError> {
        let snapshot = self.snapshot();
        if snapshot.stage() == Stage::Exporting {
            let err = PipelineError::ExportPreconditionFailed(EXPORT_IN_PROGRESS.to_string());
            warn!(run_id = ?snapshot.run_id, "Export rejected: {err}");
            return Err(err);
        }
        let inputs = match (snapshot.run_id, snapshot.narrative(), snapshot.image()) {
            (Some(run_id), Some(narrative), Some(image))
                if snapshot.stage() == Stage::Ready && !snapshot.sources().is_empty() =>
            {
                Some((run_id, narrative.clone(), image.clone()))
            }
            _ => None,
        };
        let Some((run_id, narrative, image)) = inputs else {
            let err = PipelineError::ExportPreconditionFailed(EXPORT_MISSING_INPUTS.to_string());
            warn!(run_id = ?snapshot.run_id, stage = ?snapshot.stage(), "Export rejected: {err}");
            if let Some(run_id) = snapshot.run_id {
                self.update(run_id, |state| {
                    state.export = StageStatus::Failed(err.clone());
                });
            }
            return Err(err);
        };
        let sources = snapshot.sources().to_vec();

        self.update(run_id, |state| {
            state.export = StageStatus::InProgress;
            state.stage = Stage::Exporting;
        });

        let result = self.render(narrative, image, sources).await;

        let applied = self.update(run_id, |state| {
            state.export = StageStatus::from_result(
                result
                    .as_ref()
                    .map(|(_, summary)| summary.clone())
                    .map_err(Clone::clone),
            );
            state.stage = Stage::Ready;
        });
        if !applied {
            debug!(run_id, "Export finished after a newer run started");
        }

        match result {
            Ok((document, summary)) => {
                info!(
                    run_id,
                    filename = %summary.filename,
                    pages = summary.page_count,
                    "Export complete"
                );
                Ok(document)
            }
            Err(err) => {
                error!(run_id, "Export failed: {err}");
                Err(err)
            }
        }
    }

    async fn render(
        &self,
        narrative: GeneratedNarrative,
        image: IllustrationAsset,
        sources: Vec<SourceExcerpt>,
    ) -> Result<(ExportedDocument, ExportSummary), PipelineError> {
        let metrics = self.metrics.clone();
        let document = tokio::task::spawn_blocking(move || {
            export_document(&narrative, &image, &sources, &metrics)
        })
        .await
        .map_err(|e| PipelineError::ExportFailed(e.to_string()))?
        .map_err(|e| PipelineError::ExportFailed(e.to_string()))?;

        let saved_to = match &self.export_dir {
            Some(dir) => {
                let path = document
                    .save_in(dir)
                    .await
                    .map_err(|e| PipelineError::ExportFailed(e.to_string()))?;
                Some(path.display().to_string())
            }
            None => None,
        };

        let summary = ExportSummary {
            filename: document.filename.clone(),
            page_count: document.page_count,
            saved_to,
        };
        Ok((document, summary))
    }

    async fn fetch_excerpts(&self, mode: FetchMode) -> Result<Vec<SourceExcerpt>, PipelineError> {
        let pool = self
            .source
            .fetch(mode.pool_size())
            .await
            .map_err(|e| PipelineError::SourceFetchFailed(e.to_string()))?;
        debug!(?mode, pool = pool.len(), "Excerpt pool received");

        let selected = select_excerpts(pool, mode, &mut rand::thread_rng());
        if selected.is_empty() {
            return Err(PipelineError::SourceFetchFailed(
                "the source returned no excerpts".to_string(),
            ));
        }
        Ok(selected)
    }

    /// Records a fatal stage failure and marks the run `Failed`.
    fn fail_run(
        &self,
        run_id: u64,
        err: PipelineError,
        record: impl FnOnce(&mut PipelineRunState, PipelineError),
    ) -> Result<RunOutcome, PipelineError> {
        let applied = self.update(run_id, |state| {
            record(state, err.clone());
            state.stage = Stage::Failed;
        });
        if !applied {
            return Ok(self.superseded(run_id));
        }
        error!(run_id, kind = err.kind(), "Run failed: {err}");
        Err(err)
    }

    fn superseded(&self, run_id: u64) -> RunOutcome {
        debug!(run_id, "Discarding result of superseded run");
        RunOutcome::Superseded { run_id }
    }

    /// Applies `mutate` only if `run_id` is still the current run. Returns whether it did.
    fn update(&self, run_id: u64, mutate: impl FnOnce(&mut PipelineRunState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.run_id != Some(run_id) {
                return false;
            }
            mutate(state);
            state.updated_at = Utc::now();
            true
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
