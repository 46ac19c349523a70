//! Scripted collaborators for unit tests.
//!
//! Each mock replays a fixed list of replies in call order and records every request.
//! A `Notify` gate can hold a chosen call open until the test releases it.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use crate::llm_client::{
    GeneratedImage, ImageGenerationRequest, ImageGenerationResponse, ImageGenerator, LlmError,
    TextGenerationRequest, TextGenerationResponse, TextGenerator,
};
use crate::models::SourceExcerpt;
use crate::sources::{ExcerptSource, SourceError};

/// Holds call number `call_index` (0-based) until `gate` is notified.
#[derive(Clone)]
struct Gate {
    call_index: usize,
    notify: Arc<Notify>,
}

struct CallLog<R> {
    requests: Vec<R>,
}

impl<R> CallLog<R> {
    fn new() -> Mutex<Self> {
        Mutex::new(Self {
            requests: Vec::new(),
        })
    }
}

/// Increments the log and returns the 0-based index of this call.
fn record<R>(log: &Mutex<CallLog<R>>, request: R) -> usize {
    let mut log = log.lock().unwrap();
    log.requests.push(request);
    log.requests.len() - 1
}

async fn pass_gate(gate: &Option<Gate>, call: usize) {
    if let Some(gate) = gate {
        if gate.call_index == call {
            gate.notify.notified().await;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Text
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum TextReply {
    Text(String),
    ApiError(u16),
}

impl TextReply {
    pub fn ok(text: impl Into<String>) -> Self {
        TextReply::Text(text.into())
    }

    pub fn api_error(status: u16) -> Self {
        TextReply::ApiError(status)
    }
}

pub struct MockTextGenerator {
    replies: Vec<TextReply>,
    log: Mutex<CallLog<TextGenerationRequest>>,
    gate: Option<Gate>,
}

impl MockTextGenerator {
    pub fn new(replies: Vec<TextReply>) -> Self {
        Self {
            replies,
            log: CallLog::new(),
            gate: None,
        }
    }

    /// Blocks call `call_index` until `notify` fires.
    pub fn gated(mut self, call_index: usize, notify: Arc<Notify>) -> Self {
        self.gate = Some(Gate { call_index, notify });
        self
    }

    pub fn call_count(&self) -> usize {
        self.log.lock().unwrap().requests.len()
    }

    pub fn requests(&self) -> Vec<TextGenerationRequest> {
        self.log.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, LlmError> {
        let call = record(&self.log, request.clone());
        pass_gate(&self.gate, call).await;

        match self.replies.get(call) {
            Some(TextReply::Text(text)) => Ok(TextGenerationResponse { text: text.clone() }),
            Some(TextReply::ApiError(status)) => Err(LlmError::Api {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Image
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum ImageReply {
    Images(Vec<GeneratedImage>),
    ApiError(u16),
}

impl ImageReply {
    pub fn images(images: Vec<(Vec<u8>, &str)>) -> Self {
        ImageReply::Images(
            images
                .into_iter()
                .map(|(bytes, mime)| GeneratedImage {
                    bytes: Bytes::from(bytes),
                    mime_type: mime.to_string(),
                })
                .collect(),
        )
    }

    pub fn api_error(status: u16) -> Self {
        ImageReply::ApiError(status)
    }
}

pub struct MockImageGenerator {
    replies: Vec<ImageReply>,
    log: Mutex<CallLog<ImageGenerationRequest>>,
    gate: Option<Gate>,
}

impl MockImageGenerator {
    pub fn new(replies: Vec<ImageReply>) -> Self {
        Self {
            replies,
            log: CallLog::new(),
            gate: None,
        }
    }

    pub fn gated(mut self, call_index: usize, notify: Arc<Notify>) -> Self {
        self.gate = Some(Gate { call_index, notify });
        self
    }

    pub fn call_count(&self) -> usize {
        self.log.lock().unwrap().requests.len()
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, LlmError> {
        let call = record(&self.log, request.clone());
        pass_gate(&self.gate, call).await;

        match self.replies.get(call) {
            Some(ImageReply::Images(images)) => Ok(ImageGenerationResponse {
                images: images.clone(),
            }),
            Some(ImageReply::ApiError(status)) => Err(LlmError::Api {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Source
// ────────────────────────────────────────────────────────────────────────────

pub struct MockSource {
    excerpts: Option<Vec<SourceExcerpt>>,
    requested: Mutex<Vec<usize>>,
}

impl MockSource {
    /// Serves `excerpts`, truncated to the requested count.
    pub fn with(excerpts: Vec<SourceExcerpt>) -> Self {
        Self {
            excerpts: Some(excerpts),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Every fetch fails with a 503.
    pub fn failing() -> Self {
        Self {
            excerpts: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_counts(&self) -> Vec<usize> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExcerptSource for MockSource {
    async fn fetch(&self, count: usize) -> Result<Vec<SourceExcerpt>, SourceError> {
        self.requested.lock().unwrap().push(count);
        match &self.excerpts {
            Some(excerpts) => Ok(excerpts.iter().take(count).cloned().collect()),
            None => Err(SourceError::Status(503)),
        }
    }
}

/// `n` distinct excerpts: `excerpt 1` .. `excerpt n`.
pub fn excerpts(n: usize) -> Vec<SourceExcerpt> {
    (1..=n)
        .map(|i| {
            SourceExcerpt::new(
                format!("excerpt {i}"),
                format!("r/topic{i}"),
                format!("https://www.reddit.com/r/topic{i}/comments/{i}/"),
            )
        })
        .collect()
}

/// A narrative reply in the backend's wire shape.
pub fn story_json(title: &str, story: &str, image_prompt: &str) -> String {
    serde_json::json!({
        "title": title,
        "story": story,
        "imagePrompt": image_prompt,
    })
    .to_string()
}
