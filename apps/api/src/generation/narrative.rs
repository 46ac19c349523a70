//! Narrative Synthesizer: turns source excerpts into a titled story and an image prompt.
//!
//! One structured-output request per call. The raw response is validated here; the
//! text backend is never trusted to honour the schema.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::generation::prompts::{
    IMAGE_PROMPT_DESCRIPTION, NARRATIVE_PROMPT_TEMPLATE, NARRATIVE_SYSTEM, STORY_DESCRIPTION,
    TITLE_DESCRIPTION,
};
use crate::llm_client::{strip_json_fences, TextGenerationRequest, TextGenerator};
use crate::models::GeneratedNarrative;

const NARRATIVE_TEMPERATURE: f32 = 0.8;

#[derive(Clone)]
pub struct NarrativeSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl NarrativeSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Synthesizes a narrative from the excerpt texts, in the given order.
    pub async fn synthesize(
        &self,
        excerpt_texts: &[String],
    ) -> Result<GeneratedNarrative, PipelineError> {
        if excerpt_texts.is_empty() {
            return Err(PipelineError::NarrativeGenerationFailed(
                "no excerpts were supplied".to_string(),
            ));
        }

        let request = build_narrative_request(excerpt_texts);
        let response = self.generator.generate_text(&request).await.map_err(|e| {
            warn!("Narrative generation call failed: {e}");
            PipelineError::NarrativeGenerationFailed(e.to_string())
        })?;

        let narrative = parse_narrative_response(&response.text)?;
        info!(
            title = %narrative.title,
            body_chars = narrative.body.len(),
            "Narrative synthesized"
        );
        Ok(narrative)
    }
}

/// Builds the single request sent to the text backend.
pub(crate) fn build_narrative_request(excerpt_texts: &[String]) -> TextGenerationRequest {
    let topics = excerpt_texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. \"{}\"", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n");

    TextGenerationRequest {
        system_instruction: NARRATIVE_SYSTEM.to_string(),
        prompt: NARRATIVE_PROMPT_TEMPLATE
            .replace("{topic_count}", &excerpt_texts.len().to_string())
            .replace("{topics}", &topics),
        response_schema: narrative_response_schema(),
        temperature: NARRATIVE_TEMPERATURE,
    }
}

/// Fixed structured-output schema: three required string fields.
pub(crate) fn narrative_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING", "description": TITLE_DESCRIPTION },
            "story": { "type": "STRING", "description": STORY_DESCRIPTION },
            "imagePrompt": { "type": "STRING", "description": IMAGE_PROMPT_DESCRIPTION }
        },
        "required": ["title", "story", "imagePrompt"]
    })
}

/// Validates the raw backend output.
///
/// Not a JSON object → `MalformedNarrativeResponse`.
/// Any of `title`, `story`, `imagePrompt` missing, non-string or empty, or a whitespace-only
/// `title` or `story` → `IncompleteNarrativeResponse`. A blank `imagePrompt` passes through and
/// fails the image stage instead.
pub(crate) fn parse_narrative_response(raw: &str) -> Result<GeneratedNarrative, PipelineError> {
    let text = strip_json_fences(raw);

    let value: Value = serde_json::from_str(text).map_err(|e| {
        warn!(
            "Narrative response is not JSON: {:?}",
            text.chars().take(80).collect::<String>()
        );
        PipelineError::MalformedNarrativeResponse(e.to_string())
    })?;

    let object = value.as_object().ok_or_else(|| {
        PipelineError::MalformedNarrativeResponse("response is not a JSON object".to_string())
    })?;

    Ok(GeneratedNarrative {
        title: non_blank(required_string(object, "title")?, "title")?,
        body: non_blank(required_string(object, "story")?, "story")?,
        image_prompt: required_string(object, "imagePrompt")?,
    })
}

fn required_string(object: &Map<String, Value>, field: &str) -> Result<String, PipelineError> {
    match object.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(PipelineError::IncompleteNarrativeResponse(format!(
            "field `{field}` is empty"
        ))),
        Some(_) => Err(PipelineError::IncompleteNarrativeResponse(format!(
            "field `{field}` is not a string"
        ))),
        None => Err(PipelineError::IncompleteNarrativeResponse(format!(
            "field `{field}` is missing"
        ))),
    }
}

fn non_blank(value: String, field: &str) -> Result<String, PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::IncompleteNarrativeResponse(format!(
            "field `{field}` is blank"
        )));
    }
    Ok(value)
}
