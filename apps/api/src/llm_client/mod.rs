/// LLM Client: the single point of entry for all Gemini API calls in Storyweave.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// Synthesizers depend on the `TextGenerator` / `ImageGenerator` traits, which
/// `GeminiClient` implements.
///
/// Models are hardcoded constants so deployments cannot drift apart.
/// Exactly one HTTP request per call: the pipeline never retries a stage.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
/// Model used for narrative synthesis.
pub const TEXT_MODEL: &str = "gemini-2.5-flash";
/// Model used for cover illustrations.
pub const IMAGE_MODEL: &str = "imagen-4.0-generate-001";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Image payload was not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("LLM returned empty content")]
    EmptyContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Backend-neutral contracts
// ────────────────────────────────────────────────────────────────────────────

/// One structured-output text generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct TextGenerationRequest {
    pub system_instruction: String,
    pub prompt: String,
    /// Schema the backend is constrained to (OpenAPI subset, Gemini dialect).
    pub response_schema: serde_json::Value,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextGenerationResponse {
    /// Raw model output; expected to be serialized JSON.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub image_count: u8,
    /// e.g. `3:4`
    pub aspect_ratio: String,
    /// MIME type of the requested encoding, e.g. `image/jpeg`.
    pub output_format: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub mime_type: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageGenerationResponse {
    /// May be empty when the backend filtered every candidate.
    pub images: Vec<GeneratedImage>,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, LlmError>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a serde_json::Value,
    temperature: f32,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

impl GenerateContentResponse {
    /// Concatenates the text parts of the first candidate.
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters<'a>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters<'a> {
    sample_count: u8,
    aspect_ratio: &'a str,
    output_options: OutputOptions<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputOptions<'a> {
    mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The single Gemini client used by both synthesizers.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// POSTs `body` to `models/{model}:{method}` and returns the raw success body.
    async fn post<B: Serialize>(
        &self,
        model: &str,
        method: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        let url = format!("{GEMINI_API_URL}/{model}:{method}");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(
        &self,
        request: &TextGenerationRequest,
    ) -> Result<TextGenerationResponse, LlmError> {
        let body = GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: &request.system_instruction,
                }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.response_schema,
                temperature: request.temperature,
                // Thinking disabled.
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };

        let raw = self.post(TEXT_MODEL, "generateContent", &body).await?;
        let response: GenerateContentResponse = serde_json::from_str(&raw)?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                model = TEXT_MODEL,
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini text call succeeded"
            );
        }

        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(TextGenerationResponse { text })
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_images(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, LlmError> {
        let body = PredictRequest {
            instances: vec![PredictInstance {
                prompt: &request.prompt,
            }],
            parameters: PredictParameters {
                sample_count: request.image_count,
                aspect_ratio: &request.aspect_ratio,
                output_options: OutputOptions {
                    mime_type: &request.output_format,
                },
            },
        };

        let raw = self.post(IMAGE_MODEL, "predict", &body).await?;
        let response: PredictResponse = serde_json::from_str(&raw)?;
        let images = decode_predictions(response.predictions, &request.output_format)?;

        debug!(
            model = IMAGE_MODEL,
            images = images.len(),
            "Gemini image call succeeded"
        );

        Ok(ImageGenerationResponse { images })
    }
}

/// Decodes base64 prediction payloads. Predictions without bytes (filtered) are skipped.
fn decode_predictions(
    predictions: Vec<Prediction>,
    default_mime: &str,
) -> Result<Vec<GeneratedImage>, LlmError> {
    predictions
        .into_iter()
        .filter_map(|p| {
            let payload = p.bytes_base64_encoded?;
            let mime_type = p.mime_type.unwrap_or_else(|| default_mime.to_string());
            Some(STANDARD.decode(payload.as_bytes()).map(|bytes| GeneratedImage {
                bytes: Bytes::from(bytes),
                mime_type,
            }))
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(LlmError::Decode)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "  {\"key\": \"value\"}\n";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_generate_content_request_uses_camel_case() {
        let schema = serde_json::json!({"type": "OBJECT"});
        let body = GenerateContentRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: "sys" }],
            },
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &schema,
                temperature: 0.8,
                thinking_config: ThinkingConfig { thinking_budget: 0 },
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(
            json["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert_eq!(json["generationConfig"]["thinkingConfig"]["thinkingBudget"], 0);
    }

    #[test]
    fn test_response_text_joins_first_candidate_parts() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"title\":"}, {"text": "\"T\"}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let response: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"title\":\"T\"}"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(response.text().is_none());
    }

    #[test]
    fn test_predict_request_shape() {
        let body = PredictRequest {
            instances: vec![PredictInstance { prompt: "a fox" }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "3:4",
                output_options: OutputOptions {
                    mime_type: "image/jpeg",
                },
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["instances"][0]["prompt"], "a fox");
        assert_eq!(json["parameters"]["sampleCount"], 1);
        assert_eq!(json["parameters"]["aspectRatio"], "3:4");
        assert_eq!(json["parameters"]["outputOptions"]["mimeType"], "image/jpeg");
    }

    #[test]
    fn test_decode_predictions_skips_filtered_entries() {
        let response: PredictResponse = serde_json::from_str(
            r#"{"predictions": [
                {"raiFilteredReason": "blocked"},
                {"bytesBase64Encoded": "AQID", "mimeType": "image/png"},
                {"bytesBase64Encoded": "BAU="}
            ]}"#,
        )
        .unwrap();
        let images = decode_predictions(response.predictions, "image/jpeg").unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].bytes.as_ref(), &[1u8, 2, 3]);
        assert_eq!(images[0].mime_type, "image/png");
        assert_eq!(images[1].mime_type, "image/jpeg");
    }

    #[test]
    fn test_decode_predictions_rejects_bad_base64() {
        let predictions = vec![Prediction {
            bytes_base64_encoded: Some("!!!".to_string()),
            mime_type: None,
        }];
        assert!(matches!(
            decode_predictions(predictions, "image/jpeg"),
            Err(LlmError::Decode(_))
        ));
    }

    #[test]
    fn test_empty_prediction_list_is_ok() {
        let response: PredictResponse = serde_json::from_str("{}").unwrap();
        let images = decode_predictions(response.predictions, "image/jpeg").unwrap();
        assert!(images.is_empty());
    }
}
