//! Illustration Synthesizer: turns an image prompt into one cover image.

use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::generation::prompts::{ILLUSTRATION_EXCLUSION, ILLUSTRATION_STYLE};
use crate::llm_client::{ImageGenerationRequest, ImageGenerator};
use crate::models::IllustrationAsset;

/// Portrait ratio suited to a cover.
pub const COVER_ASPECT_RATIO: &str = "3:4";
pub const COVER_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Clone)]
pub struct IllustrationSynthesizer {
    generator: Arc<dyn ImageGenerator>,
}

impl IllustrationSynthesizer {
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self { generator }
    }

    /// Requests exactly one image. Extra images, if any, are discarded.
    pub async fn synthesize(&self, prompt: &str) -> Result<IllustrationAsset, PipelineError> {
        let request = build_illustration_request(prompt);

        let response = self
            .generator
            .generate_images(&request)
            .await
            .map_err(|e| {
                warn!("Image generation call failed: {e}");
                PipelineError::ImageGenerationFailed(e.to_string())
            })?;

        let image = response
            .images
            .into_iter()
            .next()
            .ok_or(PipelineError::NoImageReturned)?;

        info!(
            bytes = image.bytes.len(),
            media_type = %image.mime_type,
            "Illustration synthesized"
        );
        Ok(IllustrationAsset::new(image.bytes, image.mime_type))
    }
}

pub(crate) fn build_illustration_request(prompt: &str) -> ImageGenerationRequest {
    ImageGenerationRequest {
        prompt: format!(
            "{}. {ILLUSTRATION_STYLE} {ILLUSTRATION_EXCLUSION}",
            prompt.trim().trim_end_matches('.')
        ),
        image_count: 1,
        aspect_ratio: COVER_ASPECT_RATIO.to_string(),
        output_format: COVER_MEDIA_TYPE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ImageReply, MockImageGenerator};

    #[test]
    fn test_request_appends_style_and_exclusion() {
        let request = build_illustration_request("A lighthouse made of jellyfish.");
        assert!(request
            .prompt
            .starts_with("A lighthouse made of jellyfish. A clean, wordless"));
        assert!(request.prompt.ends_with("no watermarks."));
        assert_eq!(request.image_count, 1);
        assert_eq!(request.aspect_ratio, "3:4");
        assert_eq!(request.output_format, "image/jpeg");
    }

    #[tokio::test]
    async fn test_returns_first_image_only() {
        let generator = Arc::new(MockImageGenerator::new(vec![ImageReply::images(vec![
            (vec![1, 2, 3], "image/jpeg"),
            (vec![9, 9], "image/jpeg"),
        ])]));
        let synthesizer = IllustrationSynthesizer::new(generator.clone());

        let asset = synthesizer.synthesize("a fox").await.unwrap();

        assert_eq!(asset.bytes.as_ref(), &[1u8, 2, 3]);
        assert_eq!(asset.media_type, "image/jpeg");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_images_is_no_image_returned() {
        let generator = Arc::new(MockImageGenerator::new(vec![ImageReply::images(vec![])]));
        let synthesizer = IllustrationSynthesizer::new(generator);

        let err = synthesizer.synthesize("a fox").await.unwrap_err();

        assert_eq!(err, PipelineError::NoImageReturned);
    }

    #[tokio::test]
    async fn test_backend_error_is_generation_failure() {
        let generator = Arc::new(MockImageGenerator::new(vec![ImageReply::api_error(500)]));
        let synthesizer = IllustrationSynthesizer::new(generator);

        let err = synthesizer.synthesize("a fox").await.unwrap_err();

        assert_eq!(err.kind(), "ImageGenerationFailed");
    }
}
