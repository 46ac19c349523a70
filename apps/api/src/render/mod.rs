// Export: composes a finished run and writes it out as a PDF.
// CPU-bound; the pipeline calls export_document inside tokio::task::spawn_blocking.

pub mod pdf;

use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::layout::{compose, MetricsError, PageMetrics};
use crate::models::{GeneratedNarrative, IllustrationAsset, SourceExcerpt};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("page metrics rejected: {0}")]
    Metrics(#[from] MetricsError),

    #[error("PDF encoding failed: {0}")]
    Pdf(String),

    #[error("illustration could not be embedded: {0}")]
    Image(String),
}

/// A rendered document ready to hand to the caller.
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub filename: String,
    pub bytes: Bytes,
    pub page_count: usize,
}

impl ExportedDocument {
    /// Writes the document to `dir/<filename>`, replacing any earlier export of the same title.
    pub async fn save_in(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.filename);
        tokio::fs::write(&path, &self.bytes).await?;
        info!(path = %path.display(), bytes = self.bytes.len(), "Saved exported document");
        Ok(path)
    }
}

/// Title with every non-alphanumeric character replaced by `_`, lower-cased, plus `.pdf`.
pub fn safe_filename(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}.pdf", stem.to_lowercase())
}

/// Lays out and renders one run's document.
pub fn export_document(
    narrative: &GeneratedNarrative,
    image: &IllustrationAsset,
    sources: &[SourceExcerpt],
    metrics: &PageMetrics,
) -> Result<ExportedDocument, RenderError> {
    metrics.validate()?;

    let layout = compose(
        &narrative.title,
        &narrative.body,
        Some(image),
        sources,
        metrics,
    );
    let bytes = pdf::render_pdf(&layout, Some(image), metrics, &narrative.title)?;

    Ok(ExportedDocument {
        filename: safe_filename(&narrative.title),
        bytes: Bytes::from(bytes),
        page_count: layout.page_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::default_page_metrics;
    use crate::models::illustration::png_fixture;
    use crate::test_support::excerpts;

    fn narrative(title: &str, body: &str) -> GeneratedNarrative {
        GeneratedNarrative {
            title: title.to_string(),
            body: body.to_string(),
            image_prompt: "a lighthouse".to_string(),
        }
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("The Last Lamp!"), "the_last_lamp_.pdf");
        assert_eq!(safe_filename("Été 2024"), "_t__2024.pdf");
        assert_eq!(safe_filename("T"), "t.pdf");
    }

    #[test]
    fn test_export_document() {
        let doc = export_document(
            &narrative("The Last Lamp", "A\nB"),
            &png_fixture(30, 40),
            &excerpts(10),
            &default_page_metrics(),
        )
        .unwrap();
        assert_eq!(doc.filename, "the_last_lamp.pdf");
        assert!(doc.page_count >= 1);
        assert!(doc.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_export_rejects_invalid_metrics() {
        let mut metrics = default_page_metrics();
        metrics.margin_mm = 200.0;
        let err = export_document(
            &narrative("T", "A"),
            &png_fixture(30, 40),
            &excerpts(1),
            &metrics,
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Metrics(_)));
    }

    #[tokio::test]
    async fn test_save_in_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = ExportedDocument {
            filename: "t.pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.5 test"),
            page_count: 1,
        };
        let path = doc.save_in(&dir.path().join("exports")).await.unwrap();
        assert_eq!(path, dir.path().join("exports").join("t.pdf"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.5 test");
    }
}
