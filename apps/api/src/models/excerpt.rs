use serde::{Deserialize, Serialize};

/// A single short source item with attribution and a link back to where it came from.
///
/// Immutable once fetched. The compositor only reads it to render a citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExcerpt {
    pub text: String,
    /// Human-readable origin, e.g. `r/science`.
    pub origin_label: String,
    pub url: String,
}

impl SourceExcerpt {
    pub fn new(
        text: impl Into<String>,
        origin_label: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            origin_label: origin_label.into(),
            url: url.into(),
        }
    }

    /// The text shown for this excerpt in the citation list: `text (origin)`.
    pub fn citation_label(&self) -> String {
        format!("{} ({})", self.text, self.origin_label)
    }
}
