use serde::{Deserialize, Serialize};

/// Separates paragraphs inside a narrative body.
pub const PARAGRAPH_BREAK: char = '\n';

/// The story produced by one narrative synthesis call.
///
/// All three fields are non-empty; a partially filled narrative is never constructed
/// (see `generation::narrative::parse_narrative_response`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedNarrative {
    pub title: String,
    /// Paragraphs separated by [`PARAGRAPH_BREAK`].
    pub body: String,
    pub image_prompt: String,
}

/// Splits a body on the paragraph marker, discarding blank paragraphs.
pub fn split_paragraphs(body: &str) -> impl Iterator<Item = &str> {
    body.split(PARAGRAPH_BREAK)
        .map(str::trim)
        .filter(|p| !p.is_empty())
}
