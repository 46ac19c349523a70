//! Greedy word wrap against the static font tables.
//!
//! Words are placed left to right; a word that would push the line past `max_width_mm`
//! starts a new line. A single word wider than the line is broken between characters.

use crate::layout::font_metrics::TextStyle;

/// Wraps `text` into lines no wider than `max_width_mm` at the given style.
///
/// Whitespace runs collapse to one space. Empty or all-whitespace text yields no lines.
pub fn wrap_text(text: &str, style: &TextStyle, max_width_mm: f32) -> Vec<String> {
    let space_w = style.width_mm(" ");
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        for piece in break_word(word, style, max_width_mm) {
            let piece_w = style.width_mm(&piece);
            if current.is_empty() {
                current = piece;
                current_width = piece_w;
            } else if current_width + space_w + piece_w > max_width_mm {
                lines.push(std::mem::take(&mut current));
                current = piece;
                current_width = piece_w;
            } else {
                current.push(' ');
                current.push_str(&piece);
                current_width += space_w + piece_w;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Splits a word into chunks that each fit `max_width_mm`. Every chunk holds at least one
/// character so a glyph wider than the line still makes progress.
fn break_word(word: &str, style: &TextStyle, max_width_mm: f32) -> Vec<String> {
    if style.width_mm(word) <= max_width_mm {
        return vec![word.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in word.chars() {
        current.push(c);
        if current.chars().count() > 1 && style.width_mm(&current) > max_width_mm {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Width of the widest line, in millimetres.
pub fn widest_line_mm(lines: &[String], style: &TextStyle) -> f32 {
    lines
        .iter()
        .map(|line| style.width_mm(line))
        .fold(0.0_f32, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::default_page_metrics;

    #[test]
    fn test_empty_text_has_no_lines() {
        let metrics = default_page_metrics();
        assert!(wrap_text("", &metrics.body, 170.0).is_empty());
        assert!(wrap_text("   \t ", &metrics.body, 170.0).is_empty());
    }

    #[test]
    fn test_short_text_stays_on_one_line() {
        let metrics = default_page_metrics();
        let lines = wrap_text("A quiet  harbour\tat dawn", &metrics.body, 170.0);
        assert_eq!(lines, vec!["A quiet harbour at dawn".to_string()]);
    }

    #[test]
    fn test_every_line_fits_the_width() {
        let metrics = default_page_metrics();
        let text = "The lighthouse keeper counted the ships that never arrived, \
                    writing each name in a ledger nobody else would ever read. "
            .repeat(6);
        let lines = wrap_text(&text, &metrics.body, 170.0);
        assert!(lines.len() > 3);
        for line in &lines {
            assert!(metrics.body.width_mm(line) <= 170.0, "line too wide: {line}");
        }
        // No words lost or reordered.
        let rejoined = lines.join(" ");
        let original: Vec<&str> = text.split_whitespace().collect();
        let wrapped: Vec<&str> = rejoined.split_whitespace().collect();
        assert_eq!(original, wrapped);
    }

    #[test]
    fn test_overlong_word_is_broken_between_characters() {
        let metrics = default_page_metrics();
        let word = "W".repeat(80);
        let lines = wrap_text(&word, &metrics.body, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(metrics.body.width_mm(line) <= 50.0);
        }
    }

    #[test]
    fn test_glyph_wider_than_line_still_progresses() {
        let metrics = default_page_metrics();
        let lines = wrap_text("WWW", &metrics.title, 1.0);
        assert_eq!(lines, vec!["W", "W", "W"]);
    }

    #[test]
    fn test_widest_line() {
        let metrics = default_page_metrics();
        let lines = vec!["ab".to_string(), "abcd".to_string()];
        let widest = widest_line_mm(&lines, &metrics.citation);
        assert!((widest - metrics.citation.width_mm("abcd")).abs() < 1e-6);
        assert_eq!(widest_line_mm(&[], &metrics.citation), 0.0);
    }
}
