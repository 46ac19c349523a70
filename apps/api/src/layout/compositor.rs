//! Document Compositor: lays a finished story out on fixed-size pages.
//!
//! `compose` is pure. It reads nothing but its arguments and the page metrics, so identical
//! inputs always give an identical page sequence. Coordinates are millimetres from the
//! top-left corner of the page; the renderer flips them into PDF space.
//!
//! Pagination rules:
//! - Every text block is atomic for the overflow test: if it does not fit below the cursor
//!   it moves to a fresh page whole.
//! - A block taller than a full page's content area starts on a fresh page and its lines
//!   continue onto following pages. This is the only case where one block spans pages, and
//!   it guarantees that composition terminates.

use crate::layout::font_metrics::{PageMetrics, TextStyle};
use crate::layout::wrap::{widest_line_mm, wrap_text};
use crate::models::narrative::split_paragraphs;
use crate::models::{IllustrationAsset, SourceExcerpt};

pub const SOURCE_SECTION_HEADER: &str = "Source Material";

/// Float slack for the overflow test so accumulated spacing never splits a block that fits.
const FIT_TOLERANCE_MM: f32 = 1e-3;

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    Title,
    Body,
    SectionHeader,
    Citation,
}

impl TextRole {
    pub fn style(self, metrics: &PageMetrics) -> &TextStyle {
        match self {
            TextRole::Title => &metrics.title,
            TextRole::Body => &metrics.body,
            TextRole::SectionHeader => &metrics.section_header,
            TextRole::Citation => &metrics.citation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    /// Each line centred within the block width.
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockContent {
    Text {
        role: TextRole,
        align: Align,
        lines: Vec<String>,
    },
    /// The run's illustration, scaled into the block rectangle.
    Image { pixel_width: u32, pixel_height: u32 },
}

/// A rectangle on a page and what is drawn in it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedBlock {
    pub content: BlockContent,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Target of a clickable region covering exactly this rectangle.
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub blocks: Vec<PlacedBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub pages: Vec<Page>,
}

impl PageLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every placed block with its 0-based page index, in reading order.
    pub fn blocks(&self) -> impl Iterator<Item = (usize, &PlacedBlock)> {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(i, page)| page.blocks.iter().map(move |b| (i, b)))
    }

    /// Text blocks of one role, in reading order.
    pub fn text_blocks(&self, role: TextRole) -> impl Iterator<Item = (usize, &PlacedBlock)> {
        self.blocks().filter(move |(_, b)| {
            matches!(&b.content, BlockContent::Text { role: r, .. } if *r == role)
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Composition
// ────────────────────────────────────────────────────────────────────────────

/// Lays out title, optional image, body paragraphs and the citation section.
///
/// The image is placed only when its pixel dimensions can be read; otherwise it is left
/// out and the rest of the document is unchanged. An empty citation list omits the
/// "Source Material" section.
pub fn compose(
    title: &str,
    body: &str,
    image: Option<&IllustrationAsset>,
    citations: &[SourceExcerpt],
    metrics: &PageMetrics,
) -> PageLayout {
    let mut composer = Composer::new(metrics);
    let content_width = metrics.content_width();

    // 1. Title
    let title_lines = wrap_text(title, &metrics.title, content_width);
    composer.place_text(TextRole::Title, Align::Center, title_lines, None);
    composer.advance(metrics.title_spacing_mm);

    // 2. Image
    if let Some(size) = image.and_then(IllustrationAsset::pixel_size) {
        let aspect = size.height as f32 / size.width as f32;
        let mut width = content_width * metrics.image_width_fraction;
        let mut height = width * aspect;
        if height > metrics.content_height() {
            height = metrics.content_height();
            width = height / aspect;
        }
        if !composer.fits(height) {
            composer.new_page();
        }
        composer.place(PlacedBlock {
            content: BlockContent::Image {
                pixel_width: size.width,
                pixel_height: size.height,
            },
            x: (metrics.page_width_mm - width) / 2.0,
            y: composer.y,
            width,
            height,
            link: None,
        });
        composer.advance(height + metrics.image_spacing_mm);
    }

    // 3. Body
    for paragraph in split_paragraphs(body) {
        let lines = wrap_text(paragraph, &metrics.body, content_width);
        composer.place_text(TextRole::Body, Align::Left, lines, None);
        composer.advance(metrics.paragraph_spacing_mm);
    }

    // 4. Citations
    if !citations.is_empty() {
        let needed = metrics.section_spacing_mm
            + metrics.section_header.line_height_mm
            + metrics.min_citation_height_mm;
        if composer.fits(needed) {
            composer.advance(metrics.section_spacing_mm);
        } else {
            composer.new_page();
        }
        composer.place_text(
            TextRole::SectionHeader,
            Align::Left,
            vec![SOURCE_SECTION_HEADER.to_string()],
            None,
        );

        for citation in citations {
            let lines = wrap_text(&citation.citation_label(), &metrics.citation, content_width);
            composer.place_text(
                TextRole::Citation,
                Align::Left,
                lines,
                Some(citation.url.clone()),
            );
            composer.advance(metrics.citation_spacing_mm);
        }
    }

    composer.finish()
}

struct Composer<'a> {
    metrics: &'a PageMetrics,
    finished: Vec<Page>,
    current: Page,
    /// Cursor, measured from the page top.
    y: f32,
}

impl<'a> Composer<'a> {
    fn new(metrics: &'a PageMetrics) -> Self {
        Self {
            metrics,
            finished: Vec::new(),
            current: Page::default(),
            y: metrics.margin_mm,
        }
    }

    fn fits(&self, height: f32) -> bool {
        self.y + height <= self.metrics.content_bottom() + FIT_TOLERANCE_MM
    }

    fn at_page_top(&self) -> bool {
        self.current.blocks.is_empty()
    }

    /// Whole lines of `line_height` that still fit between the cursor and the bottom margin.
    fn lines_left(&self, line_height: f32) -> usize {
        let room = self.metrics.content_bottom() + FIT_TOLERANCE_MM - self.y;
        (room / line_height).floor().max(0.0) as usize
    }

    fn new_page(&mut self) {
        self.finished.push(std::mem::take(&mut self.current));
        self.y = self.metrics.margin_mm;
    }

    fn advance(&mut self, dy: f32) {
        self.y += dy;
    }

    fn place(&mut self, block: PlacedBlock) {
        self.current.blocks.push(block);
    }

    /// Places a wrapped text block at the cursor and moves the cursor below it.
    fn place_text(
        &mut self,
        role: TextRole,
        align: Align,
        lines: Vec<String>,
        link: Option<String>,
    ) {
        if lines.is_empty() {
            return;
        }
        let line_height = role.style(self.metrics).line_height_mm;
        let height = lines.len() as f32 * line_height;

        if self.fits(height) {
            self.place_text_chunk(role, align, lines, link);
            return;
        }
        if !self.at_page_top() {
            self.new_page();
        }
        if self.fits(height) {
            self.place_text_chunk(role, align, lines, link);
            return;
        }

        // Oversized: fill the space left on each page, starting from the cursor.
        let mut rest = lines;
        while !rest.is_empty() {
            let room = self.lines_left(line_height);
            if room == 0 && self.y > self.metrics.margin_mm {
                self.new_page();
                continue;
            }
            let take = room.max(1).min(rest.len());
            let tail = rest.split_off(take);
            self.place_text_chunk(role, align, rest, link.clone());
            rest = tail;
            if !rest.is_empty() {
                self.new_page();
            }
        }
    }

    fn place_text_chunk(
        &mut self,
        role: TextRole,
        align: Align,
        lines: Vec<String>,
        link: Option<String>,
    ) {
        let style = role.style(self.metrics);
        let height = lines.len() as f32 * style.line_height_mm;
        // Linked text gets a box hugging the glyphs so the click target matches what is drawn.
        let width = if link.is_some() {
            widest_line_mm(&lines, style)
        } else {
            self.metrics.content_width()
        };
        self.place(PlacedBlock {
            content: BlockContent::Text { role, align, lines },
            x: self.metrics.margin_mm,
            y: self.y,
            width,
            height,
            link,
        });
        self.advance(height);
    }

    fn finish(mut self) -> PageLayout {
        self.finished.push(self.current);
        PageLayout {
            pages: self.finished,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
