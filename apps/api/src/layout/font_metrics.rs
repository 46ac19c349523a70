//! Static font-metric tables for the four PDF base-14 faces the exported document uses.
//!
//! Character widths are in em units (relative to font size), taken from the Adobe AFM
//! files (advance width / 1000). Base-14 fonts are never embedded, so these tables are
//! the only width source; the viewer draws with the same metrics.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Points per millimetre.
pub const PT_PER_MM: f32 = 72.0 / 25.4;

// ────────────────────────────────────────────────────────────────────────────
// Font face enum
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFace {
    /// Body text.
    TimesRoman,
    /// Title.
    TimesBold,
    /// Citations.
    Helvetica,
    /// Section header.
    HelveticaBold,
}

impl FontFace {
    pub const ALL: [FontFace; 4] = [
        FontFace::TimesRoman,
        FontFace::TimesBold,
        FontFace::Helvetica,
        FontFace::HelveticaBold,
    ];

    /// PostScript name used as `/BaseFont`.
    pub fn base_font_name(self) -> &'static str {
        match self {
            FontFace::TimesRoman => "Times-Roman",
            FontFace::TimesBold => "Times-Bold",
            FontFace::Helvetica => "Helvetica",
            FontFace::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Name of the font in a page's resource dictionary.
    pub fn resource_name(self) -> &'static str {
        match self {
            FontFace::TimesRoman => "F1",
            FontFace::TimesBold => "F2",
            FontFace::Helvetica => "F3",
            FontFace::HelveticaBold => "F4",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Page metrics
// ────────────────────────────────────────────────────────────────────────────

/// Font, size, leading and colour for one kind of text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub face: FontFace,
    pub size_pt: f32,
    pub line_height_mm: f32,
    /// RGB, each in 0.0..=1.0.
    pub color: [f32; 3],
}

impl TextStyle {
    /// Rendered width of `s` in millimetres.
    pub fn width_mm(&self, s: &str) -> f32 {
        get_metrics(self.face).measure_str(s) * self.size_pt / PT_PER_MM
    }

    pub fn size_mm(&self) -> f32 {
        self.size_pt / PT_PER_MM
    }
}

/// Page geometry and typography. All lengths in millimetres.
///
/// Defaults reproduce an A4 page with 20 mm margins on every side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,

    pub title: TextStyle,
    pub body: TextStyle,
    pub section_header: TextStyle,
    pub citation: TextStyle,

    /// Gap after the title block.
    pub title_spacing_mm: f32,
    /// Image width as a fraction of the content width.
    pub image_width_fraction: f32,
    pub image_spacing_mm: f32,
    pub paragraph_spacing_mm: f32,
    /// Gap before the citation section when it stays on the current page.
    pub section_spacing_mm: f32,
    /// Room one citation line needs below the header for the section to start on this page.
    pub min_citation_height_mm: f32,
    pub citation_spacing_mm: f32,
}

pub fn default_page_metrics() -> PageMetrics {
    const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
    PageMetrics {
        page_width_mm: 210.0,
        page_height_mm: 297.0,
        margin_mm: 20.0,
        title: TextStyle {
            face: FontFace::TimesBold,
            size_pt: 24.0,
            line_height_mm: 10.0,
            color: BLACK,
        },
        body: TextStyle {
            face: FontFace::TimesRoman,
            size_pt: 12.0,
            line_height_mm: 5.0,
            color: BLACK,
        },
        section_header: TextStyle {
            face: FontFace::HelveticaBold,
            size_pt: 16.0,
            line_height_mm: 10.0,
            color: BLACK,
        },
        citation: TextStyle {
            face: FontFace::Helvetica,
            size_pt: 10.0,
            line_height_mm: 4.0,
            color: [0.0, 0.0, 1.0],
        },
        title_spacing_mm: 10.0,
        image_width_fraction: 0.8,
        image_spacing_mm: 15.0,
        paragraph_spacing_mm: 5.0,
        section_spacing_mm: 15.0,
        min_citation_height_mm: 8.0,
        citation_spacing_mm: 2.0,
    }
}

impl PageMetrics {
    pub fn content_width(&self) -> f32 {
        self.page_width_mm - 2.0 * self.margin_mm
    }

    /// y coordinate (from the page top) below which nothing may be placed.
    pub fn content_bottom(&self) -> f32 {
        self.page_height_mm - self.margin_mm
    }

    pub fn content_height(&self) -> f32 {
        self.page_height_mm - 2.0 * self.margin_mm
    }

    /// Rejects geometries the compositor cannot paginate (no room for a single line).
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.content_width() <= 0.0 || self.content_height() <= 0.0 {
            return Err(MetricsError::NoContentArea);
        }
        for (name, style) in [
            ("title", &self.title),
            ("body", &self.body),
            ("section_header", &self.section_header),
            ("citation", &self.citation),
        ] {
            if style.size_pt <= 0.0 || style.line_height_mm <= 0.0 {
                return Err(MetricsError::NonPositiveStyle(name));
            }
            if style.line_height_mm > self.content_height() {
                return Err(MetricsError::LineTallerThanPage(name));
            }
        }
        if !(0.0..=1.0).contains(&self.image_width_fraction) || self.image_width_fraction == 0.0 {
            return Err(MetricsError::ImageWidthFraction(self.image_width_fraction));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("margins leave no content area")]
    NoContentArea,

    #[error("{0} style needs a positive size and line height")]
    NonPositiveStyle(&'static str),

    #[error("{0} line height exceeds the content height")]
    LineTallerThanPage(&'static str),

    #[error("image_width_fraction must be in (0, 1], got {0}")]
    ImageWidthFraction(f32),
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Static character-width table for a font face.
///
/// `widths[i]` = width of ASCII character `(i + 32)`, covering 0x20 (space) through 0x7E (~).
///
/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    widths: [f32; 95],
    /// Fallback width for non-ASCII characters (codepoints > 0x7E).
    pub average_char_width: f32,
    pub space_width: f32,
}

impl FontMetricTable {
    /// Measures the rendered width of a string in em units.
    ///
    /// Non-ASCII characters fall back to `average_char_width`.
    pub fn measure_str(&self, s: &str) -> f32 {
        s.chars()
            .map(|c| {
                let code = c as usize;
                if (32..=126).contains(&code) {
                    self.widths[code - 32]
                } else {
                    self.average_char_width
                }
            })
            .sum()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

static TIMES_ROMAN_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.250, 0.333, 0.408, 0.500, 0.500, 0.833, 0.778, 0.180, 0.333, 0.333, 0.500, 0.564, 0.250, 0.333, 0.250, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.564, 0.564, 0.564, 0.444, 0.921,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.722, 0.667, 0.667, 0.722, 0.611, 0.556, 0.722, 0.722, 0.333, 0.389, 0.722, 0.611, 0.889,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.722, 0.556, 0.722, 0.667, 0.556, 0.611, 0.722, 0.722, 0.944, 0.722, 0.722, 0.611,
        // [      \      ]      ^      _      `
        0.333, 0.278, 0.333, 0.469, 0.500, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.444, 0.500, 0.444, 0.500, 0.444, 0.333, 0.500, 0.500, 0.278, 0.278, 0.500, 0.278, 0.778,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.500, 0.500, 0.500, 0.500, 0.333, 0.389, 0.278, 0.500, 0.500, 0.722, 0.500, 0.500, 0.444,
        // {      |      }      ~
        0.480, 0.200, 0.480, 0.541,
    ],
    average_char_width: 0.46,
    space_width: 0.250,
};

static TIMES_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.250, 0.333, 0.555, 0.500, 0.500, 1.000, 0.833, 0.278, 0.333, 0.333, 0.500, 0.570, 0.250, 0.333, 0.250, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500, 0.500,
        // :      ;      <      =      >      ?      @
        0.333, 0.333, 0.570, 0.570, 0.570, 0.500, 0.930,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.722, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.778, 0.389, 0.500, 0.778, 0.667, 0.944,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.611, 0.778, 0.722, 0.556, 0.667, 0.722, 0.722, 1.000, 0.722, 0.722, 0.667,
        // [      \      ]      ^      _      `
        0.333, 0.278, 0.333, 0.581, 0.500, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.500, 0.556, 0.444, 0.556, 0.444, 0.333, 0.500, 0.556, 0.278, 0.333, 0.556, 0.278, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.500, 0.556, 0.556, 0.444, 0.389, 0.333, 0.556, 0.500, 0.722, 0.500, 0.500, 0.444,
        // {      |      }      ~
        0.394, 0.220, 0.394, 0.520,
    ],
    average_char_width: 0.50,
    space_width: 0.250,
};

static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.278, 0.355, 0.556, 0.556, 0.889, 0.667, 0.191, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.278, 0.278, 0.584, 0.584, 0.584, 0.556, 1.015,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.667, 0.667, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.500, 0.667, 0.556, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.278, 0.278, 0.278, 0.469, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.556, 0.500, 0.556, 0.556, 0.278, 0.556, 0.556, 0.222, 0.222, 0.500, 0.222, 0.833,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.556, 0.556, 0.556, 0.556, 0.333, 0.500, 0.278, 0.556, 0.500, 0.722, 0.500, 0.500, 0.500,
        // {      |      }      ~
        0.334, 0.260, 0.334, 0.584,
    ],
    average_char_width: 0.52,
    space_width: 0.278,
};

static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp    !      "      #      $      %      &      '      (      )      *      +      ,      -      .      /
        0.278, 0.333, 0.474, 0.556, 0.556, 0.889, 0.722, 0.238, 0.333, 0.333, 0.389, 0.584, 0.278, 0.333, 0.278, 0.278,
        // 0      1      2      3      4      5      6      7      8      9
        0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556, 0.556,
        // :      ;      <      =      >      ?      @
        0.333, 0.333, 0.584, 0.584, 0.584, 0.611, 0.975,
        // A      B      C      D      E      F      G      H      I      J      K      L      M
        0.722, 0.722, 0.722, 0.722, 0.667, 0.611, 0.778, 0.722, 0.278, 0.556, 0.722, 0.611, 0.833,
        // N      O      P      Q      R      S      T      U      V      W      X      Y      Z
        0.722, 0.778, 0.667, 0.778, 0.722, 0.667, 0.611, 0.722, 0.667, 0.944, 0.667, 0.667, 0.611,
        // [      \      ]      ^      _      `
        0.333, 0.278, 0.333, 0.584, 0.556, 0.333,
        // a      b      c      d      e      f      g      h      i      j      k      l      m
        0.556, 0.611, 0.556, 0.611, 0.556, 0.333, 0.611, 0.611, 0.278, 0.278, 0.556, 0.278, 0.889,
        // n      o      p      q      r      s      t      u      v      w      x      y      z
        0.611, 0.611, 0.611, 0.611, 0.389, 0.556, 0.333, 0.611, 0.556, 0.778, 0.556, 0.556, 0.500,
        // {      |      }      ~
        0.389, 0.280, 0.389, 0.584,
    ],
    average_char_width: 0.56,
    space_width: 0.278,
};

/// Returns the static metric table for a given face.
pub fn get_metrics(face: FontFace) -> &'static FontMetricTable {
    match face {
        FontFace::TimesRoman => &TIMES_ROMAN_TABLE,
        FontFace::TimesBold => &TIMES_BOLD_TABLE,
        FontFace::Helvetica => &HELVETICA_TABLE,
        FontFace::HelveticaBold => &HELVETICA_BOLD_TABLE,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
