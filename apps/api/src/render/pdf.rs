//! Writes a composed [`PageLayout`] as a PDF with lopdf.
//!
//! Text uses the four base-14 faces with `WinAnsiEncoding`, so nothing is embedded and the
//! viewer's metrics match the tables the compositor measured with. Linked blocks get an
//! invisible-border `/Link` annotation with a `/URI` action over the block rectangle.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

use crate::layout::{
    Align, BlockContent, FontFace, PageLayout, PageMetrics, PlacedBlock, PT_PER_MM,
};
use crate::models::IllustrationAsset;
use crate::render::RenderError;

const IMAGE_RESOURCE: &str = "Im1";
/// Share of the font size below the baseline, used to seat each line inside its leading.
const DESCENT_RATIO: f32 = 0.2;

fn pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

/// Maps text to WinAnsi bytes. Typographic punctuation keeps its glyph; anything outside
/// the encoding becomes `?`.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' | '\n' | '\r' => b' ',
            _ => b'?',
        })
        .collect()
}

/// Renders every page of `layout`. `image` supplies the pixels for any image block.
pub fn render_pdf(
    layout: &PageLayout,
    image: Option<&IllustrationAsset>,
    metrics: &PageMetrics,
    title: &str,
) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for face in FontFace::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font_name(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource_name(), font_id);
    }

    let mut resources = dictionary! { "Font" => fonts };
    let has_image_block = layout
        .blocks()
        .any(|(_, b)| matches!(b.content, BlockContent::Image { .. }));
    if has_image_block {
        let asset = image.ok_or_else(|| {
            RenderError::Image("layout places an image but none was supplied".to_string())
        })?;
        let image_id = doc.add_object(image_xobject(asset)?);
        resources.set("XObject", dictionary! { IMAGE_RESOURCE => image_id });
    }
    let resources_id = doc.add_object(resources);

    let page_height_pt = pt(metrics.page_height_mm);
    let mut kids: Vec<Object> = Vec::with_capacity(layout.page_count());
    for page in &layout.pages {
        let mut operations = Vec::new();
        let mut annotations: Vec<Object> = Vec::new();

        for block in &page.blocks {
            match &block.content {
                BlockContent::Text { .. } => {
                    text_operations(block, metrics, page_height_pt, &mut operations)
                }
                BlockContent::Image { .. } => {
                    image_operations(block, page_height_pt, &mut operations)
                }
            }
            if let Some(url) = &block.link {
                let annot_id = doc.add_object(link_annotation(block, url, page_height_pt));
                annotations.push(annot_id.into());
            }
        }

        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if !annotations.is_empty() {
            page_dict.set("Annots", annotations);
        }
        kids.push(doc.add_object(page_dict).into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0_i64.into(),
            0_i64.into(),
            pt(metrics.page_width_mm).into(),
            page_height_pt.into(),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(to_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal(concat!("storyweave ", env!("CARGO_PKG_VERSION"))),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::Pdf(e.to_string()))?;
    Ok(bytes)
}

fn text_operations(
    block: &PlacedBlock,
    metrics: &PageMetrics,
    page_height_pt: f32,
    operations: &mut Vec<Operation>,
) {
    let BlockContent::Text { role, align, lines } = &block.content else {
        return;
    };
    let style = role.style(metrics);
    let [r, g, b] = style.color;

    for (i, line) in lines.iter().enumerate() {
        let x_mm = match align {
            Align::Left => block.x,
            Align::Center => {
                block.x + (block.width - style.width_mm(line)).max(0.0) / 2.0
            }
        };
        let baseline_mm = block.y + (i + 1) as f32 * style.line_height_mm
            - DESCENT_RATIO * style.size_mm();

        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![style.face.resource_name().into(), style.size_pt.into()],
        ));
        operations.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));
        operations.push(Operation::new(
            "Td",
            vec![pt(x_mm).into(), (page_height_pt - pt(baseline_mm)).into()],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(line), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
}

fn image_operations(block: &PlacedBlock, page_height_pt: f32, operations: &mut Vec<Operation>) {
    let bottom_pt = page_height_pt - pt(block.y + block.height);
    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new(
        "cm",
        vec![
            pt(block.width).into(),
            0_i64.into(),
            0_i64.into(),
            pt(block.height).into(),
            pt(block.x).into(),
            bottom_pt.into(),
        ],
    ));
    operations.push(Operation::new("Do", vec![IMAGE_RESOURCE.into()]));
    operations.push(Operation::new("Q", vec![]));
}

fn image_xobject(asset: &IllustrationAsset) -> Result<Stream, RenderError> {
    let decoded =
        image::load_from_memory(&asset.bytes).map_err(|e| RenderError::Image(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8_i64,
        },
        rgb.into_raw(),
    ))
}

fn link_annotation(block: &PlacedBlock, url: &str, page_height_pt: f32) -> Dictionary {
    let left = pt(block.x);
    let right = pt(block.x + block.width);
    let top = page_height_pt - pt(block.y);
    let bottom = page_height_pt - pt(block.y + block.height);
    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Link",
        "Rect" => vec![left.into(), bottom.into(), right.into(), top.into()],
        "Border" => vec![0_i64.into(), 0_i64.into(), 0_i64.into()],
        "A" => dictionary! {
            "S" => "URI",
            "URI" => Object::string_literal(url),
        },
    }
}
