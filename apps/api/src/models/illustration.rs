use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use serde::{ser::SerializeStruct, Serialize, Serializer};

/// An encoded cover image returned by the image backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllustrationAsset {
    pub bytes: Bytes,
    /// MIME type of `bytes`, e.g. `image/jpeg`.
    pub media_type: String,
}

/// Intrinsic pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl IllustrationAsset {
    pub fn new(bytes: impl Into<Bytes>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }

    /// `data:<media>;base64,<payload>`, the form the presentation layer displays.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, STANDARD.encode(&self.bytes))
    }

    /// Reads the intrinsic dimensions from the encoded header without decoding pixels.
    ///
    /// Returns `None` when the payload is not a recognizable image or has a zero dimension.
    pub fn pixel_size(&self) -> Option<PixelSize> {
        let (width, height) = image::ImageReader::new(Cursor::new(self.bytes.as_ref()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(PixelSize { width, height })
    }
}

impl Serialize for IllustrationAsset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("IllustrationAsset", 2)?;
        state.serialize_field("media_type", &self.media_type)?;
        state.serialize_field("data_url", &self.to_data_url())?;
        state.end()
    }
}

#[cfg(test)]
pub(crate) fn png_fixture(width: u32, height: u32) -> IllustrationAsset {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 90]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    IllustrationAsset::new(buf, "image/png")
}
