//! The decoded composite image.

use image::{ColorType, DynamicImage, GrayImage};
use sheetanim_common::error::{SheetError, SheetResult};

/// An immutable decoded sprite sheet.
///
/// Pixel data is kept in its decoded channel layout so slicing can copy
/// it verbatim, alpha included.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: DynamicImage,
}

impl SourceImage {
    /// Decode an image from raw file bytes (PNG, JPEG, GIF, BMP, WebP, ...).
    pub fn decode(bytes: &[u8]) -> SheetResult<Self> {
        if bytes.is_empty() {
            return Err(SheetError::decode("input is empty"));
        }
        let pixels = image::load_from_memory(bytes)
            .map_err(|e| SheetError::decode(format!("unsupported or corrupt image: {e}")))?;
        Ok(Self { pixels })
    }

    /// Wrap an already decoded image.
    pub fn from_dynamic(pixels: DynamicImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Channel layout as decoded.
    pub fn color_type(&self) -> ColorType {
        self.pixels.color()
    }

    /// Whether the decoded image carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        self.pixels.color().has_alpha()
    }

    /// Borrow the pixel buffer.
    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// 8-bit luminance view. Alpha is ignored.
    pub fn luminance(&self) -> GrayImage {
        match &self.pixels {
            DynamicImage::ImageLuma8(gray) => gray.clone(),
            other => other.to_luma8(),
        }
    }
}
