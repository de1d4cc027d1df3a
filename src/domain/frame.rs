//! Decoded frame pixels.

use image::RgbImage;

/// A decoded frame: `height × width × 3` channels, 8 bits per channel, RGB,
/// row-major.
///
/// Produced and consumed within one loop iteration; never persisted.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    /// Wraps an already decoded RGB buffer.
    #[must_use]
    pub const fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Decodes an encoded image (JPEG, PNG, ...) into RGB pixels.
    ///
    /// # Errors
    ///
    /// Returns an [`image::ImageError`] if the format is not recognised or
    /// the bytes are truncated or corrupt.
    pub fn decode(bytes: &[u8]) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(Self::new(decoded.to_rgb8()))
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Borrows the underlying pixel buffer.
    #[must_use]
    pub const fn as_rgb(&self) -> &RgbImage {
        &self.pixels
    }
}
