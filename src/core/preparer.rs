use crate::core::error::EstimationError;
use image::imageops::FilterType;
use image::RgbImage;

/// Decoded RGB frame handed to the detector and the estimator
///
/// Immutable once produced; each request owns its own copy.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pixels: RgbImage,
}

impl PreparedImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> RgbImage {
        self.pixels
    }
}

/// Decode raw bytes and optionally normalize to a reference height
///
/// When `target_reference_height` is given the output height equals it and
/// the width is `round(w * target / h)`, so the aspect ratio is kept and
/// nothing is cropped.
pub fn prepare(
    raw_bytes: &[u8],
    target_reference_height: Option<u32>,
) -> Result<PreparedImage, EstimationError> {
    let decoded = image::load_from_memory(raw_bytes)?.to_rgb8();

    let pixels = match target_reference_height {
        Some(target) if target > 0 && target != decoded.height() => {
            let (width, height) = scaled_dimensions(decoded.width(), decoded.height(), target);
            tracing::debug!(
                "Resizing {}x{} -> {}x{}",
                decoded.width(),
                decoded.height(),
                width,
                height
            );
            image::imageops::resize(&decoded, width, height, FilterType::Triangle)
        }
        _ => decoded,
    };

    Ok(PreparedImage::new(pixels))
}

/// Target dimensions for an aspect-preserving resize to `target_height`
pub fn scaled_dimensions(width: u32, height: u32, target_height: u32) -> (u32, u32) {
    let scaled = (f64::from(width) * f64::from(target_height) / f64::from(height)).round() as u32;
    (scaled.max(1), target_height)
}
