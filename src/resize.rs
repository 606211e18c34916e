//! Bounding-box dimension math and resized raster rendering

use crate::error::{PortraitError, Result};
use image::{imageops, DynamicImage, RgbaImage};

/// Compute target dimensions under a max bounding box, preserving aspect ratio
///
/// Only downscaling is performed: inputs already inside the box come back
/// unchanged. Scaled dimensions are floored so buffer allocation always
/// receives integral sizes.
///
/// # Errors
///
/// Returns `PortraitError::InvalidImage` when any dimension is zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn compute_target_dimensions(
    natural_width: u32,
    natural_height: u32,
    max_width: u32,
    max_height: u32,
) -> Result<(u32, u32)> {
    if natural_width == 0 || natural_height == 0 {
        return Err(PortraitError::invalid_image(format!(
            "zero-area input: {}x{}",
            natural_width, natural_height
        )));
    }
    if max_width == 0 || max_height == 0 {
        return Err(PortraitError::invalid_image(format!(
            "zero-area bounding box: {}x{}",
            max_width, max_height
        )));
    }

    if natural_width <= max_width && natural_height <= max_height {
        return Ok((natural_width, natural_height));
    }

    let ratio = (f64::from(max_width) / f64::from(natural_width))
        .min(f64::from(max_height) / f64::from(natural_height));

    // Floored, but never below 1px for extreme aspect ratios
    let width = ((f64::from(natural_width) * ratio).floor() as u32).max(1);
    let height = ((f64::from(natural_height) * ratio).floor() as u32).max(1);
    Ok((width, height))
}

/// Render a resized copy of the source at exactly the given dimensions
///
/// The source fills the destination completely; letterboxing happens only in
/// the final composite, never here. The source is not mutated.
///
/// # Errors
///
/// Returns `PortraitError::InvalidImage` for zero target dimensions.
pub fn render_resized(image: &DynamicImage, width: u32, height: u32) -> Result<RgbaImage> {
    if width == 0 || height == 0 {
        return Err(PortraitError::invalid_image(format!(
            "zero-area resize target: {}x{}",
            width, height
        )));
    }
    if image.width() == width && image.height() == height {
        return Ok(image.to_rgba8());
    }
    Ok(imageops::resize(
        &image.to_rgba8(),
        width,
        height,
        imageops::FilterType::Triangle,
    ))
}
