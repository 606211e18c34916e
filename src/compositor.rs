//! Portrait effect compositing — the core algorithm
//!
//! Builds the final image in two layers on one destination canvas: a blurred,
//! brightened, slightly magnified copy of the original underneath, and the
//! segmented foreground contain-fit on top. Each layer is prepared in its own
//! buffer, so the foreground draw can never inherit the background's filters.

use crate::config::{OutputFormat, PortraitConfig};
use crate::error::{PortraitError, Result};
use image::{imageops, ImageBuffer, RgbImage, RgbaImage};
use log::debug;
use std::io::Cursor;

/// Placement of a layer on the destination canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LayerPlacement {
    pub width: u32,
    pub height: u32,
    pub offset_x: i64,
    pub offset_y: i64,
}

/// Compute the magnified background placement
///
/// The layer is drawn larger than the canvas and centered, so its offsets are
/// negative and the blur-darkened edges land off-canvas.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn background_placement(width: u32, height: u32, scale: f32) -> LayerPlacement {
    let scaled_width = ((f64::from(width) * f64::from(scale)).round() as u32).max(width);
    let scaled_height = ((f64::from(height) * f64::from(scale)).round() as u32).max(height);
    LayerPlacement {
        width: scaled_width,
        height: scaled_height,
        offset_x: (i64::from(width) - i64::from(scaled_width)) / 2,
        offset_y: (i64::from(height) - i64::from(scaled_height)) / 2,
    }
}

/// Compute the contain-fit foreground placement
///
/// The whole foreground stays visible: a relatively wider foreground fits by
/// width and centers vertically, otherwise it fits by height and centers
/// horizontally. At least one axis always spans the full canvas.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn contain_placement(
    foreground_width: u32,
    foreground_height: u32,
    width: u32,
    height: u32,
) -> LayerPlacement {
    let aspect_ratio = f64::from(foreground_width) / f64::from(foreground_height);
    let canvas_aspect_ratio = f64::from(width) / f64::from(height);

    let (draw_width, draw_height) = if aspect_ratio > canvas_aspect_ratio {
        let draw_height = ((f64::from(width) / aspect_ratio).round() as u32).max(1);
        (width, draw_height)
    } else {
        let draw_width = ((f64::from(height) * aspect_ratio).round() as u32).max(1);
        (draw_width, height)
    };

    LayerPlacement {
        width: draw_width,
        height: draw_height,
        offset_x: (i64::from(width) - i64::from(draw_width)) / 2,
        offset_y: (i64::from(height) - i64::from(draw_height)) / 2,
    }
}

/// Multiply the RGB channels of every pixel, leaving alpha untouched
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn apply_brightness(image: &mut RgbaImage, factor: f32) {
    if (factor - 1.0).abs() < f32::EPSILON {
        return;
    }
    for pixel in image.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = (f32::from(*channel) * factor).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Compose the blurred background and isolated foreground onto one canvas
///
/// Order is load-bearing: the background layer is fully prepared and drawn
/// before the foreground is placed on top of it.
///
/// # Errors
///
/// Returns `PortraitError::InvalidImage` when either input raster or the
/// destination has zero area.
pub fn compose(
    background: &RgbaImage,
    foreground: &RgbaImage,
    width: u32,
    height: u32,
    config: &PortraitConfig,
) -> Result<RgbaImage> {
    if background.width() == 0 || background.height() == 0 {
        return Err(PortraitError::invalid_image("zero-area background"));
    }
    if foreground.width() == 0 || foreground.height() == 0 {
        return Err(PortraitError::invalid_image("zero-area foreground"));
    }
    if width == 0 || height == 0 {
        return Err(PortraitError::invalid_image(format!(
            "zero-area destination canvas: {}x{}",
            width, height
        )));
    }

    let mut canvas: RgbaImage = ImageBuffer::new(width, height);

    // Background layer: blur, brighten, magnify, draw centered (offsets go
    // negative, pushing the filter-darkened edges off-canvas).
    let placement = background_placement(width, height, config.background_scale);
    let mut layer = if config.blur_sigma > 0.0 {
        imageops::blur(background, config.blur_sigma)
    } else {
        background.clone()
    };
    apply_brightness(&mut layer, config.brightness);
    let layer = if (layer.width(), layer.height()) == (placement.width, placement.height) {
        layer
    } else {
        imageops::resize(
            &layer,
            placement.width,
            placement.height,
            imageops::FilterType::Triangle,
        )
    };
    imageops::overlay(&mut canvas, &layer, placement.offset_x, placement.offset_y);
    debug!(
        "Background layer {}x{} at ({}, {})",
        placement.width, placement.height, placement.offset_x, placement.offset_y
    );

    // Foreground layer: contain-fit on a fresh buffer, never cropped. No
    // filter state carries over from the background draw.
    let placement = contain_placement(foreground.width(), foreground.height(), width, height);
    let layer = if (foreground.width(), foreground.height()) == (placement.width, placement.height)
    {
        foreground.clone()
    } else {
        imageops::resize(
            foreground,
            placement.width,
            placement.height,
            imageops::FilterType::Triangle,
        )
    };
    imageops::overlay(&mut canvas, &layer, placement.offset_x, placement.offset_y);
    debug!(
        "Foreground layer {}x{} at ({}, {})",
        placement.width, placement.height, placement.offset_x, placement.offset_y
    );

    Ok(canvas)
}

/// Encode the destination canvas into the configured output format
///
/// JPEG output flattens the alpha channel over black; PNG keeps it.
///
/// # Errors
///
/// Returns `PortraitError::Render` when the encoder fails.
pub fn encode(canvas: &RgbaImage, config: &PortraitConfig) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    match config.output_format {
        OutputFormat::Png => {
            image::DynamicImage::ImageRgba8(canvas.clone())
                .write_to(&mut buffer, image::ImageFormat::Png)
                .map_err(|e| PortraitError::render(format!("PNG encoding failed: {}", e)))?;
        },
        OutputFormat::Jpeg => {
            let rgb = flatten_alpha(canvas);
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                &mut buffer,
                config.jpeg_quality,
            );
            rgb.write_with_encoder(encoder)
                .map_err(|e| PortraitError::render(format!("JPEG encoding failed: {}", e)))?;
        },
    }
    Ok(buffer.into_inner())
}

/// Blend RGBA over black, dropping the alpha channel
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn flatten_alpha(rgba: &RgbaImage) -> RgbImage {
    let (width, height) = rgba.dimensions();
    let mut rgb = ImageBuffer::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = f32::from(pixel[3]) / 255.0;
        rgb.put_pixel(
            x,
            y,
            image::Rgb([
                (f32::from(pixel[0]) * alpha) as u8,
                (f32::from(pixel[1]) * alpha) as u8,
                (f32::from(pixel[2]) * alpha) as u8,
            ]),
        );
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_background_placement_magnifies_and_centers() {
        let placement = background_placement(800, 600, 1.05);
        assert_eq!(placement.width, 840);
        assert_eq!(placement.height, 630);
        assert_eq!(placement.offset_x, -20);
        assert_eq!(placement.offset_y, -15);
    }

    #[test]
    fn test_background_placement_identity_scale() {
        let placement = background_placement(800, 600, 1.0);
        assert_eq!((placement.width, placement.height), (800, 600));
        assert_eq!((placement.offset_x, placement.offset_y), (0, 0));
    }

    #[test]
    fn test_contain_fit_wider_foreground_spans_width() {
        // 2:1 foreground over a 1:1 canvas draws at full width, half height,
        // vertically centered
        let placement = contain_placement(200, 100, 800, 800);
        assert_eq!(placement.width, 800);
        assert_eq!(placement.height, 400);
        assert_eq!(placement.offset_x, 0);
        assert_eq!(placement.offset_y, 200);
    }

    #[test]
    fn test_contain_fit_taller_foreground_spans_height() {
        let placement = contain_placement(100, 200, 800, 800);
        assert_eq!(placement.width, 400);
        assert_eq!(placement.height, 800);
        assert_eq!(placement.offset_x, 200);
        assert_eq!(placement.offset_y, 0);
    }

    #[test]
    fn test_contain_fit_matching_aspect_fills_canvas() {
        let placement = contain_placement(400, 300, 800, 600);
        assert_eq!((placement.width, placement.height), (800, 600));
        assert_eq!((placement.offset_x, placement.offset_y), (0, 0));
    }

    #[test]
    fn test_contain_fit_stays_inside_canvas() {
        let ratios = [(1, 999), (999, 1), (3, 2), (2, 3), (797, 601), (1, 1)];
        for (fw, fh) in ratios {
            let p = contain_placement(fw, fh, 640, 480);
            assert!(p.offset_x >= 0 && p.offset_y >= 0, "{}x{}", fw, fh);
            assert!(p.offset_x + i64::from(p.width) <= 640, "{}x{}", fw, fh);
            assert!(p.offset_y + i64::from(p.height) <= 480, "{}x{}", fw, fh);
            // Touches a full edge pair on exactly one axis unless ratios match
            let spans_width = p.width == 640;
            let spans_height = p.height == 480;
            assert!(spans_width || spans_height, "{}x{}", fw, fh);
        }
    }

    #[test]
    fn test_compose_rejects_zero_area_inputs() {
        let good = solid(10, 10, [255, 255, 255, 255]);
        let config = PortraitConfig::default();
        assert!(compose(&good, &good, 0, 10, &config).is_err());
        // RgbaImage::new(0, 0) is constructible; compose must reject it
        let empty = RgbaImage::new(0, 0);
        assert!(compose(&empty, &good, 10, 10, &config).is_err());
        assert!(compose(&good, &empty, 10, 10, &config).is_err());
    }

    #[test]
    fn test_compose_is_deterministic() {
        let background = solid(64, 48, [120, 80, 40, 255]);
        let mut foreground = solid(32, 32, [0, 0, 0, 0]);
        for y in 8..24 {
            for x in 8..24 {
                foreground.put_pixel(x, y, Rgba([250, 10, 10, 255]));
            }
        }
        let config = PortraitConfig::default();
        let first = compose(&background, &foreground, 64, 48, &config).unwrap();
        let second = compose(&background, &foreground, 64, 48, &config).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());

        let encoded_first = encode(&first, &config).unwrap();
        let encoded_second = encode(&second, &config).unwrap();
        assert_eq!(encoded_first, encoded_second);
    }

    #[test]
    fn test_brightness_darkens_background() {
        // Flat white background, fully transparent foreground: every canvas
        // pixel comes from the brightened background layer
        let background = solid(40, 40, [200, 200, 200, 255]);
        let foreground = solid(40, 40, [0, 0, 0, 0]);
        let config = PortraitConfig::builder()
            .blur_sigma(0.0)
            .brightness(0.5)
            .background_scale(1.0)
            .build()
            .unwrap();
        let result = compose(&background, &foreground, 40, 40, &config).unwrap();
        let center = result.get_pixel(20, 20);
        assert_eq!(center[0], 100);
        assert_eq!(center[1], 100);
        assert_eq!(center[2], 100);
    }

    #[test]
    fn test_foreground_drawn_over_background() {
        let background = solid(40, 40, [0, 0, 255, 255]);
        let foreground = solid(40, 40, [255, 0, 0, 255]);
        let config = PortraitConfig::builder()
            .blur_sigma(0.0)
            .brightness(1.0)
            .background_scale(1.0)
            .build()
            .unwrap();
        let result = compose(&background, &foreground, 40, 40, &config).unwrap();
        assert_eq!(result.get_pixel(20, 20), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_contain_margins_show_background() {
        // 2:1 foreground on a square canvas leaves top/bottom margins filled
        // by the background layer
        let background = solid(40, 40, [0, 255, 0, 255]);
        let foreground = solid(80, 40, [255, 0, 0, 255]);
        let config = PortraitConfig::builder()
            .blur_sigma(0.0)
            .brightness(1.0)
            .background_scale(1.0)
            .build()
            .unwrap();
        let result = compose(&background, &foreground, 40, 40, &config).unwrap();
        // Margin rows (0..10 and 30..40) are background
        assert_eq!(result.get_pixel(20, 2), &Rgba([0, 255, 0, 255]));
        assert_eq!(result.get_pixel(20, 37), &Rgba([0, 255, 0, 255]));
        // Center band is foreground
        assert_eq!(result.get_pixel(20, 20), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_encode_png_and_jpeg_round_trip() {
        let canvas = solid(16, 16, [10, 200, 30, 255]);
        let png_config = PortraitConfig::default();
        let png = encode(&canvas, &png_config).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 16));

        let jpeg_config = PortraitConfig::builder()
            .output_format(OutputFormat::Jpeg)
            .build()
            .unwrap();
        let jpeg = encode(&canvas, &jpeg_config).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.color().channel_count(), 3);
    }

    #[test]
    fn test_flatten_alpha_blends_over_black() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, Rgba([200, 100, 50, 127]));
        let rgb = flatten_alpha(&rgba);
        let pixel = rgb.get_pixel(0, 0);
        assert_eq!(pixel[0], 99);
        assert_eq!(pixel[1], 49);
        assert_eq!(pixel[2], 24);
    }
}
