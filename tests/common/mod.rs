//! Shared fixtures and mock collaborators for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bokehify::{FormatConverter, Result, Segmenter};
use image::{DynamicImage, Rgba, RgbaImage};
use std::io::Cursor;
use std::time::Duration;

/// Encode a solid-color image as PNG bytes
pub fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

/// A minimal HEIF-branded buffer (ftyp box only, not decodable)
pub fn heif_bytes() -> Vec<u8> {
    let mut bytes = vec![0x00, 0x00, 0x00, 0x18];
    bytes.extend_from_slice(b"ftypheic");
    bytes.extend_from_slice(&[0; 8]);
    bytes
}

/// Segmenter that returns its input untouched
pub struct IdentitySegmenter;

#[async_trait]
impl Segmenter for IdentitySegmenter {
    async fn segment(&self, image: &DynamicImage) -> Result<DynamicImage> {
        Ok(image.clone())
    }
}

/// Segmenter that keeps an opaque red square in the center and makes
/// everything else fully transparent, mimicking a subject cut-out
pub struct CenterSubjectSegmenter;

#[async_trait]
impl Segmenter for CenterSubjectSegmenter {
    async fn segment(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let (width, height) = (image.width(), image.height());
        let mut cutout = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        for y in height / 4..height * 3 / 4 {
            for x in width / 4..width * 3 / 4 {
                cutout.put_pixel(x, y, Rgba([220, 30, 30, 255]));
            }
        }
        Ok(DynamicImage::ImageRgba8(cutout))
    }
}

/// Segmenter whose latency depends on the input width, so overlapping
/// requests resolve in a deterministic order regardless of call order
pub struct SizeKeyedDelaySegmenter {
    /// `(input_width, delay)` pairs; unmatched widths complete immediately
    pub delays: Vec<(u32, Duration)>,
}

#[async_trait]
impl Segmenter for SizeKeyedDelaySegmenter {
    async fn segment(&self, image: &DynamicImage) -> Result<DynamicImage> {
        let delay = self
            .delays
            .iter()
            .find(|(width, _)| *width == image.width())
            .map(|(_, delay)| *delay)
            .unwrap_or_default();
        tokio::time::sleep(delay).await;
        Ok(image.clone())
    }
}

/// Segmenter that always rejects
pub struct RejectingSegmenter;

#[async_trait]
impl Segmenter for RejectingSegmenter {
    async fn segment(&self, _image: &DynamicImage) -> Result<DynamicImage> {
        Err(bokehify::PortraitError::segmentation(
            "collaborator rejected the request",
        ))
    }
}

/// Converter that answers every request with a fixed JPEG-decodable buffer
pub struct FixedConverter(pub Vec<u8>);

#[async_trait]
impl FormatConverter for FixedConverter {
    async fn convert(&self, _bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}
