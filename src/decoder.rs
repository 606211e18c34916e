//! Asynchronous byte-buffer decoding

use crate::convert::{is_heif, FormatConverter};
use crate::error::{PortraitError, Result};
use image::DynamicImage;
use log::debug;

/// Decode an image byte buffer into a raster image
///
/// Decoding runs on the blocking pool so a large JPEG never stalls the
/// cooperative loop. HEIC/HEIF buffers are routed through the `converter`
/// collaborator first; without one they are rejected.
///
/// # Errors
///
/// - `PortraitError::InvalidImage` for empty, undecodable, or zero-area input
/// - `PortraitError::Conversion` when HEIF input cannot be converted
pub async fn decode_image(
    bytes: &[u8],
    converter: Option<&dyn FormatConverter>,
) -> Result<DynamicImage> {
    if bytes.is_empty() {
        return Err(PortraitError::invalid_image("empty input buffer"));
    }

    let bytes = if is_heif(bytes) {
        debug!("HEIF input detected, converting to JPEG before decode");
        match converter {
            Some(converter) => converter.convert(bytes).await?,
            None => {
                return Err(PortraitError::conversion(
                    "HEIF input requires a format converter, none configured",
                ));
            },
        }
    } else {
        bytes.to_vec()
    };

    let image = tokio::task::spawn_blocking(move || {
        image::load_from_memory(&bytes)
            .map_err(|e| PortraitError::invalid_image(format!("failed to decode image: {}", e)))
    })
    .await
    .map_err(|e| PortraitError::render(format!("decode task panicked: {}", e)))??;

    if image.width() == 0 || image.height() == 0 {
        return Err(PortraitError::invalid_image("decoded image has zero area"));
    }

    debug!("Decoded {}x{} image", image.width(), image.height());
    Ok(image)
}
