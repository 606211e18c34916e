//! Pre-processing format conversion for high-efficiency camera formats
//!
//! HEIC/HEIF decoding is delegated to an external collaborator with a pure
//! byte-to-byte contract: `convert(buffer) -> JPEG-encoded buffer`. The crate
//! only detects when conversion is needed.

use crate::error::Result;
use async_trait::async_trait;

/// HEIF container brands that require pre-conversion before decoding
const HEIF_BRANDS: [&[u8; 4]; 6] = [b"heic", b"heix", b"hevc", b"mif1", b"msf1", b"heif"];

/// Collaborator that converts a high-efficiency image buffer to JPEG
///
/// Implementations wrap whatever native HEIF decoder is available on the
/// platform; the pipeline treats them as a black box.
#[async_trait]
pub trait FormatConverter: Send + Sync {
    /// Convert the input buffer to a JPEG-encoded buffer
    ///
    /// # Errors
    ///
    /// Returns `PortraitError::Conversion` for unsupported or corrupt input.
    async fn convert(&self, bytes: &[u8]) -> Result<Vec<u8>>;
}

/// Whether the buffer is an ISOBMFF container with a HEIF brand
///
/// Checks the `ftyp` box's major brand; compatible brands in the remainder of
/// the box are not inspected, the major brand is sufficient for camera output.
#[must_use]
pub fn is_heif(bytes: &[u8]) -> bool {
    if bytes.len() < 12 {
        return false;
    }
    if &bytes[4..8] != b"ftyp" {
        return false;
    }
    let major_brand: &[u8] = &bytes[8..12];
    HEIF_BRANDS.iter().any(|brand| major_brand == *brand)
}
