//! Result types shared across the pipeline stages

use crate::config::OutputFormat;
use crate::error::{PortraitError, Result};
use std::path::Path;
use std::time::Duration;

/// Per-stage wall-clock timings for one composite request
///
/// Segmentation dominates in practice; the other stages complete within a
/// frame on typical inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub decode: Duration,
    pub resize: Duration,
    pub segmentation: Duration,
    pub composite: Duration,
    pub encode: Duration,
    pub total: Duration,
}

impl StageTimings {
    /// Fraction of the total spent waiting on the segmentation collaborator
    #[must_use]
    pub fn segmentation_share(&self) -> f64 {
        if self.total.is_zero() {
            return 0.0;
        }
        self.segmentation.as_secs_f64() / self.total.as_secs_f64()
    }
}

impl std::fmt::Display for StageTimings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "decode {}ms, resize {}ms, segmentation {}ms, composite {}ms, encode {}ms (total {}ms)",
            self.decode.as_millis(),
            self.resize.as_millis(),
            self.segmentation.as_millis(),
            self.composite.as_millis(),
            self.encode.as_millis(),
            self.total.as_millis()
        )
    }
}

/// The encoded output of one composite request
///
/// Created exclusively by the compositor's encode step and never mutated
/// afterwards.
#[derive(Debug, Clone)]
pub struct FinalComposite {
    data: Vec<u8>,
    format: OutputFormat,
    width: u32,
    height: u32,
    timings: StageTimings,
}

impl FinalComposite {
    pub(crate) fn new(
        data: Vec<u8>,
        format: OutputFormat,
        width: u32,
        height: u32,
        timings: StageTimings,
    ) -> Self {
        Self {
            data,
            format,
            width,
            height,
            timings,
        }
    }

    /// Encoded image bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the composite, returning the encoded bytes
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Encoding of the output bytes
    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Pixel dimensions of the composite
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Per-stage timings recorded while producing this composite
    #[must_use]
    pub fn timings(&self) -> &StageTimings {
        &self.timings
    }

    /// Templated download filename, e.g. `portrait.png`
    #[must_use]
    pub fn suggested_filename(&self) -> String {
        format!("portrait.{}", self.format.extension())
    }

    /// Write the encoded bytes to disk
    ///
    /// # Errors
    ///
    /// Returns `PortraitError::Io` when the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, &self.data).map_err(|e| {
            PortraitError::io(format!("failed to write {}", path.display()), e)
        })
    }
}
