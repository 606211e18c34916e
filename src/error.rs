//! Error types for portrait compositing operations

use thiserror::Error;

/// Convenience result type used throughout the crate
pub type Result<T> = std::result::Result<T, PortraitError>;

/// Errors that can occur while building a portrait composite
#[derive(Debug, Error)]
pub enum PortraitError {
    /// Input raster is undecodable, empty, or has zero area
    #[error("invalid image: {message}")]
    InvalidImage { message: String },

    /// Pre-processing format conversion (e.g. HEIC to JPEG) failed
    #[error("format conversion failed: {message}")]
    Conversion { message: String },

    /// The external segmentation collaborator failed or rejected the request
    #[error("segmentation failed: {message}")]
    Segmentation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Drawing or encoding the destination surface failed
    #[error("render failed: {message}")]
    Render { message: String },

    /// The segmentation stage exceeded its configured deadline
    #[error("segmentation timed out after {seconds:.1}s")]
    Timeout { seconds: f64 },

    /// Configuration validation failed
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// File I/O error while saving a result
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl PortraitError {
    /// Create an invalid image error
    pub fn invalid_image<S: Into<String>>(message: S) -> Self {
        Self::InvalidImage {
            message: message.into(),
        }
    }

    /// Create a format conversion error
    pub fn conversion<S: Into<String>>(message: S) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    /// Create a segmentation error without an underlying cause
    pub fn segmentation<S: Into<String>>(message: S) -> Self {
        Self::Segmentation {
            message: message.into(),
            source: None,
        }
    }

    /// Create a segmentation error wrapping the collaborator's own error
    pub fn segmentation_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Segmentation {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a render error
    pub fn render<S: Into<String>>(message: S) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Create a timeout error for the given elapsed deadline
    pub fn timeout(deadline: std::time::Duration) -> Self {
        Self::Timeout {
            seconds: deadline.as_secs_f64(),
        }
    }

    /// Create a configuration validation error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an I/O error with context about the operation that failed
    pub fn io<S: Into<String>>(message: S, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Whether the error originated in an external collaborator rather than
    /// this crate's own pixel arithmetic
    #[must_use]
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Segmentation { .. } | Self::Conversion { .. } | Self::Timeout { .. }
        )
    }
}
