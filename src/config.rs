//! Configuration types for portrait compositing

use crate::error::{PortraitError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output image format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency, alpha flattened over black)
    Jpeg,
}

impl Default for OutputFormat {
    fn default() -> Self {
        // PNG preserves the transparent margins the contain-fit can leave
        Self::Png
    }
}

impl OutputFormat {
    /// File extension for this format (without the dot)
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
        }
    }

    /// Whether the format carries an alpha channel
    #[must_use]
    pub fn supports_transparency(self) -> bool {
        match self {
            Self::Png => true,
            Self::Jpeg => false,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Configuration for the portrait compositing pipeline
///
/// All visual parameters are fixed per pipeline instance; there is no runtime
/// configuration surface beyond this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortraitConfig {
    /// Maximum width the resizer will scale an input down to
    pub max_width: u32,
    /// Maximum height the resizer will scale an input down to
    pub max_height: u32,
    /// Gaussian blur sigma applied to the background layer
    pub blur_sigma: f32,
    /// Brightness multiplier for the background layer (1.0 = unchanged)
    pub brightness: f32,
    /// Background magnification factor; hides blur-darkened edges by drawing
    /// the layer slightly larger than the canvas
    pub background_scale: f32,
    /// Encoding of the final composite
    pub output_format: OutputFormat,
    /// JPEG quality (0-100), ignored for PNG output
    pub jpeg_quality: u8,
    /// Deadline for the external segmentation call; `None` waits indefinitely
    #[serde(with = "timeout_serde")]
    pub segmentation_timeout: Option<Duration>,
}

impl Default for PortraitConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
            blur_sigma: 15.0,
            brightness: 0.8,
            background_scale: 1.05,
            output_format: OutputFormat::Png,
            jpeg_quality: 90,
            segmentation_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl PortraitConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> PortraitConfigBuilder {
        PortraitConfigBuilder::new()
    }

    /// Validate configuration invariants
    ///
    /// # Errors
    ///
    /// Returns `PortraitError::InvalidConfig` for zero bounding-box
    /// dimensions, non-positive scale factors, negative blur sigma, or
    /// out-of-range quality values.
    pub fn validate(&self) -> Result<()> {
        if self.max_width == 0 || self.max_height == 0 {
            return Err(PortraitError::invalid_config(format!(
                "bounding box must be non-zero, got {}x{}",
                self.max_width, self.max_height
            )));
        }
        if self.blur_sigma < 0.0 {
            return Err(PortraitError::invalid_config(format!(
                "blur sigma must be non-negative, got {}",
                self.blur_sigma
            )));
        }
        if self.brightness <= 0.0 {
            return Err(PortraitError::invalid_config(format!(
                "brightness multiplier must be positive, got {}",
                self.brightness
            )));
        }
        if self.background_scale < 1.0 {
            return Err(PortraitError::invalid_config(format!(
                "background scale must be >= 1.0 to cover the canvas, got {}",
                self.background_scale
            )));
        }
        if self.jpeg_quality > 100 {
            return Err(PortraitError::invalid_config(format!(
                "JPEG quality must be 0-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Builder for `PortraitConfig`
pub struct PortraitConfigBuilder {
    config: PortraitConfig,
}

impl PortraitConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PortraitConfig::default(),
        }
    }

    #[must_use]
    pub fn bounding_box(mut self, max_width: u32, max_height: u32) -> Self {
        self.config.max_width = max_width;
        self.config.max_height = max_height;
        self
    }

    #[must_use]
    pub fn blur_sigma(mut self, sigma: f32) -> Self {
        self.config.blur_sigma = sigma;
        self
    }

    #[must_use]
    pub fn brightness(mut self, factor: f32) -> Self {
        self.config.brightness = factor;
        self
    }

    #[must_use]
    pub fn background_scale(mut self, factor: f32) -> Self {
        self.config.background_scale = factor;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(0, 100);
        self
    }

    #[must_use]
    pub fn segmentation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.segmentation_timeout = timeout;
        self
    }

    /// Build the configuration, validating all invariants
    ///
    /// # Errors
    ///
    /// Returns `PortraitError::InvalidConfig` when validation fails; see
    /// [`PortraitConfig::validate`].
    pub fn build(self) -> Result<PortraitConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for PortraitConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

mod timeout_serde {
    //! Serialize the segmentation timeout as fractional seconds

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs_f64))
    }
}
