#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]

//! # Bokehify
//!
//! A portrait depth-of-field compositor: given an image and an external
//! background-removal capability, produces a stylized portrait by blending
//! the segmented subject over a blurred, brightened copy of the original.
//!
//! The segmentation itself is not part of this crate — it is consumed
//! through the narrow [`Segmenter`] trait, so any ML runtime (local model,
//! remote service) can be plugged in without touching the compositor.
//!
//! ## Pipeline
//!
//! One request flows through four stages, strictly in order: decode the
//! input buffer, downscale it into the configured bounding box, send the
//! resized image to the segmentation collaborator, then composite and encode
//! the result. Overlapping submissions follow last-submission-wins: a stale
//! request's result is discarded, never published.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bokehify::{PortraitConfig, PortraitPipeline, Segmenter};
//! use bokehify::error::Result;
//! use async_trait::async_trait;
//! use image::DynamicImage;
//!
//! struct MySegmenter; // wraps your background-removal model
//!
//! #[async_trait]
//! impl Segmenter for MySegmenter {
//!     async fn segment(&self, image: &DynamicImage) -> Result<DynamicImage> {
//!         // call into the ML runtime here
//!         Ok(image.clone())
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = PortraitPipeline::builder()
//!     .config(PortraitConfig::builder().bounding_box(800, 800).build()?)
//!     .segmenter(Box::new(MySegmenter))
//!     .build()?;
//!
//! let bytes = std::fs::read("input.jpg")?;
//! if let Some(composite) = pipeline.submit(&bytes).await? {
//!     composite.save(composite.suggested_filename())?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## One-shot usage
//!
//! Without supersession semantics, [`compose_portrait_from_bytes`] runs a
//! single buffer through the pipeline and returns the encoded result
//! directly.

pub mod compositor;
pub mod config;
pub mod convert;
pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod resize;
pub mod segmentation;
pub mod types;

pub use config::{OutputFormat, PortraitConfig, PortraitConfigBuilder};
pub use convert::FormatConverter;
pub use error::{PortraitError, Result};
pub use pipeline::{PortraitPipeline, PortraitPipelineBuilder, PublishedResult, RequestState};
pub use progress::{LogProgressReporter, NoOpProgressReporter, ProgressReporter};
pub use segmentation::Segmenter;
pub use types::{FinalComposite, StageTimings};

use tokio::io::{AsyncRead, AsyncReadExt};

/// Run one image buffer through the full pipeline with the given config
///
/// Convenience wrapper for one-shot use; build a [`PortraitPipeline`] when
/// overlapping submissions or progress reporting matter.
///
/// # Errors
///
/// Propagates the failing stage's error; see [`PortraitError`].
pub async fn compose_portrait_from_bytes(
    bytes: &[u8],
    config: &PortraitConfig,
    segmenter: Box<dyn Segmenter>,
) -> Result<FinalComposite> {
    let pipeline = PortraitPipeline::builder()
        .config(config.clone())
        .segmenter(segmenter)
        .build()?;
    pipeline.process(bytes).await
}

/// Read an image from an async reader and run it through the full pipeline
///
/// # Errors
///
/// Returns `PortraitError::Io` when reading fails, otherwise propagates the
/// failing stage's error.
pub async fn compose_portrait_from_reader<R: AsyncRead + Unpin>(
    mut reader: R,
    config: &PortraitConfig,
    segmenter: Box<dyn Segmenter>,
) -> Result<FinalComposite> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| PortraitError::io("failed to read input", e))?;
    compose_portrait_from_bytes(&bytes, config, segmenter).await
}
