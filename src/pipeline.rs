//! Pipeline orchestrator
//!
//! Sequences decode, resize, segmentation, and compositing for one request
//! and owns the only piece of cross-stage state: the published-result slot.
//! Overlapping submissions follow last-submission-wins — a superseded
//! request's result is dropped on completion, its in-flight work is never
//! aborted (the segmentation collaborator is assumed non-cancellable).

use crate::compositor;
use crate::config::PortraitConfig;
use crate::convert::FormatConverter;
use crate::decoder::decode_image;
use crate::error::{PortraitError, Result};
use crate::progress::{NoOpProgressReporter, ProgressReporter};
use crate::resize::{compute_target_dimensions, render_resized};
use crate::segmentation::Segmenter;
use crate::types::{FinalComposite, StageTimings};
use image::DynamicImage;
use instant::Instant;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::instrument;

/// Lifecycle states of one composite request
///
/// Transitions are strictly sequential; `SegmentationPending` is the only
/// state with externally-variable latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Request accepted, nothing started yet
    Submitted,
    /// Decoding the input byte buffer
    Decoding,
    /// Computing target dimensions and rendering the resized copy
    Resizing,
    /// Waiting on the external segmentation collaborator
    SegmentationPending,
    /// Drawing and encoding the final composite
    Compositing,
    /// Result produced (published only if the request is still the latest)
    Done,
    /// A stage failed; intermediates released, nothing published
    Failed,
}

impl RequestState {
    /// Human-readable description of the state
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Submitted => "Request submitted",
            Self::Decoding => "Decoding input image",
            Self::Resizing => "Resizing to bounding box",
            Self::SegmentationPending => "Waiting for background removal",
            Self::Compositing => "Compositing portrait effect",
            Self::Done => "Processing completed",
            Self::Failed => "Processing failed",
        }
    }
}

/// A composite published to the visible output slot
#[derive(Debug, Clone)]
pub struct PublishedResult {
    /// Sequence identifier of the request that produced this result
    pub request_id: u64,
    /// The encoded composite
    pub composite: FinalComposite,
}

/// Orchestrator for portrait composite requests
///
/// Create with [`PortraitPipeline::builder`]. The pipeline is `Send + Sync`;
/// overlapping [`submit`](Self::submit) calls are resolved by supersession.
pub struct PortraitPipeline {
    config: PortraitConfig,
    segmenter: Box<dyn Segmenter>,
    converter: Option<Box<dyn FormatConverter>>,
    reporter: Arc<dyn ProgressReporter>,
    submissions: AtomicU64,
    published: Mutex<Option<PublishedResult>>,
}

impl PortraitPipeline {
    /// Create a pipeline builder
    #[must_use]
    pub fn builder() -> PortraitPipelineBuilder {
        PortraitPipelineBuilder::new()
    }

    /// The configuration this pipeline runs with
    #[must_use]
    pub fn config(&self) -> &PortraitConfig {
        &self.config
    }

    /// Submit one image buffer and run it through the full pipeline
    ///
    /// Returns `Ok(Some(composite))` when the result was published,
    /// `Ok(None)` when a later submission superseded this one and the result
    /// was discarded.
    ///
    /// # Errors
    ///
    /// Propagates the failing stage's error; the published slot is never
    /// modified on failure.
    #[instrument(skip(self, bytes), fields(request_id, input_len = bytes.len()))]
    pub async fn submit(&self, bytes: &[u8]) -> Result<Option<FinalComposite>> {
        let request_id = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("request_id", request_id);
        self.transition(request_id, RequestState::Submitted);

        match self.run_request(request_id, bytes).await {
            Ok(composite) => {
                self.transition(request_id, RequestState::Done);
                if self.is_stale(request_id) {
                    info!(
                        "request {} superseded by a later submission, result discarded",
                        request_id
                    );
                    return Ok(None);
                }
                self.publish(request_id, composite.clone());
                Ok(Some(composite))
            },
            Err(e) => {
                // Intermediate buffers are owned by run_request and already
                // dropped; the published slot stays as it was.
                self.transition(request_id, RequestState::Failed);
                warn!("request {} failed: {}", request_id, e);
                Err(e)
            },
        }
    }

    /// Run one request to completion without touching the published slot
    ///
    /// # Errors
    ///
    /// Propagates the failing stage's error.
    pub async fn process(&self, bytes: &[u8]) -> Result<FinalComposite> {
        let request_id = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(request_id, RequestState::Submitted);
        let result = self.run_request(request_id, bytes).await;
        match &result {
            Ok(_) => self.transition(request_id, RequestState::Done),
            Err(_) => self.transition(request_id, RequestState::Failed),
        }
        result
    }

    /// The currently published result, if any request has completed
    #[must_use]
    pub fn current_result(&self) -> Option<PublishedResult> {
        self.published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn run_request(&self, request_id: u64, bytes: &[u8]) -> Result<FinalComposite> {
        let mut timings = StageTimings::default();
        let total_start = Instant::now();

        // Decode
        self.transition(request_id, RequestState::Decoding);
        let stage_start = Instant::now();
        let decoded = decode_image(bytes, self.converter.as_deref()).await?;
        timings.decode = stage_start.elapsed();

        // Resize; the decoded buffer is released as soon as the resized copy
        // exists
        self.transition(request_id, RequestState::Resizing);
        let stage_start = Instant::now();
        let (width, height) = compute_target_dimensions(
            decoded.width(),
            decoded.height(),
            self.config.max_width,
            self.config.max_height,
        )?;
        let background = render_resized(&decoded, width, height)?;
        drop(decoded);
        timings.resize = stage_start.elapsed();
        debug!("request {}: resized to {}x{}", request_id, width, height);

        // Segmentation, with optional deadline. The collaborator sees the
        // resized raster, not the full-resolution original.
        self.transition(request_id, RequestState::SegmentationPending);
        let stage_start = Instant::now();
        let subject_input = DynamicImage::ImageRgba8(background.clone());
        let segmented = match self.config.segmentation_timeout {
            Some(deadline) => tokio::time::timeout(
                deadline,
                self.segmenter.segment(&subject_input),
            )
            .await
            .map_err(|_| PortraitError::timeout(deadline))??,
            None => self.segmenter.segment(&subject_input).await?,
        };
        drop(subject_input);
        timings.segmentation = stage_start.elapsed();

        // Composite and encode, synchronously between suspension points
        self.transition(request_id, RequestState::Compositing);
        let stage_start = Instant::now();
        let foreground = segmented.into_rgba8();
        let canvas = compositor::compose(&background, &foreground, width, height, &self.config)?;
        timings.composite = stage_start.elapsed();

        let stage_start = Instant::now();
        let data = compositor::encode(&canvas, &self.config)?;
        timings.encode = stage_start.elapsed();
        timings.total = total_start.elapsed();
        debug!("request {}: {}", request_id, timings);

        Ok(FinalComposite::new(
            data,
            self.config.output_format,
            width,
            height,
            timings,
        ))
    }

    fn transition(&self, request_id: u64, state: RequestState) {
        tracing::debug!(request_id, state = ?state, "{}", state.description());
        self.reporter.report_stage(request_id, state);
    }

    fn is_stale(&self, request_id: u64) -> bool {
        request_id != self.submissions.load(Ordering::SeqCst)
    }

    fn publish(&self, request_id: u64, composite: FinalComposite) {
        let mut slot = self
            .published
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Publication is monotonic in submission order even if two non-stale
        // checks race
        if slot.as_ref().is_some_and(|p| p.request_id > request_id) {
            return;
        }
        *slot = Some(PublishedResult {
            request_id,
            composite,
        });
    }
}

impl std::fmt::Debug for PortraitPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortraitPipeline")
            .field("config", &self.config)
            .field("submissions", &self.submissions.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Builder for [`PortraitPipeline`]
pub struct PortraitPipelineBuilder {
    config: PortraitConfig,
    segmenter: Option<Box<dyn Segmenter>>,
    converter: Option<Box<dyn FormatConverter>>,
    reporter: Arc<dyn ProgressReporter>,
}

impl PortraitPipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PortraitConfig::default(),
            segmenter: None,
            converter: None,
            reporter: Arc::new(NoOpProgressReporter),
        }
    }

    #[must_use]
    pub fn config(mut self, config: PortraitConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn segmenter(mut self, segmenter: Box<dyn Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }

    #[must_use]
    pub fn converter(mut self, converter: Box<dyn FormatConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    #[must_use]
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Build the pipeline
    ///
    /// # Errors
    ///
    /// Returns `PortraitError::InvalidConfig` when no segmenter was provided
    /// or the configuration fails validation.
    pub fn build(self) -> Result<PortraitPipeline> {
        let segmenter = self
            .segmenter
            .ok_or_else(|| PortraitError::invalid_config("a segmenter is required"))?;
        self.config.validate()?;
        Ok(PortraitPipeline {
            config: self.config,
            segmenter,
            converter: self.converter,
            reporter: self.reporter,
            submissions: AtomicU64::new(0),
            published: Mutex::new(None),
        })
    }
}

impl Default for PortraitPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::RgbaImage;
    use std::io::Cursor;

    struct IdentitySegmenter;

    #[async_trait]
    impl Segmenter for IdentitySegmenter {
        async fn segment(&self, image: &DynamicImage) -> Result<DynamicImage> {
            Ok(image.clone())
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([90, 90, 90, 255]),
        ));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn pipeline() -> PortraitPipeline {
        PortraitPipeline::builder()
            .segmenter(Box::new(IdentitySegmenter))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_segmenter() {
        let err = PortraitPipeline::builder().build().unwrap_err();
        assert!(matches!(err, PortraitError::InvalidConfig { .. }));
    }

    #[test]
    fn test_state_descriptions_are_distinct() {
        let states = [
            RequestState::Submitted,
            RequestState::Decoding,
            RequestState::Resizing,
            RequestState::SegmentationPending,
            RequestState::Compositing,
            RequestState::Done,
            RequestState::Failed,
        ];
        let mut seen = std::collections::HashSet::new();
        for state in states {
            assert!(seen.insert(state.description()));
        }
    }

    #[tokio::test]
    async fn test_single_submission_publishes() {
        let pipeline = pipeline();
        let result = pipeline.submit(&png_bytes(1600, 1200)).await.unwrap();
        let composite = result.expect("sole submission must publish");
        assert_eq!(composite.dimensions(), (800, 600));
        let published = pipeline.current_result().unwrap();
        assert_eq!(published.request_id, 1);
        assert_eq!(published.composite.dimensions(), (800, 600));
    }

    #[tokio::test]
    async fn test_small_input_not_upscaled() {
        let pipeline = pipeline();
        let composite = pipeline.process(&png_bytes(400, 300)).await.unwrap();
        assert_eq!(composite.dimensions(), (400, 300));
    }

    #[tokio::test]
    async fn test_failure_leaves_slot_untouched() {
        let pipeline = pipeline();
        pipeline.submit(&png_bytes(64, 64)).await.unwrap();
        let before = pipeline.current_result().unwrap();

        let err = pipeline.submit(&[]).await.unwrap_err();
        assert!(matches!(err, PortraitError::InvalidImage { .. }));

        let after = pipeline.current_result().unwrap();
        assert_eq!(after.request_id, before.request_id);
        assert_eq!(after.composite.bytes(), before.composite.bytes());
    }

    #[tokio::test]
    async fn test_publish_is_monotonic() {
        let pipeline = pipeline();
        let early = pipeline.process(&png_bytes(32, 32)).await.unwrap();
        let late = pipeline.process(&png_bytes(16, 16)).await.unwrap();
        pipeline.publish(5, late);
        pipeline.publish(3, early);
        assert_eq!(pipeline.current_result().unwrap().request_id, 5);
    }
}
