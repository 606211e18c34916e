//! Background-removal collaborator abstraction
//!
//! The semantic segmentation that separates subject from background is an
//! external capability. This module defines the narrow interface the
//! pipeline consumes so the concrete model runtime is swappable without
//! touching the compositor.

use crate::error::Result;
use async_trait::async_trait;
use image::DynamicImage;

/// Capability interface for the external segmentation model
///
/// Given an image, produce an image isolating the foreground subject, with
/// background pixels fully transparent. Calls may take multiple seconds and
/// are assumed non-cancellable; callers drop the future to abandon a result
/// but must not expect the underlying work to stop.
#[async_trait]
pub trait Segmenter: Send + Sync {
    /// Isolate the foreground subject of `image`
    ///
    /// # Errors
    ///
    /// Returns `PortraitError::Segmentation` when the collaborator fails or
    /// rejects the input.
    async fn segment(&self, image: &DynamicImage) -> Result<DynamicImage>;
}

#[async_trait]
impl<T: Segmenter + ?Sized> Segmenter for Box<T> {
    async fn segment(&self, image: &DynamicImage) -> Result<DynamicImage> {
        (**self).segment(image).await
    }
}
