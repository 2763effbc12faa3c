//! Gaussian predictor capability.
//!
//! A predictor turns a normalized image at its processing resolution plus a
//! disparity hint into Gaussians in NDC. The neural model that normally fills
//! this role is linked in from outside; [`BaseDepthPredictor`] is a
//! deterministic implementation driven only by the settings bundle.
//!
//! NDC convention: for a processing-resolution pixel `(u, v)` at depth `z`,
//! the mean is `((2u / P - 1) * z, (2v / P - 1) * z, z)`. Unprojection with
//! the matching intrinsics recovers the pinhole back-projection.

mod base_depth;

pub use base_depth::BaseDepthPredictor;

use crate::error::CoreResult;
use crate::gaussians::GaussianSetNdc;
use crate::processing::ImageTensor;

/// Opaque image-to-Gaussians model.
///
/// Implementations are constructed once from a
/// [`PredictorParams`](crate::config::PredictorParams) bundle and must be
/// deterministic for fixed inputs. Failures, including resource exhaustion,
/// are reported as [`CoreError::PredictionFailure`](crate::CoreError::PredictionFailure).
pub trait GaussianPredictor {
    /// Square edge length of the images `predict` expects.
    fn processing_resolution(&self) -> u32;

    /// Predicts Gaussians for `image` (already resized to the processing
    /// resolution). `disparity_factor` is focal length over native width.
    fn predict(&self, image: &ImageTensor, disparity_factor: f64) -> CoreResult<GaussianSetNdc>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "predictor"
    }
}

impl<P: GaussianPredictor + ?Sized> GaussianPredictor for Box<P> {
    fn processing_resolution(&self) -> u32 {
        (**self).processing_resolution()
    }

    fn predict(&self, image: &ImageTensor, disparity_factor: f64) -> CoreResult<GaussianSetNdc> {
        (**self).predict(image, disparity_factor)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
