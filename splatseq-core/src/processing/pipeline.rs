//! The per-frame projection pipeline.

use super::intrinsics::CameraIntrinsics;
use super::tensor::ImageTensor;
use super::unproject::unproject_gaussians;
use crate::error::CoreResult;
use crate::gaussians::GaussianSet3D;
use crate::predictor::GaussianPredictor;
use image::RgbImage;
use log::debug;
use nalgebra::Matrix4;

/// Result of projecting one frame.
#[derive(Debug, Clone)]
pub struct ProjectedFrame {
    pub gaussians: GaussianSet3D,
    /// Native-resolution camera the Gaussians are expressed in.
    pub intrinsics: CameraIntrinsics,
    pub processing_resolution: u32,
}

/// Converts one RGB frame into camera-space Gaussians.
///
/// Steps, in order:
/// 1. normalize pixels to [0, 1];
/// 2. `disparity_hint = focal / native_width`;
/// 3. aligned-corner bilinear resize to the predictor's square resolution;
/// 4. native intrinsics with the principal point at the frame center;
/// 5. the same intrinsics scaled per row to the processing resolution;
/// 6. the predictor call;
/// 7. unprojection with identity extrinsics.
///
/// Predictor errors propagate unchanged. Gaussian counts and value ranges
/// are not checked.
pub fn project_frame<P>(
    frame: &RgbImage,
    focal_length_px: f64,
    predictor: &P,
) -> CoreResult<ProjectedFrame>
where
    P: GaussianPredictor + ?Sized,
{
    let (width, height) = frame.dimensions();
    let intrinsics = CameraIntrinsics::new(focal_length_px, width, height)?;
    let processing = predictor.processing_resolution();

    let normalized = ImageTensor::from_rgb(frame);
    let disparity_hint = intrinsics.disparity_hint();
    let resized = normalized.resize_bilinear_aligned(processing, processing);

    let k_processing = intrinsics.scaled_matrix(processing, processing);

    debug!(
        "Projecting {}x{} frame at {}x{} (f = {:.2}px, disparity hint {:.4})",
        width, height, processing, processing, focal_length_px, disparity_hint
    );
    let ndc = predictor.predict(&resized, disparity_hint)?;

    let gaussians = unproject_gaussians(
        ndc,
        &Matrix4::identity(),
        &k_processing,
        (processing, processing),
    )?;

    Ok(ProjectedFrame {
        gaussians,
        intrinsics,
        processing_resolution: processing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorSpace;
    use crate::error::CoreError;
    use crate::gaussians::{Gaussian, GaussianSetNdc};
    use approx::assert_relative_eq;
    use image::Rgb;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::cell::RefCell;

    /// Records its inputs and returns a single Gaussian at the image center.
    struct RecordingPredictor {
        resolution: u32,
        seen: RefCell<Vec<(u32, u32, f64, f32)>>,
    }

    impl GaussianPredictor for RecordingPredictor {
        fn processing_resolution(&self) -> u32 {
            self.resolution
        }

        fn predict(&self, image: &ImageTensor, disparity: f64) -> CoreResult<GaussianSetNdc> {
            self.seen
                .borrow_mut()
                .push((image.width(), image.height(), disparity, image.get(0, 0, 0)));
            // Pixel (P/2, P/2) at depth 2: ((2u/P - 1) z, (2v/P - 1) z, z).
            Ok(GaussianSetNdc::new(
                vec![Gaussian {
                    mean: Vector3::new(0.0, 0.0, 2.0),
                    color: Vector3::new(1.0, 0.0, 0.0),
                    opacity: 1.0,
                    scale: Vector3::new(0.01, 0.01, 0.01),
                    rotation: UnitQuaternion::identity(),
                }],
                ColorSpace::Srgb,
            ))
        }
    }

    struct FailingPredictor;

    impl GaussianPredictor for FailingPredictor {
        fn processing_resolution(&self) -> u32 {
            4
        }

        fn predict(&self, _: &ImageTensor, _: f64) -> CoreResult<GaussianSetNdc> {
            Err(CoreError::PredictionFailure("out of memory".into()))
        }
    }

    #[test]
    fn feeds_predictor_resized_image_and_hint() {
        let frame = RgbImage::from_pixel(40, 20, Rgb([255, 0, 0]));
        let predictor = RecordingPredictor {
            resolution: 16,
            seen: RefCell::new(Vec::new()),
        };
        let projected = project_frame(&frame, 80.0, &predictor).unwrap();

        let seen = predictor.seen.borrow();
        assert_eq!(seen.len(), 1);
        let (w, h, disparity, red) = seen[0];
        assert_eq!((w, h), (16, 16));
        assert_relative_eq!(disparity, 2.0);
        assert_relative_eq!(red, 1.0);
        assert_eq!(projected.processing_resolution, 16);
        assert_eq!(projected.intrinsics.width, 40);
    }

    #[test]
    fn center_gaussian_lands_on_optical_axis() {
        let frame = RgbImage::from_pixel(40, 20, Rgb([10, 20, 30]));
        let predictor = RecordingPredictor {
            resolution: 16,
            seen: RefCell::new(Vec::new()),
        };
        let projected = project_frame(&frame, 80.0, &predictor).unwrap();
        let mean = projected.gaussians.gaussians[0].mean;
        assert_relative_eq!(mean.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(mean.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(mean.z, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn prediction_failure_propagates() {
        let frame = RgbImage::new(8, 8);
        let err = project_frame(&frame, 10.0, &FailingPredictor).unwrap_err();
        assert!(matches!(err, CoreError::PredictionFailure(_)));
    }

    #[test]
    fn invalid_focal_length_is_rejected() {
        let frame = RgbImage::new(8, 8);
        let err = project_frame(&frame, 0.0, &FailingPredictor).unwrap_err();
        assert!(matches!(err, CoreError::InvalidFocalLength(_)));
    }
}
