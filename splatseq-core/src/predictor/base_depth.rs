use super::GaussianPredictor;
use crate::config::{ColorSpace, PredictorParams};
use crate::error::{CoreError, CoreResult};
use crate::gaussians::{Gaussian, GaussianSetNdc, srgb_to_linear};
use crate::processing::ImageTensor;
use log::debug;
use nalgebra::{UnitQuaternion, Vector3};

/// Places one Gaussian per `stride x stride` pixel block on a fronto-parallel
/// plane at `initializer_base_depth / initializer_disparity_factor`.
///
/// Colors are the block means, footprints cover the block (times
/// `initializer_scale_factor`) and opacity is `1 - low_pass_filter_eps`.
/// Output count is `(P / stride)²` for processing resolution `P`.
#[derive(Debug, Clone)]
pub struct BaseDepthPredictor {
    params: PredictorParams,
}

impl BaseDepthPredictor {
    pub fn new(params: PredictorParams) -> CoreResult<Self> {
        if params.initializer_stride == 0 {
            return Err(CoreError::Settings(
                "initializer_stride must be at least 1".to_string(),
            ));
        }
        if params.processing_resolution < params.initializer_stride {
            return Err(CoreError::Settings(format!(
                "processing resolution {} is smaller than the stride {}",
                params.processing_resolution, params.initializer_stride
            )));
        }
        if !(params.initializer_base_depth > 0.0) || !(params.initializer_disparity_factor > 0.0) {
            return Err(CoreError::Settings(
                "initializer_base_depth and initializer_disparity_factor must be positive"
                    .to_string(),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &PredictorParams {
        &self.params
    }

    fn depth(&self) -> f64 {
        self.params.initializer_base_depth / self.params.initializer_disparity_factor
    }
}

impl GaussianPredictor for BaseDepthPredictor {
    fn processing_resolution(&self) -> u32 {
        self.params.processing_resolution
    }

    fn predict(&self, image: &ImageTensor, disparity_factor: f64) -> CoreResult<GaussianSetNdc> {
        let size = self.params.processing_resolution;
        if image.width() != size || image.height() != size {
            return Err(CoreError::PredictionFailure(format!(
                "expected a {size}x{size} image, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        if !disparity_factor.is_finite() || disparity_factor <= 0.0 {
            return Err(CoreError::PredictionFailure(format!(
                "disparity factor must be positive, got {disparity_factor}"
            )));
        }

        let stride = self.params.initializer_stride;
        let cells = size / stride;
        let z = self.depth();
        let p = f64::from(size);

        let footprint = f64::from(stride) * z / p * self.params.initializer_scale_factor;
        let sigma = footprint
            .max(self.params.min_scale.max(1e-6))
            .min(self.params.max_scale) as f32;
        let opacity = (1.0 - self.params.low_pass_filter_eps).clamp(0.0, 1.0) as f32;
        let to_output_space = |v: f32| match self.params.color_space {
            ColorSpace::LinearRgb => srgb_to_linear(v),
            ColorSpace::Srgb => v,
        };

        debug!(
            "{} predicting {}x{} Gaussians at depth {:.3} (disparity factor {:.4})",
            self.name(),
            cells,
            cells,
            z,
            disparity_factor
        );

        let mut gaussians = Vec::with_capacity(cells as usize * cells as usize);
        for cy in 0..cells {
            for cx in 0..cells {
                let mut color = [0.0f32; 3];
                for (channel, value) in color.iter_mut().enumerate() {
                    let mut sum = 0.0f32;
                    for y in cy * stride..(cy + 1) * stride {
                        for x in cx * stride..(cx + 1) * stride {
                            sum += image.get(channel, x, y);
                        }
                    }
                    *value = to_output_space(sum / (stride * stride) as f32);
                }

                // Block center in pixel coordinates.
                let u = (f64::from(cx) + 0.5) * f64::from(stride);
                let v = (f64::from(cy) + 0.5) * f64::from(stride);
                gaussians.push(Gaussian {
                    mean: Vector3::new(
                        ((2.0 * u / p - 1.0) * z) as f32,
                        ((2.0 * v / p - 1.0) * z) as f32,
                        z as f32,
                    ),
                    color: Vector3::from(color),
                    opacity,
                    scale: Vector3::new(sigma, sigma, sigma),
                    rotation: UnitQuaternion::identity(),
                });
            }
        }

        Ok(GaussianSetNdc::new(gaussians, self.params.color_space))
    }

    fn name(&self) -> &str {
        "base-depth"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    fn params(resolution: u32, stride: u32) -> PredictorParams {
        PredictorParams {
            processing_resolution: resolution,
            initializer_stride: stride,
            color_space: ColorSpace::Srgb,
            ..Settings::default().predictor_params()
        }
    }

    fn flat_image(size: u32, value: f32) -> ImageTensor {
        ImageTensor::from_planes(size, size, vec![value; (size * size * 3) as usize]).unwrap()
    }

    #[test]
    fn emits_one_gaussian_per_block() {
        let predictor = BaseDepthPredictor::new(params(8, 2)).unwrap();
        let out = predictor.predict(&flat_image(8, 0.25), 0.9).unwrap();
        assert_eq!(out.len(), 16);
        for g in out.iter() {
            assert_eq!(g.mean.z, 10.0);
            assert_eq!(g.color, Vector3::new(0.25, 0.25, 0.25));
            assert!(g.opacity > 0.99 && g.opacity <= 1.0);
        }
    }

    #[test]
    fn block_centers_are_symmetric_about_the_axis() {
        let predictor = BaseDepthPredictor::new(params(8, 2)).unwrap();
        let out = predictor.predict(&flat_image(8, 0.5), 1.0).unwrap();
        let n = out.len() as f32;
        let mean_x: f32 = out.iter().map(|g| g.mean.x).sum::<f32>() / n;
        let mean_y: f32 = out.iter().map(|g| g.mean.y).sum::<f32>() / n;
        assert!(mean_x.abs() < 1e-5, "mean x {mean_x}");
        assert!(mean_y.abs() < 1e-5, "mean y {mean_y}");
        // First block center u = 1 on P = 8: (2 * 1 / 8 - 1) * 10
        assert!((out.gaussians[0].mean.x + 7.5).abs() < 1e-5);
    }

    #[test]
    fn is_deterministic() {
        let predictor = BaseDepthPredictor::new(params(8, 4)).unwrap();
        let image = flat_image(8, 0.5);
        assert_eq!(
            predictor.predict(&image, 1.2).unwrap(),
            predictor.predict(&image, 1.2).unwrap()
        );
    }

    #[test]
    fn rejects_wrong_resolution() {
        let predictor = BaseDepthPredictor::new(params(8, 2)).unwrap();
        assert!(matches!(
            predictor.predict(&flat_image(4, 0.5), 1.0),
            Err(CoreError::PredictionFailure(_))
        ));
    }

    #[test]
    fn rejects_zero_stride() {
        assert!(BaseDepthPredictor::new(params(8, 0)).is_err());
    }
}
