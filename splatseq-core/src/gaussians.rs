//! Gaussian splat primitives and sets.
//!
//! A set is tagged with the coordinate space its means and covariances live
//! in. Predictors emit [`GaussianSetNdc`]; unprojection turns it into a
//! [`GaussianSet3D`], which is what gets exported.

use crate::config::ColorSpace;
use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use std::marker::PhantomData;

/// One 3D Gaussian with activated attributes.
///
/// Covariance is stored factorized: Σ = R · diag(scale²) · Rᵀ.
#[derive(Clone, Debug, PartialEq)]
pub struct Gaussian {
    pub mean: Vector3<f32>,
    /// Linear or sRGB color, see [`GaussianSet::color_space`].
    pub color: Vector3<f32>,
    /// Opacity in [0, 1].
    pub opacity: f32,
    /// Positive standard deviations along the local axes.
    pub scale: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Gaussian {
    /// Covariance matrix Σ = R · S² · Rᵀ in double precision.
    pub fn covariance(&self) -> Matrix3<f64> {
        let rotation = self.rotation.cast::<f64>().to_rotation_matrix().into_inner();
        let s = self.scale.cast::<f64>();
        let s_squared = Matrix3::from_diagonal(&s.component_mul(&s));
        rotation * s_squared * rotation.transpose()
    }
}

/// Normalized device coordinates of the predictor at its processing resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ndc;

/// Metric camera frame at native resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraSpace;

/// A batch of Gaussians in the coordinate space `S`.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianSet<S> {
    pub gaussians: Vec<Gaussian>,
    pub color_space: ColorSpace,
    space: PhantomData<S>,
}

/// Raw predictor output.
pub type GaussianSetNdc = GaussianSet<Ndc>;

/// Unprojected, exportable Gaussians.
pub type GaussianSet3D = GaussianSet<CameraSpace>;

impl<S> GaussianSet<S> {
    pub fn new(gaussians: Vec<Gaussian>, color_space: ColorSpace) -> Self {
        Self {
            gaussians,
            color_space,
            space: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.gaussians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaussians.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Gaussian> {
        self.gaussians.iter()
    }

    /// Re-tags the set after its contents were moved into another space.
    pub(crate) fn into_space<T>(self) -> GaussianSet<T> {
        GaussianSet {
            gaussians: self.gaussians,
            color_space: self.color_space,
            space: PhantomData,
        }
    }
}

impl GaussianSet3D {
    /// Quantiles of inverse depth (disparity) over all Gaussians in front of the camera.
    ///
    /// Returns `[0.0, 0.0]` when no Gaussian has positive depth.
    pub fn disparity_quantiles(&self, low: f64, high: f64) -> [f32; 2] {
        let mut disparities: Vec<f64> = self
            .gaussians
            .iter()
            .map(|g| f64::from(g.mean.z))
            .filter(|z| z.is_finite() && *z > 0.0)
            .map(|z| 1.0 / z)
            .collect();
        if disparities.is_empty() {
            return [0.0, 0.0];
        }
        disparities.sort_by(|a, b| a.total_cmp(b));
        [
            quantile(&disparities, low) as f32,
            quantile(&disparities, high) as f32,
        ]
    }
}

/// Linear-interpolated quantile of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Converts one linear-light channel value to sRGB.
pub fn linear_to_srgb(value: f32) -> f32 {
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

/// Converts one sRGB-encoded channel value to linear light.
pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.040_45 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at_depth(z: f32) -> Gaussian {
        Gaussian {
            mean: Vector3::new(0.0, 0.0, z),
            color: Vector3::new(0.5, 0.5, 0.5),
            opacity: 0.5,
            scale: Vector3::new(1.0, 2.0, 3.0),
            rotation: UnitQuaternion::identity(),
        }
    }

    #[test]
    fn covariance_of_axis_aligned_gaussian_is_diagonal() {
        let cov = at_depth(1.0).covariance();
        assert_relative_eq!(cov[(0, 0)], 1.0, epsilon = 1e-9);
        assert_relative_eq!(cov[(1, 1)], 4.0, epsilon = 1e-9);
        assert_relative_eq!(cov[(2, 2)], 9.0, epsilon = 1e-9);
        assert_relative_eq!(cov[(0, 1)], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn disparity_quantiles_interpolate() {
        let set = GaussianSet3D::new(
            vec![at_depth(1.0), at_depth(2.0), at_depth(4.0), at_depth(-1.0)],
            ColorSpace::LinearRgb,
        );
        // disparities sorted: 0.25, 0.5, 1.0
        let [low, high] = set.disparity_quantiles(0.0, 0.5);
        assert_relative_eq!(low, 0.25);
        assert_relative_eq!(high, 0.5);
    }

    #[test]
    fn disparity_quantiles_of_empty_set() {
        let set = GaussianSet3D::new(Vec::new(), ColorSpace::Srgb);
        assert_eq!(set.disparity_quantiles(0.1, 0.9), [0.0, 0.0]);
    }

    #[test]
    fn srgb_transfer_endpoints() {
        assert_relative_eq!(linear_to_srgb(0.0), 0.0);
        assert_relative_eq!(linear_to_srgb(1.0), 1.0, epsilon = 1e-6);
        assert!(linear_to_srgb(0.2) > 0.2);
    }

    #[test]
    fn srgb_round_trip() {
        for v in [0.0f32, 0.002, 0.04, 0.2, 0.5, 0.9, 1.0] {
            assert_relative_eq!(linear_to_srgb(srgb_to_linear(v)), v, epsilon = 1e-5);
        }
    }
}
