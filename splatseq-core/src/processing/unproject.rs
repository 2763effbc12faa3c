//! Unprojection of predictor output from NDC into camera space.

use crate::error::{CoreError, CoreResult};
use crate::gaussians::{Gaussian, GaussianSet3D, GaussianSetNdc};
use nalgebra::{Matrix3, Matrix4, Rotation3, SymmetricEigen, UnitQuaternion, Vector3};

/// Smallest eigenvalue kept when re-factorizing a covariance.
const MIN_VARIANCE: f64 = 1e-20;

/// Maps pixel coordinates of a `width x height` image to [-1, 1].
pub fn ndc_matrix(width: u32, height: u32) -> Matrix4<f64> {
    Matrix4::new(
        2.0 / f64::from(width), 0.0, -1.0, 0.0, //
        0.0, 2.0 / f64::from(height), -1.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Moves NDC Gaussians into the camera frame.
///
/// The unprojection matrix is `inverse(NDC(shape) · intrinsics · extrinsics)`.
/// Means are transformed affinely by its top 3x4 block and covariances as
/// `A Σ Aᵀ`, then re-factorized into scale and rotation. The number of
/// Gaussians never changes.
pub fn unproject_gaussians(
    gaussians: GaussianSetNdc,
    extrinsics: &Matrix4<f64>,
    intrinsics: &Matrix4<f64>,
    image_shape: (u32, u32),
) -> CoreResult<GaussianSet3D> {
    let (width, height) = image_shape;
    let forward = ndc_matrix(width, height) * intrinsics * extrinsics;
    let unprojection = forward.try_inverse().ok_or_else(|| {
        CoreError::OperationFailed(format!(
            "Projection matrix for {width}x{height} is not invertible"
        ))
    })?;

    let linear: Matrix3<f64> = unprojection.fixed_view::<3, 3>(0, 0).into_owned();
    let translation: Vector3<f64> = unprojection.fixed_view::<3, 1>(0, 3).into_owned();

    let mut set = gaussians;
    for gaussian in &mut set.gaussians {
        transform_gaussian(gaussian, &linear, &translation);
    }
    Ok(set.into_space())
}

fn transform_gaussian(gaussian: &mut Gaussian, linear: &Matrix3<f64>, translation: &Vector3<f64>) {
    let mean = linear * gaussian.mean.cast::<f64>() + translation;
    let covariance = linear * gaussian.covariance() * linear.transpose();
    let (scale, rotation) = decompose_covariance(&covariance);

    gaussian.mean = mean.cast::<f32>();
    gaussian.scale = scale.cast::<f32>();
    gaussian.rotation = rotation.cast::<f32>();
}

/// Splits a symmetric covariance into per-axis standard deviations and a
/// proper rotation (determinant +1).
pub fn decompose_covariance(covariance: &Matrix3<f64>) -> (Vector3<f64>, UnitQuaternion<f64>) {
    let symmetric = (covariance + covariance.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(symmetric);

    let scale = eigen.eigenvalues.map(|v| v.max(MIN_VARIANCE).sqrt());
    let mut axes = eigen.eigenvectors;
    if axes.determinant() < 0.0 {
        let flipped: Vector3<f64> = -axes.column(2).into_owned();
        axes.set_column(2, &flipped);
    }

    let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(axes));
    (scale, rotation)
}
