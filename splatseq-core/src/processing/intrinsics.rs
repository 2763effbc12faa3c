//! Pinhole camera intrinsics.

use crate::error::{CoreError, CoreResult};
use nalgebra::{Matrix3, Matrix4};

/// Pinhole camera with square pixels and the principal point at the image center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsics {
    pub focal_length_px: f64,
    pub width: u32,
    pub height: u32,
}

impl CameraIntrinsics {
    /// Fails with `InvalidFocalLength` unless the focal length is positive and finite.
    pub fn new(focal_length_px: f64, width: u32, height: u32) -> CoreResult<Self> {
        if !focal_length_px.is_finite() || focal_length_px <= 0.0 {
            return Err(CoreError::InvalidFocalLength(focal_length_px));
        }
        Ok(Self {
            focal_length_px,
            width,
            height,
        })
    }

    pub fn principal_point(&self) -> (f64, f64) {
        (f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    /// Homogeneous 4x4 form:
    ///
    /// ```text
    /// [ f 0 cx 0 ]
    /// [ 0 f cy 0 ]
    /// [ 0 0 1  0 ]
    /// [ 0 0 0  1 ]
    /// ```
    pub fn matrix(&self) -> Matrix4<f64> {
        let f = self.focal_length_px;
        let (cx, cy) = self.principal_point();
        Matrix4::new(
            f, 0.0, cx, 0.0, //
            0.0, f, cy, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        )
    }

    /// The same physical camera expressed at another resolution: row 0 scaled
    /// by `width / self.width`, row 1 by `height / self.height`.
    pub fn scaled_matrix(&self, width: u32, height: u32) -> Matrix4<f64> {
        let mut k = self.matrix();
        let sx = f64::from(width) / f64::from(self.width);
        let sy = f64::from(height) / f64::from(self.height);
        for col in 0..4 {
            k[(0, col)] *= sx;
            k[(1, col)] *= sy;
        }
        k
    }

    /// Upper-left 3x3 block, as stored in extended PLY files.
    pub fn matrix3(&self) -> Matrix3<f64> {
        self.matrix().fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// `focal / native width`, the scale-free hint passed to predictors.
    pub fn disparity_hint(&self) -> f64 {
        self.focal_length_px / f64::from(self.width)
    }
}
