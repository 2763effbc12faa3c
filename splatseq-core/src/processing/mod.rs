//! Frame-to-Gaussian projection.
//!
//! This module turns one decoded frame plus a focal length into a
//! [`GaussianSet3D`](crate::gaussians::GaussianSet3D): normalization, the
//! aligned-corner resize to the predictor's working resolution, intrinsics
//! scaling, the predictor call and unprojection back to camera space.

/// Focal length estimation from an assumed field of view
pub mod focal;

/// Normalized image tensors and bilinear resampling
pub mod tensor;

/// Pinhole intrinsics in homogeneous 4x4 form
pub mod intrinsics;

/// NDC-to-camera unprojection of Gaussian sets
pub mod unproject;

/// The per-frame projection pipeline
pub mod pipeline;

pub use focal::estimate_focal_length;
pub use tensor::ImageTensor;
pub use intrinsics::CameraIntrinsics;
pub use pipeline::{ProjectedFrame, project_frame};
pub use unproject::unproject_gaussians;
