//! Focal length estimation.

use crate::config::DEFAULT_FOV_DEGREES;

/// Approximate focal length in pixels for a frame of the given width,
/// assuming a horizontal field of view of `fov_degrees`.
///
/// `f = (width / 2) / tan(fov / 2)`. The height does not enter the formula
/// but is part of the signature so callers can pass frame dimensions as-is.
#[must_use]
pub fn estimate_focal_length(width: u32, _height: u32, fov_degrees: f64) -> f64 {
    let half_fov = fov_degrees.to_radians() / 2.0;
    (f64::from(width) / 2.0) / half_fov.tan()
}

/// [`estimate_focal_length`] with the default 50 degree field of view.
#[must_use]
pub fn estimate_default_focal_length(width: u32, height: u32) -> f64 {
    estimate_focal_length(width, height, DEFAULT_FOV_DEGREES)
}
