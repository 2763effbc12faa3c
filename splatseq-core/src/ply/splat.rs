//! Extended splat PLY layout.
//!
//! ```text
//! element vertex N        x y z f_dc_0..2 opacity scale_0..2 rot_0..3   (float)
//! element extrinsic 16    identity 4x4, row-major                       (float)
//! element intrinsic 9     native 3x3 intrinsics, row-major              (float)
//! element image_size 2    width, height                                 (uint)
//! element frame 2         1, N                                          (int)
//! element disparity 2     10th and 90th percentile of 1/z               (float)
//! element color_space 1   0 = sRGB, 1 = linear RGB                      (uchar)
//! element version 3       1, 5, 0                                       (uchar)
//! ```

use super::{Element, PlyEncoding, PlyFile, Property, ScalarType, VERTEX_ELEMENT};
use crate::config::ColorSpace;
use crate::error::CoreResult;
use crate::gaussians::{GaussianSet3D, linear_to_srgb};
use crate::processing::CameraIntrinsics;
use nalgebra::Matrix4;
use std::path::Path;

/// Zeroth-order spherical harmonic basis constant.
pub const SH_C0: f32 = 0.282_094_79;

const FORMAT_VERSION: [u8; 3] = [1, 5, 0];

const VERTEX_PROPERTIES: [&str; 14] = [
    "x", "y", "z", "f_dc_0", "f_dc_1", "f_dc_2", "opacity", "scale_0", "scale_1", "scale_2",
    "rot_0", "rot_1", "rot_2", "rot_3",
];

const OPACITY_EPS: f32 = 1e-6;

fn logit(p: f32) -> f32 {
    let p = p.clamp(OPACITY_EPS, 1.0 - OPACITY_EPS);
    (p / (1.0 - p)).ln()
}

/// Single-property element whose property shares the element's name.
fn column(name: &str, ty: ScalarType, values: &[f64]) -> CoreResult<Element> {
    let mut element = Element::new(name, vec![Property::scalar(name, ty)]);
    for value in values {
        element.push_record(&[*value])?;
    }
    Ok(element)
}

/// Builds the extended file for one unprojected frame.
pub fn extended_ply(
    gaussians: &GaussianSet3D,
    intrinsics: &CameraIntrinsics,
    encoding: PlyEncoding,
) -> CoreResult<PlyFile> {
    let mut vertex = Element::new(
        VERTEX_ELEMENT,
        VERTEX_PROPERTIES
            .iter()
            .map(|name| Property::scalar(*name, ScalarType::Float))
            .collect(),
    );

    let to_srgb = |c: f32| match gaussians.color_space {
        ColorSpace::LinearRgb => linear_to_srgb(c),
        ColorSpace::Srgb => c,
    };
    for g in gaussians.iter() {
        let dc = g.color.map(|c| (to_srgb(c) - 0.5) / SH_C0);
        let q = g.rotation.quaternion();
        let record = [
            g.mean.x,
            g.mean.y,
            g.mean.z,
            dc.x,
            dc.y,
            dc.z,
            logit(g.opacity),
            g.scale.x.ln(),
            g.scale.y.ln(),
            g.scale.z.ln(),
            q.w,
            q.i,
            q.j,
            q.k,
        ]
        .map(f64::from);
        vertex.push_record(&record)?;
    }

    let extrinsic = Matrix4::<f64>::identity();
    let k = intrinsics.matrix3();
    // nalgebra iterates column-major; transpose to emit rows.
    let extrinsic_rows: Vec<f64> = extrinsic.transpose().iter().copied().collect();
    let intrinsic_rows: Vec<f64> = k.transpose().iter().copied().collect();
    let [d_low, d_high] = gaussians.disparity_quantiles(0.1, 0.9);

    let mut file = PlyFile::new(encoding);
    file.elements = vec![
        vertex,
        column("extrinsic", ScalarType::Float, &extrinsic_rows)?,
        column("intrinsic", ScalarType::Float, &intrinsic_rows)?,
        column(
            "image_size",
            ScalarType::UInt,
            &[f64::from(intrinsics.width), f64::from(intrinsics.height)],
        )?,
        column(
            "frame",
            ScalarType::Int,
            &[1.0, gaussians.len() as f64],
        )?,
        column(
            "disparity",
            ScalarType::Float,
            &[f64::from(d_low), f64::from(d_high)],
        )?,
        column(
            "color_space",
            ScalarType::UChar,
            &[f64::from(gaussians.color_space.ply_index())],
        )?,
        column(
            "version",
            ScalarType::UChar,
            &FORMAT_VERSION.map(f64::from),
        )?,
    ];
    Ok(file)
}

/// Builds and atomically writes the extended file. Returns the bytes written.
pub fn write_extended(
    gaussians: &GaussianSet3D,
    intrinsics: &CameraIntrinsics,
    encoding: PlyEncoding,
    path: &Path,
) -> CoreResult<u64> {
    extended_ply(gaussians, intrinsics, encoding)?.save(path)
}
