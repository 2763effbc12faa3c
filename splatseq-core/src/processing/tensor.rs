//! Normalized image tensors and bilinear resampling.

use image::RgbImage;
use rayon::prelude::*;

/// A 3-channel float image in planar (CHW) layout with values in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTensor {
    width: u32,
    height: u32,
    /// Three planes of `width * height` samples, R then G then B.
    data: Vec<f32>,
}

impl ImageTensor {
    /// Converts 8-bit RGB pixels to [0, 1] floats.
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let plane = width as usize * height as usize;
        let mut data = vec![0.0f32; plane * 3];
        for (i, pixel) in image.pixels().enumerate() {
            data[i] = f32::from(pixel[0]) / 255.0;
            data[plane + i] = f32::from(pixel[1]) / 255.0;
            data[2 * plane + i] = f32::from(pixel[2]) / 255.0;
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wraps planar data. Returns `None` when the length does not match the shape.
    pub fn from_planes(width: u32, height: u32, data: Vec<f32>) -> Option<Self> {
        (data.len() == width as usize * height as usize * 3).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples of one channel (0 = R, 1 = G, 2 = B) in row-major order.
    pub fn plane(&self, channel: usize) -> &[f32] {
        let plane = self.width as usize * self.height as usize;
        &self.data[channel * plane..(channel + 1) * plane]
    }

    /// Value at (`channel`, `x`, `y`).
    pub fn get(&self, channel: usize, x: u32, y: u32) -> f32 {
        self.plane(channel)[y as usize * self.width as usize + x as usize]
    }

    /// Bilinear resize with aligned corners.
    ///
    /// Output corner samples coincide with input corner samples; interior
    /// positions map linearly with scale `(in - 1) / (out - 1)` per axis.
    pub fn resize_bilinear_aligned(&self, width: u32, height: u32) -> ImageTensor {
        let out_plane = width as usize * height as usize;
        let mut data = vec![0.0f32; out_plane * 3];
        if out_plane == 0 || self.width == 0 || self.height == 0 {
            return ImageTensor {
                width,
                height,
                data,
            };
        }

        let scale_x = aligned_scale(self.width, width);
        let scale_y = aligned_scale(self.height, height);
        let src_w = self.width as usize;
        let max_x = self.width - 1;
        let max_y = self.height - 1;

        // One chunk per output row across all three planes.
        data.par_chunks_mut(width as usize)
            .enumerate()
            .for_each(|(row_index, row)| {
                let channel = row_index / height as usize;
                let y = (row_index % height as usize) as f32;
                let src = self.plane(channel);

                let fy = y * scale_y;
                let y0 = (fy.floor() as u32).min(max_y);
                let y1 = (y0 + 1).min(max_y);
                let dy = fy - y0 as f32;

                for (x, out) in row.iter_mut().enumerate() {
                    let fx = x as f32 * scale_x;
                    let x0 = (fx.floor() as u32).min(max_x);
                    let x1 = (x0 + 1).min(max_x);
                    let dx = fx - x0 as f32;

                    let v00 = src[y0 as usize * src_w + x0 as usize];
                    let v10 = src[y0 as usize * src_w + x1 as usize];
                    let v01 = src[y1 as usize * src_w + x0 as usize];
                    let v11 = src[y1 as usize * src_w + x1 as usize];

                    let top = v00 * (1.0 - dx) + v10 * dx;
                    let bottom = v01 * (1.0 - dx) + v11 * dx;
                    *out = top * (1.0 - dy) + bottom * dy;
                }
            });

        ImageTensor {
            width,
            height,
            data,
        }
    }
}

fn aligned_scale(input: u32, output: u32) -> f32 {
    if output > 1 {
        (input - 1) as f32 / (output - 1) as f32
    } else {
        0.0
    }
}
