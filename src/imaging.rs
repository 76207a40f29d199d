//! Conversions from decoded images to the float tensors the cascade consumes,
//! and the bilinear resampler shared by the pyramid and the patch extractor.

use image::RgbImage;
use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};

/// Per-channel normalization applied as `(v / 255 - mean) / std`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for Normalization {
    fn default() -> Self {
        Self { mean: [0.5, 0.5, 0.5], std: [0.5, 0.5, 0.5] }
    }
}

/// RGB (HWC, u8) to a normalized `3 x H x W` tensor.
pub fn to_tensor(rgb: &RgbImage, norm: &Normalization) -> Array3<f32> {
    let (w, h) = rgb.dimensions();
    let (w, h) = (w as usize, h as usize);
    let mut out = Array3::<f32>::zeros((3, h, w));
    for (x, y, p) in rgb.enumerate_pixels() {
        for c in 0..3 {
            out[[c, y as usize, x as usize]] = (p[c] as f32 / 255.0 - norm.mean[c]) / norm.std[c];
        }
    }
    out
}

/// Pyramid level size for `scale`, rounded up in f64.
pub fn scaled_size(height: usize, width: usize, scale: f64) -> (usize, usize) {
    ((height as f64 * scale).ceil() as usize, (width as f64 * scale).ceil() as usize)
}

/// Bilinear resampling of a `C x H x W` tensor with half-pixel centers and
/// edge clamping (no corner alignment, no antialiasing).
pub fn resize_bilinear(src: ArrayView3<'_, f32>, out_h: usize, out_w: usize) -> Array3<f32> {
    let (channels, in_h, in_w) = src.dim();
    let mut out = Array3::<f32>::zeros((channels, out_h, out_w));
    if in_h == 0 || in_w == 0 {
        return out;
    }
    let ys = sample_positions(in_h, out_h);
    let xs = sample_positions(in_w, out_w);
    for c in 0..channels {
        for (oy, &(y0, y1, ly)) in ys.iter().enumerate() {
            for (ox, &(x0, x1, lx)) in xs.iter().enumerate() {
                let top = src[[c, y0, x0]] * (1.0 - lx) + src[[c, y0, x1]] * lx;
                let bottom = src[[c, y1, x0]] * (1.0 - lx) + src[[c, y1, x1]] * lx;
                out[[c, oy, ox]] = top * (1.0 - ly) + bottom * ly;
            }
        }
    }
    out
}

// (low index, high index, weight of high index) per output position
fn sample_positions(input: usize, output: usize) -> Vec<(usize, usize, f32)> {
    let ratio = input as f32 / output as f32;
    (0..output)
        .map(|o| {
            let src = ((o as f32 + 0.5) * ratio - 0.5).max(0.0);
            let i0 = (src.floor() as usize).min(input - 1);
            let i1 = (i0 + 1).min(input - 1);
            (i0, i1, src - i0 as f32)
        })
        .collect()
}
