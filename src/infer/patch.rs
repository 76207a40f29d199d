use ndarray::{s, Array4, ArrayView3};

use super::BoundingBox;
use crate::error::{Error, Result};
use crate::imaging::resize_bilinear;

pub const REFINE_PATCH_SIZE: usize = 24;
pub const OUTPUT_PATCH_SIZE: usize = 48;

/// Pixel rectangle `[y1, y2) x [x1, x2)` a box crops after clipping.
fn crop_bounds(bbox: &BoundingBox, width: usize, height: usize) -> (usize, usize, usize, usize) {
    let c = bbox.clip(width, height);
    (c.x1 as usize, c.y1 as usize, c.x2 as usize, c.y2 as usize)
}

/// Whether a box still covers at least one pixel once clipped to the image.
pub fn is_extractable(bbox: &BoundingBox, width: usize, height: usize) -> bool {
    let (x1, y1, x2, y2) = crop_bounds(bbox, width, height);
    x2 > x1 && y2 > y1
}

/// Crops every box from `image` (`C x H x W`) and resizes it to
/// `size x size`. The batch is index-aligned with `boxes`.
pub fn extract_patches(image: ArrayView3<'_, f32>, boxes: &[BoundingBox], size: usize) -> Result<Array4<f32>> {
    let (channels, height, width) = image.dim();
    let mut batch = Array4::<f32>::zeros((boxes.len(), channels, size, size));
    for (index, bbox) in boxes.iter().enumerate() {
        let (x1, y1, x2, y2) = crop_bounds(bbox, width, height);
        if x2 <= x1 || y2 <= y1 {
            return Err(Error::DegenerateBox { index });
        }
        let crop = image.slice(s![.., y1..y2, x1..x2]);
        batch.slice_mut(s![index, .., .., ..]).assign(&resize_bilinear(crop, size, size));
    }
    Ok(batch)
}
