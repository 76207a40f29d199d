use ndarray::ArrayView1;
use serde::Serialize;

use super::BoundingBox;
use crate::error::{Error, Result};

/// Regression-predicted correction, in fractions of box width and height.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Offset {
    pub tx1: f32,
    pub ty1: f32,
    pub tx2: f32,
    pub ty2: f32,
}

impl Offset {
    pub fn new(tx1: f32, ty1: f32, tx2: f32, ty2: f32) -> Self {
        Self { tx1, ty1, tx2, ty2 }
    }

    pub(crate) fn from_row(row: ArrayView1<'_, f32>) -> Result<Self> {
        if row.len() != 4 {
            return Err(Error::ShapeMismatch { what: "offset vector", expected: vec![4], actual: vec![row.len()] });
        }
        Ok(Self::new(row[0], row[1], row[2], row[3]))
    }
}

impl BoundingBox {
    /// Applies a predicted offset. The result is not clipped and its corners
    /// are not reordered.
    pub fn calibrate(&self, offset: &Offset) -> BoundingBox {
        let w = self.width();
        let h = self.height();
        BoundingBox {
            x1: self.x1 + offset.tx1 * w,
            y1: self.y1 + offset.ty1 * h,
            x2: self.x2 + offset.tx2 * w,
            y2: self.y2 + offset.ty2 * h,
        }
    }

    /// Smallest square around the same center whose side is the longer edge,
    /// snapped to whole pixels.
    pub fn to_square(&self) -> BoundingBox {
        let w = self.width();
        let h = self.height();
        let side = w.max(h);
        let x1 = self.x1 + w * 0.5 - side * 0.5;
        let y1 = self.y1 + h * 0.5 - side * 0.5;
        BoundingBox {
            x1: x1.round_ties_even(),
            y1: y1.round_ties_even(),
            x2: (x1 + side - 1.0).round_ties_even(),
            y2: (y1 + side - 1.0).round_ties_even(),
        }
    }

    /// Clamps x to `[0, width]` and y to `[0, height]`.
    pub fn clip(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f32, height as f32);
        BoundingBox {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }
}
