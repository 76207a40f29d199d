//! Detection core: box geometry, candidate bookkeeping, suppression and the
//! three-stage cascade that ties them together.

pub mod candidates;
pub mod cascade;
pub mod decode;
pub mod geometry;
pub mod network;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod patch;
pub mod pyramid;

use serde::Serialize;

use crate::error::{Error, Result};

pub use candidates::CandidateSet;
pub use cascade::{Face, FaceCascade};
pub use geometry::Offset;
pub use network::{OutputNet, OutputPrediction, ProposalMap, ProposalNet, RefineNet, RefinePrediction};

/// Axis-aligned box in original-image pixels.
///
/// Extents follow the inclusive-pixel convention: a box spanning
/// `x1..=x2` is `x2 - x1 + 1` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1 + 1.0
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1 + 1.0
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }
}

pub fn intersection_over_union(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);
    let w = (x2 - x1 + 1.0).max(0.0);
    let h = (y2 - y1 + 1.0).max(0.0);
    let inter = w * h;
    if inter <= 0.0 { return 0.0; }
    let union = a.area() + b.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Greedy non-max suppression.
///
/// Returns the indices of the kept boxes in descending score order. Equal
/// scores keep their input order, so callers that concatenate candidates
/// deterministically get deterministic suppression. A candidate is dropped
/// when its IoU with an already kept box is strictly greater than
/// `iou_threshold`.
pub fn non_max_suppression(boxes: &[BoundingBox], scores: &[f32], iou_threshold: f32) -> Result<Vec<usize>> {
    if boxes.len() != scores.len() {
        return Err(Error::ShapeMismatch { what: "nms scores", expected: vec![boxes.len()], actual: vec![scores.len()] });
    }
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut suppressed = vec![false; boxes.len()];
    let mut keep: Vec<usize> = Vec::new();
    for (pos, &current) in order.iter().enumerate() {
        if suppressed[current] { continue; }
        keep.push(current);
        for &other in &order[pos + 1..] {
            if !suppressed[other] && intersection_over_union(&boxes[current], &boxes[other]) > iou_threshold {
                suppressed[other] = true;
            }
        }
    }
    Ok(keep)
}
