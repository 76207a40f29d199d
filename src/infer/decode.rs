use super::{BoundingBox, CandidateSet, Offset, ProposalMap};
use crate::error::{Error, Result};

/// The proposal network behaves like a 12x12 window slid with stride 2.
const STRIDE: f32 = 2.0;
const CELL_SIZE: f32 = 12.0;

/// Turns one pyramid level's proposal grid into candidates in
/// original-image coordinates.
///
/// Cells are visited row-major; rows map to y and columns to x.
pub fn generate_candidates(map: &ProposalMap, scale: f32, threshold: f32) -> Result<CandidateSet> {
    let (rows, cols) = map.probs.dim();
    let (depth, orows, ocols) = map.offsets.dim();
    if (depth, orows, ocols) != (4, rows, cols) {
        return Err(Error::ShapeMismatch {
            what: "proposal offsets",
            expected: vec![4, rows, cols],
            actual: vec![depth, orows, ocols],
        });
    }

    let mut out = CandidateSet::empty();
    for ((row, col), &score) in map.probs.indexed_iter() {
        if !(score > threshold) { continue; }
        let x1 = STRIDE * col as f32 + 1.0;
        let y1 = STRIDE * row as f32 + 1.0;
        let bbox = BoundingBox {
            x1: x1 / scale,
            y1: y1 / scale,
            x2: (x1 + CELL_SIZE) / scale,
            y2: (y1 + CELL_SIZE) / scale,
        };
        let offset = Offset::new(
            map.offsets[[0, row, col]],
            map.offsets[[1, row, col]],
            map.offsets[[2, row, col]],
            map.offsets[[3, row, col]],
        );
        out.push(bbox, score, offset);
    }
    Ok(out)
}
