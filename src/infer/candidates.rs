use super::{non_max_suppression, BoundingBox, Offset};
use crate::error::{Error, Result};

/// Index-aligned boxes, scores and offsets handed from one stage to the next.
///
/// Stages consume a set and build a fresh one; nothing mutates a set that
/// another stage still holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    boxes: Vec<BoundingBox>,
    scores: Vec<f32>,
    offsets: Vec<Offset>,
}

impl CandidateSet {
    pub fn new(boxes: Vec<BoundingBox>, scores: Vec<f32>, offsets: Vec<Offset>) -> Result<Self> {
        if boxes.len() != scores.len() || boxes.len() != offsets.len() {
            return Err(Error::LengthMismatch { boxes: boxes.len(), scores: scores.len(), offsets: offsets.len() });
        }
        Ok(Self { boxes, scores, offsets })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn offsets(&self) -> &[Offset] {
        &self.offsets
    }

    pub fn into_boxes(self) -> Vec<BoundingBox> {
        self.boxes
    }

    pub(crate) fn push(&mut self, bbox: BoundingBox, score: f32, offset: Offset) {
        self.boxes.push(bbox);
        self.scores.push(score);
        self.offsets.push(offset);
    }

    /// Concatenates sets in iteration order.
    pub fn concat(sets: impl IntoIterator<Item = CandidateSet>) -> Self {
        let mut out = Self::empty();
        for set in sets {
            out.boxes.extend(set.boxes);
            out.scores.extend(set.scores);
            out.offsets.extend(set.offsets);
        }
        out
    }

    /// Gathers the candidates at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            boxes: indices.iter().map(|&i| self.boxes[i]).collect(),
            scores: indices.iter().map(|&i| self.scores[i]).collect(),
            offsets: indices.iter().map(|&i| self.offsets[i]).collect(),
        }
    }

    /// Indices whose score is strictly above `threshold`.
    pub fn indices_above(&self, threshold: f32) -> Vec<usize> {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > threshold)
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices surviving greedy NMS, best score first.
    pub fn suppression_keep(&self, iou_threshold: f32) -> Result<Vec<usize>> {
        non_max_suppression(&self.boxes, &self.scores, iou_threshold)
    }

    pub fn suppress(self, iou_threshold: f32) -> Result<Self> {
        let keep = self.suppression_keep(iou_threshold)?;
        Ok(self.select(&keep))
    }

    /// Moves every box by its own offset.
    pub fn calibrated(self) -> Self {
        let boxes = self.boxes.iter().zip(&self.offsets).map(|(b, o)| b.calibrate(o)).collect();
        Self { boxes, ..self }
    }

    pub fn squared(self) -> Self {
        let boxes = self.boxes.iter().map(BoundingBox::to_square).collect();
        Self { boxes, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(f32, f32, f32, f32, f32)]) -> CandidateSet {
        let boxes = entries.iter().map(|e| BoundingBox::new(e.0, e.1, e.2, e.3)).collect();
        let scores = entries.iter().map(|e| e.4).collect();
        let offsets = entries.iter().enumerate().map(|(i, _)| Offset::new(i as f32, 0.0, 0.0, 0.0)).collect();
        CandidateSet::new(boxes, scores, offsets).unwrap()
    }

    #[test]
    fn new_rejects_unequal_lengths() {
        let err = CandidateSet::new(vec![BoundingBox::default()], vec![], vec![Offset::default()]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { boxes: 1, scores: 0, offsets: 1 }));
    }

    #[test]
    fn suppress_gathers_offsets_by_original_index() {
        let s = set(&[
            (0.0, 0.0, 10.0, 10.0, 0.3),
            (100.0, 100.0, 110.0, 110.0, 0.9),
            (1.0, 1.0, 11.0, 11.0, 0.8),
        ]);
        let kept = s.suppress(0.5).unwrap();
        assert_eq!(kept.scores(), &[0.9, 0.8]);
        assert_eq!(kept.offsets()[0].tx1, 1.0);
        assert_eq!(kept.offsets()[1].tx1, 2.0);
        assert_eq!(kept.boxes()[1], BoundingBox::new(1.0, 1.0, 11.0, 11.0));
    }

    #[test]
    fn concat_preserves_order() {
        let a = set(&[(0.0, 0.0, 1.0, 1.0, 0.1)]);
        let b = set(&[(2.0, 2.0, 3.0, 3.0, 0.2), (4.0, 4.0, 5.0, 5.0, 0.3)]);
        let all = CandidateSet::concat([a, CandidateSet::empty(), b]);
        assert_eq!(all.scores(), &[0.1, 0.2, 0.3]);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn indices_above_is_strict() {
        let s = set(&[(0.0, 0.0, 1.0, 1.0, 0.7), (0.0, 0.0, 1.0, 1.0, 0.71), (0.0, 0.0, 1.0, 1.0, 0.2)]);
        assert_eq!(s.indices_above(0.7), vec![1]);
    }

    #[test]
    fn empty_set_passes_through_every_operation() {
        let s = CandidateSet::empty().suppress(0.7).unwrap().calibrated().squared();
        assert!(s.is_empty());
        assert!(s.indices_above(0.0).is_empty());
    }
}
