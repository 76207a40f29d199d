use image::DynamicImage;
use ndarray::ArrayView3;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::decode::generate_candidates;
use super::network::{check_batch, offsets_from_rows};
use super::patch::{extract_patches, is_extractable, OUTPUT_PATCH_SIZE, REFINE_PATCH_SIZE};
use super::pyramid::compute_scales;
use super::{BoundingBox, CandidateSet, OutputNet, ProposalNet, RefineNet};
use crate::config::CascadeConfig;
use crate::error::{Error, Result};
use crate::imaging::{resize_bilinear, scaled_size, to_tensor, Normalization};

/// A final detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Face {
    pub bbox: BoundingBox,
    pub score: f32,
    /// Five `(x, y)` points in original-image pixels.
    pub landmarks: [[f32; 2]; 5],
}

/// Proposal → refine → output face detector.
pub struct FaceCascade {
    proposal: Box<dyn ProposalNet>,
    refine: Box<dyn RefineNet>,
    output: Box<dyn OutputNet>,
    config: CascadeConfig,
    normalization: Normalization,
}

impl FaceCascade {
    pub fn new(
        config: CascadeConfig,
        proposal: impl ProposalNet + 'static,
        refine: impl RefineNet + 'static,
        output: impl OutputNet + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            proposal: Box::new(proposal),
            refine: Box::new(refine),
            output: Box::new(output),
            config,
            normalization: Normalization::default(),
        })
    }

    /// Normalization used by [`FaceCascade::detect_image`].
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    /// Final calibrated boxes. They are not clipped; clip before cropping.
    pub fn detect(&self, image: ArrayView3<'_, f32>) -> Result<Vec<BoundingBox>> {
        Ok(self.detect_faces(image)?.into_iter().map(|f| f.bbox).collect())
    }

    /// Runs all three stages over a normalized `C x H x W` image.
    pub fn detect_faces(&self, image: ArrayView3<'_, f32>) -> Result<Vec<Face>> {
        let (_, height, width) = image.dim();
        if height == 0 || width == 0 {
            return Err(Error::InvalidImage { width, height });
        }
        let scales = compute_scales(height, width, self.config.min_face_size, self.config.factor)?;
        let proposals = self.run_proposal(image, &scales)?;
        let refined = self.run_refine(image, proposals)?;
        self.run_output(image, refined)
    }

    pub fn detect_image(&self, image: &DynamicImage) -> Result<Vec<Face>> {
        let tensor = to_tensor(&image.to_rgb8(), &self.normalization);
        self.detect_faces(tensor.view())
    }

    fn run_proposal(&self, image: ArrayView3<'_, f32>, scales: &[f64]) -> Result<CandidateSet> {
        let (_, height, width) = image.dim();
        let threshold = self.config.thresholds[0];
        let run_scale = |&scale: &f64| -> Result<CandidateSet> {
            let (sh, sw) = scaled_size(height, width, scale);
            let scaled = resize_bilinear(image, sh, sw);
            let map = self.proposal.infer(scaled.view())?;
            generate_candidates(&map, scale as f32, threshold)
        };

        // collected in scale order so NMS tie-breaks do not depend on scheduling
        #[cfg(feature = "rayon")]
        let per_scale: Vec<CandidateSet> = scales.par_iter().map(run_scale).collect::<Result<_>>()?;
        #[cfg(not(feature = "rayon"))]
        let per_scale: Vec<CandidateSet> = scales.iter().map(run_scale).collect::<Result<_>>()?;

        let candidates = CandidateSet::concat(per_scale);
        debug!("event" = "cascade.stage", stage = 1, scales = scales.len(), candidates = candidates.len());
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let kept = candidates.suppress(self.config.nms_thresholds[0])?;
        debug!("event" = "cascade.stage.nms", stage = 1, kept = kept.len());
        Ok(kept.calibrated().squared())
    }

    fn run_refine(&self, image: ArrayView3<'_, f32>, candidates: CandidateSet) -> Result<CandidateSet> {
        let candidates = drop_degenerate(candidates, image);
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let patches = extract_patches(image, candidates.boxes(), REFINE_PATCH_SIZE)?;
        let prediction = self.refine.infer(patches.view())?;
        check_batch("refine output", &prediction.probs, &prediction.offsets, candidates.len())?;

        let scored = CandidateSet::new(
            candidates.into_boxes(),
            prediction.probs.to_vec(),
            offsets_from_rows(&prediction.offsets)?,
        )?;
        let passing = scored.select(&scored.indices_above(self.config.thresholds[1]));
        debug!("event" = "cascade.stage", stage = 2, input = scored.len(), passing = passing.len());
        if passing.is_empty() {
            return Ok(passing);
        }
        Ok(passing.suppress(self.config.nms_thresholds[1])?.calibrated().squared())
    }

    fn run_output(&self, image: ArrayView3<'_, f32>, candidates: CandidateSet) -> Result<Vec<Face>> {
        let candidates = drop_degenerate(candidates, image);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let n = candidates.len();
        let patches = extract_patches(image, candidates.boxes(), OUTPUT_PATCH_SIZE)?;
        let prediction = self.output.infer(patches.view())?;
        check_batch("output", &prediction.probs, &prediction.offsets, n)?;
        if prediction.landmarks.dim() != (n, 10) {
            let (r, c) = prediction.landmarks.dim();
            return Err(Error::ShapeMismatch { what: "output landmarks", expected: vec![n, 10], actual: vec![r, c] });
        }

        // landmarks are relative to the box the output network looked at
        let landmarks: Vec<[[f32; 2]; 5]> = candidates
            .boxes()
            .iter()
            .zip(prediction.landmarks.rows())
            .map(|(b, row)| std::array::from_fn(|k| [b.x1 + b.width() * row[k], b.y1 + b.height() * row[k + 5]]))
            .collect();

        let scored = CandidateSet::new(
            candidates.into_boxes(),
            prediction.probs.to_vec(),
            offsets_from_rows(&prediction.offsets)?,
        )?;
        let passing_idx = scored.indices_above(self.config.thresholds[2]);
        debug!("event" = "cascade.stage", stage = 3, input = n, passing = passing_idx.len());
        if passing_idx.is_empty() {
            return Ok(Vec::new());
        }
        let landmarks: Vec<[[f32; 2]; 5]> = passing_idx.iter().map(|&i| landmarks[i]).collect();
        let calibrated = scored.select(&passing_idx).calibrated();
        let keep = calibrated.suppression_keep(self.config.nms_thresholds[2])?;

        Ok(keep
            .into_iter()
            .map(|i| Face { bbox: calibrated.boxes()[i], score: calibrated.scores()[i], landmarks: landmarks[i] })
            .collect())
    }
}

/// Drops candidates that would crop zero pixels once clipped.
fn drop_degenerate(candidates: CandidateSet, image: ArrayView3<'_, f32>) -> CandidateSet {
    let (_, height, width) = image.dim();
    let keep: Vec<usize> = candidates
        .boxes()
        .iter()
        .enumerate()
        .filter(|(_, b)| is_extractable(b, width, height))
        .map(|(i, _)| i)
        .collect();
    if keep.len() == candidates.len() {
        return candidates;
    }
    debug!("event" = "cascade.degenerate", dropped = candidates.len() - keep.len());
    candidates.select(&keep)
}
