#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use face_cascade::infer::{OutputNet, OutputPrediction, ProposalMap, ProposalNet, RefineNet, RefinePrediction};
use face_cascade::{CascadeConfig, Error, FaceCascade, Result};
use ndarray::{Array1, Array2, Array3, ArrayView3, ArrayView4};

/// Shared call counter that survives moving a fake into the cascade.
#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Proposal grid shaped like a 12x12 window with stride 2 over the input.
/// `hits` are `(row, col, prob)`; with `only_height` set, hits are emitted
/// only for the pyramid level of that height.
#[derive(Default)]
pub struct GridProposal {
    pub hits: Vec<(usize, usize, f32)>,
    pub offsets: [f32; 4],
    pub only_height: Option<usize>,
    pub fail: bool,
    pub calls: Calls,
}

impl ProposalNet for GridProposal {
    fn infer(&self, image: ArrayView3<'_, f32>) -> Result<ProposalMap> {
        self.calls.hit();
        if self.fail {
            return Err(Error::Inference("proposal backend down".to_string()));
        }
        let (_, h, w) = image.dim();
        let rows = h.saturating_sub(12) / 2 + 1;
        let cols = w.saturating_sub(12) / 2 + 1;
        let mut probs = Array2::zeros((rows, cols));
        let mut offsets = Array3::zeros((4, rows, cols));
        if self.only_height.is_none_or(|only| only == h) {
            for &(r, c, p) in &self.hits {
                if r < rows && c < cols {
                    probs[[r, c]] = p;
                    for k in 0..4 {
                        offsets[[k, r, c]] = self.offsets[k];
                    }
                }
            }
        }
        Ok(ProposalMap { probs, offsets })
    }
}

/// Same probability for every patch; records batch shapes. Offsets come from
/// `per_patch` by patch index, falling back to `offsets`.
#[derive(Default)]
pub struct ConstRefine {
    pub prob: f32,
    pub offsets: [f32; 4],
    pub per_patch: Vec<[f32; 4]>,
    pub extra_probs: usize,
    pub calls: Calls,
    pub batches: Arc<Mutex<Vec<(usize, usize, usize, usize)>>>,
}

impl RefineNet for ConstRefine {
    fn infer(&self, patches: ArrayView4<'_, f32>) -> Result<RefinePrediction> {
        self.calls.hit();
        self.batches.lock().unwrap().push(patches.dim());
        let n = patches.dim().0;
        Ok(RefinePrediction {
            probs: Array1::from_elem(n + self.extra_probs, self.prob),
            offsets: patch_offsets(n, &self.per_patch, self.offsets),
        })
    }
}

/// Per-patch probabilities (last value repeats), fixed landmarks, and
/// offsets chosen like [`ConstRefine`]'s.
#[derive(Default)]
pub struct ScriptedOutput {
    pub probs: Vec<f32>,
    pub offsets: [f32; 4],
    pub per_patch: Vec<[f32; 4]>,
    pub landmarks: [f32; 10],
    pub calls: Calls,
    pub batches: Arc<Mutex<Vec<(usize, usize, usize, usize)>>>,
}

impl OutputNet for ScriptedOutput {
    fn infer(&self, patches: ArrayView4<'_, f32>) -> Result<OutputPrediction> {
        self.calls.hit();
        self.batches.lock().unwrap().push(patches.dim());
        let n = patches.dim().0;
        let last = self.probs.last().copied().unwrap_or(0.0);
        Ok(OutputPrediction {
            probs: Array1::from_shape_fn(n, |i| self.probs.get(i).copied().unwrap_or(last)),
            offsets: patch_offsets(n, &self.per_patch, self.offsets),
            landmarks: Array2::from_shape_fn((n, 10), |(_, k)| self.landmarks[k]),
        })
    }
}

fn patch_offsets(n: usize, per_patch: &[[f32; 4]], fallback: [f32; 4]) -> Array2<f32> {
    Array2::from_shape_fn((n, 4), |(i, k)| per_patch.get(i).unwrap_or(&fallback)[k])
}

/// Two disjoint hits on the first level of a 60x60 image; after stage 1 they
/// square to (2,2,22,22) and (35,2,55,22).
pub fn two_faces_apart() -> GridProposal {
    GridProposal { hits: vec![(0, 0, 0.9), (0, 10, 0.9)], only_height: Some(36), ..Default::default() }
}

/// Moves a 21 pixel wide box right (or left) by 15.75 pixels.
pub const SHIFT_RIGHT: [f32; 4] = [0.75, 0.0, 0.75, 0.0];
pub const SHIFT_LEFT: [f32; 4] = [-0.75, 0.0, -0.75, 0.0];

pub fn face_at_origin() -> GridProposal {
    GridProposal { hits: vec![(0, 0, 0.9)], ..Default::default() }
}

pub fn accepting_refine() -> ConstRefine {
    ConstRefine { prob: 0.9, ..Default::default() }
}

pub fn accepting_output() -> ScriptedOutput {
    ScriptedOutput { probs: vec![0.95], landmarks: [0.5; 10], ..Default::default() }
}

pub fn cascade(proposal: GridProposal, refine: ConstRefine, output: ScriptedOutput) -> FaceCascade {
    FaceCascade::new(CascadeConfig::default(), proposal, refine, output).unwrap()
}

/// Normalized all-zero image, `3 x height x width`.
pub fn blank(height: usize, width: usize) -> Array3<f32> {
    Array3::zeros((3, height, width))
}
