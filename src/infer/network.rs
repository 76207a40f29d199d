//! Capability interfaces for the three cascade networks.
//!
//! Images and patches are CHW float tensors already normalized by
//! [`crate::imaging::to_tensor`]. Implementations must be deterministic and
//! report failures through [`crate::Error`]; the cascade never retries.

use ndarray::{Array1, Array2, Array3, ArrayView3, ArrayView4};

use super::Offset;
use crate::error::{Error, Result};

/// Dense proposal output for one pyramid level.
#[derive(Debug, Clone)]
pub struct ProposalMap {
    /// Face probability per cell, `rows x cols`.
    pub probs: Array2<f32>,
    /// Offset regression per cell, `4 x rows x cols`.
    pub offsets: Array3<f32>,
}

#[derive(Debug, Clone)]
pub struct RefinePrediction {
    /// Face probability per patch, length `N`.
    pub probs: Array1<f32>,
    /// `N x 4`
    pub offsets: Array2<f32>,
}

#[derive(Debug, Clone)]
pub struct OutputPrediction {
    pub probs: Array1<f32>,
    pub offsets: Array2<f32>,
    /// `N x 10`: five x coordinates then five y coordinates, each a fraction
    /// of the input box width/height.
    pub landmarks: Array2<f32>,
}

pub trait ProposalNet: Send + Sync {
    /// Runs over one scaled image of shape `C x H x W`.
    fn infer(&self, image: ArrayView3<'_, f32>) -> Result<ProposalMap>;
}

pub trait RefineNet: Send + Sync {
    /// Runs over a batch of `N x C x 24 x 24` patches.
    fn infer(&self, patches: ArrayView4<'_, f32>) -> Result<RefinePrediction>;
}

pub trait OutputNet: Send + Sync {
    /// Runs over a batch of `N x C x 48 x 48` patches.
    fn infer(&self, patches: ArrayView4<'_, f32>) -> Result<OutputPrediction>;
}

pub(crate) fn check_batch(what: &'static str, probs: &Array1<f32>, offsets: &Array2<f32>, n: usize) -> Result<()> {
    if probs.len() != n {
        return Err(Error::ShapeMismatch { what, expected: vec![n], actual: vec![probs.len()] });
    }
    if offsets.dim() != (n, 4) {
        let (r, c) = offsets.dim();
        return Err(Error::ShapeMismatch { what, expected: vec![n, 4], actual: vec![r, c] });
    }
    Ok(())
}

pub(crate) fn offsets_from_rows(offsets: &Array2<f32>) -> Result<Vec<Offset>> {
    offsets.rows().into_iter().map(Offset::from_row).collect()
}
