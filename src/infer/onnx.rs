use std::sync::Mutex;

use ndarray::{s, Array2, Array4, ArrayView3, ArrayView4};
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use super::{FaceCascade, OutputNet, OutputPrediction, ProposalMap, ProposalNet, RefineNet, RefinePrediction};
use crate::config::CascadeConfig;
use crate::error::{Error, Result};
use crate::imaging::Normalization;
use crate::models::{ModelSelection, SelectedCatalog};

/// One ONNX Runtime session plus the tensor names declared in its metadata.
pub struct OnnxNet {
    session: Mutex<Session>,
    input_name: String,
    output_names: Vec<String>,
}

impl OnnxNet {
    pub fn load(selection: &ModelSelection, expected_outputs: usize) -> Result<Self> {
        let meta = &selection.metadata;
        let input_name = meta
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| Error::ModelUnavailable(format!("{}: metadata declares no inputs", selection.kind)))?;
        if meta.outputs.len() != expected_outputs {
            return Err(Error::ModelUnavailable(format!(
                "{}: expected {expected_outputs} outputs in metadata, found {}",
                selection.kind,
                meta.outputs.len()
            )));
        }

        use ort::execution_providers::{CUDAExecutionProvider, ExecutionProviderDispatch};
        let providers: [ExecutionProviderDispatch; 1] = [CUDAExecutionProvider::default().into()];
        let session = Session::builder()?
            .with_intra_threads(1)?
            .with_execution_providers(providers)?
            .commit_from_file(&selection.path)?;
        info!("event" = "onnx.session.ok", "model" = %selection.kind, version = %selection.version);

        Ok(Self { session: Mutex::new(session), input_name, output_names: meta.outputs.clone() })
    }

    /// Runs one NCHW batch and returns every declared output as `(shape, data)`.
    fn run(&self, shape: [usize; 4], data: Vec<f32>) -> Result<Vec<(Vec<usize>, Vec<f32>)>> {
        let input = Tensor::from_array((shape, data.into_boxed_slice()))?;
        let mut session = self
            .session
            .lock()
            .map_err(|_| Error::Inference("onnx session lock poisoned".to_string()))?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input])?;
        self.output_names
            .iter()
            .map(|name| -> Result<(Vec<usize>, Vec<f32>)> {
                let (shape, data) = outputs[name.as_str()].try_extract_tensor::<f32>()?;
                Ok((shape.iter().map(|&d| d.max(0) as usize).collect(), data.to_vec()))
            })
            .collect()
    }
}

fn to_array4(what: &'static str, (shape, data): (Vec<usize>, Vec<f32>)) -> Result<Array4<f32>> {
    match shape.as_slice() {
        &[n, c, h, w] => Array4::from_shape_vec((n, c, h, w), data)
            .map_err(|_| Error::ShapeMismatch { what, expected: vec![n, c, h, w], actual: shape.clone() }),
        _ => Err(Error::ShapeMismatch { what, expected: vec![0; 4], actual: shape }),
    }
}

fn to_array2(what: &'static str, (shape, data): (Vec<usize>, Vec<f32>)) -> Result<Array2<f32>> {
    match shape.as_slice() {
        &[n, k] => Array2::from_shape_vec((n, k), data)
            .map_err(|_| Error::ShapeMismatch { what, expected: vec![n, k], actual: shape.clone() }),
        _ => Err(Error::ShapeMismatch { what, expected: vec![0; 2], actual: shape }),
    }
}

fn batch_input(patches: ArrayView4<'_, f32>) -> ([usize; 4], Vec<f32>) {
    let (n, c, h, w) = patches.dim();
    ([n, c, h, w], patches.iter().copied().collect())
}

/// Two-class softmax output; column 1 is the face class.
fn face_column(what: &'static str, probs: Array2<f32>) -> Result<ndarray::Array1<f32>> {
    if probs.ncols() != 2 {
        return Err(Error::ShapeMismatch { what, expected: vec![probs.nrows(), 2], actual: vec![probs.nrows(), probs.ncols()] });
    }
    Ok(probs.column(1).to_owned())
}

pub struct OnnxProposal(OnnxNet);
pub struct OnnxRefine(OnnxNet);
pub struct OnnxOutput(OnnxNet);

impl ProposalNet for OnnxProposal {
    fn infer(&self, image: ArrayView3<'_, f32>) -> Result<ProposalMap> {
        let (c, h, w) = image.dim();
        let mut outputs = self.0.run([1, c, h, w], image.iter().copied().collect())?.into_iter();
        let (Some(probs), Some(offsets)) = (outputs.next(), outputs.next()) else {
            return Err(Error::Inference("proposal model returned too few outputs".to_string()));
        };
        // [1, 2, rows, cols] and [1, 4, rows, cols]
        let probs = to_array4("proposal probabilities", probs)?;
        let offsets = to_array4("proposal offsets", offsets)?;
        if probs.dim().1 != 2 || offsets.dim().1 != 4 {
            return Err(Error::ShapeMismatch {
                what: "proposal outputs",
                expected: vec![2, 4],
                actual: vec![probs.dim().1, offsets.dim().1],
            });
        }
        Ok(ProposalMap {
            probs: probs.slice(s![0, 1, .., ..]).to_owned(),
            offsets: offsets.slice(s![0, .., .., ..]).to_owned(),
        })
    }
}

impl RefineNet for OnnxRefine {
    fn infer(&self, patches: ArrayView4<'_, f32>) -> Result<RefinePrediction> {
        let (shape, data) = batch_input(patches);
        let mut outputs = self.0.run(shape, data)?.into_iter();
        let (Some(probs), Some(offsets)) = (outputs.next(), outputs.next()) else {
            return Err(Error::Inference("refine model returned too few outputs".to_string()));
        };
        Ok(RefinePrediction {
            probs: face_column("refine probabilities", to_array2("refine probabilities", probs)?)?,
            offsets: to_array2("refine offsets", offsets)?,
        })
    }
}

impl OutputNet for OnnxOutput {
    fn infer(&self, patches: ArrayView4<'_, f32>) -> Result<OutputPrediction> {
        let (shape, data) = batch_input(patches);
        let mut outputs = self.0.run(shape, data)?.into_iter();
        let (Some(probs), Some(offsets), Some(landmarks)) = (outputs.next(), outputs.next(), outputs.next()) else {
            return Err(Error::Inference("output model returned too few outputs".to_string()));
        };
        Ok(OutputPrediction {
            probs: face_column("output probabilities", to_array2("output probabilities", probs)?)?,
            offsets: to_array2("output offsets", offsets)?,
            landmarks: to_array2("output landmarks", landmarks)?,
        })
    }
}

/// Normalization declared by a model's first input, defaults otherwise.
fn normalization_of(selection: &ModelSelection) -> Normalization {
    let mut norm = Normalization::default();
    if let Some(spec) = selection.metadata.inputs.first() {
        if let Some(m) = &spec.mean {
            if m.len() == 3 { norm.mean = [m[0], m[1], m[2]]; }
        }
        if let Some(s) = &spec.std {
            if s.len() == 3 { norm.std = [s[0], s[1], s[2]]; }
        }
    }
    norm
}

/// Builds a cascade from a complete catalog selection.
pub fn load_cascade(selected: &SelectedCatalog, config: CascadeConfig) -> Result<FaceCascade> {
    let (Some(proposal), Some(refine), Some(output)) = (&selected.proposal, &selected.refine, &selected.output) else {
        return Err(Error::ModelUnavailable("proposal, refine and output models are all required".to_string()));
    };
    let cascade = FaceCascade::new(
        config,
        OnnxProposal(OnnxNet::load(proposal, 2)?),
        OnnxRefine(OnnxNet::load(refine, 2)?),
        OnnxOutput(OnnxNet::load(output, 3)?),
    )?;
    Ok(cascade.with_normalization(normalization_of(proposal)))
}
