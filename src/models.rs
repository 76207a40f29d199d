use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};

/// Catalog subdirectories, one per cascade stage.
pub const MODEL_KINDS: [&str; 3] = ["proposal", "refine", "output"];

#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalogEntry {
    pub kind: String,
    pub versions: Vec<String>,
}

/// Versions of every kind, in `MODEL_KINDS` order.
pub fn inspect_models_dir(base_dir: impl AsRef<Path>) -> Vec<ModelCatalogEntry> {
    let base = base_dir.as_ref();
    MODEL_KINDS
        .iter()
        .map(|kind| ModelCatalogEntry { kind: kind.to_string(), versions: version_dirs(&base.join(kind)) })
        .collect()
}

/// Subdirectories holding a `metadata.json`, sorted by name.
fn version_dirs(kind_dir: &Path) -> Vec<String> {
    let Ok(read) = fs::read_dir(kind_dir) else { return Vec::new() };
    let mut versions: Vec<String> = read
        .flatten()
        .filter(|item| item.file_type().is_ok_and(|ft| ft.is_dir()))
        .filter(|item| item.path().join("metadata.json").exists())
        .map(|item| item.file_name().to_string_lossy().to_string())
        .collect();
    versions.sort();
    versions
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputSpec {
    pub name: String,
    pub shape: Vec<i64>,
    pub layout: String,
    pub mean: Option<Vec<f32>>,
    pub std: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelMetadata {
    pub name: String,
    pub version: String,
    pub url: String,
    pub sha256: String,
    pub inputs: Vec<InputSpec>,
    /// Output tensor names in order: probabilities, offsets, then landmarks
    /// for the output stage.
    #[serde(default)]
    pub outputs: Vec<String>,
    pub license: String,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSelection {
    pub kind: String,
    pub version: String,
    pub path: String,
    pub metadata: ModelMetadata,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SelectedCatalog {
    pub proposal: Option<ModelSelection>,
    pub refine: Option<ModelSelection>,
    pub output: Option<ModelSelection>,
}

impl SelectedCatalog {
    pub fn is_complete(&self) -> bool {
        self.proposal.is_some() && self.refine.is_some() && self.output.is_some()
    }

    pub fn missing(&self) -> Vec<&'static str> {
        [(MODEL_KINDS[0], &self.proposal), (MODEL_KINDS[1], &self.refine), (MODEL_KINDS[2], &self.output)]
            .into_iter()
            .filter(|(_, s)| s.is_none())
            .map(|(k, _)| k)
            .collect()
    }
}

pub fn read_metadata(path: &Path) -> Option<ModelMetadata> {
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str::<ModelMetadata>(&data).ok()
}

const MODEL_FILES: [&str; 3] = ["model.onnx", "model.ort", "model"];

/// Versions of `kind` with readable metadata and a model file next to it.
fn discover_kind(base_dir: &Path, kind: &str) -> Vec<ModelSelection> {
    let kind_dir = base_dir.join(kind);
    version_dirs(&kind_dir)
        .into_iter()
        .filter_map(|version| {
            let dir = kind_dir.join(&version);
            let metadata = read_metadata(&dir.join("metadata.json"))?;
            let model = MODEL_FILES.iter().map(|f| dir.join(f)).find(|p| p.exists())?;
            Some(ModelSelection { kind: kind.to_string(), version, path: model.to_string_lossy().to_string(), metadata })
        })
        .collect()
}

/// Highest declared accuracy wins; ties go to the latest version.
fn pick_best(candidates: Vec<ModelSelection>) -> Option<ModelSelection> {
    candidates.into_iter().max_by(|a, b| {
        let acc_a = a.metadata.accuracy.unwrap_or(f64::NEG_INFINITY);
        let acc_b = b.metadata.accuracy.unwrap_or(f64::NEG_INFINITY);
        acc_a.total_cmp(&acc_b).then_with(|| a.version.cmp(&b.version))
    })
}

pub fn select_best_models(base_dir: impl AsRef<Path>) -> SelectedCatalog {
    let base = base_dir.as_ref();
    let [proposal, refine, output] = MODEL_KINDS.map(|kind| pick_best(discover_kind(base, kind)));
    SelectedCatalog { proposal, refine, output }
}
