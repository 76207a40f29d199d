use serde::{Deserialize, Serialize};

use crate::config::CascadeConfig;
use crate::infer::Face;
use crate::models::{ModelCatalogEntry, SelectedCatalog};

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    /// "jpeg" or "png"
    pub format: String,
    /// Base64 encoded image bytes.
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceDebug {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub landmarks: [[f32; 2]; 5],
}

impl From<&Face> for FaceDebug {
    fn from(f: &Face) -> Self {
        FaceDebug { x1: f.bbox.x1, y1: f.bbox.y1, x2: f.bbox.x2, y2: f.bbox.y2, score: f.score, landmarks: f.landmarks }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    pub request_id: String,
    pub width: u32,
    pub height: u32,
    pub faces: Vec<FaceDebug>,
    pub elapsed_ms: f64,
    pub detected_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cascade_ready: bool,
    pub selected: SelectedCatalog,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub models: Vec<ModelCatalogEntry>,
    pub selected: SelectedCatalog,
    pub cascade: CascadeConfig,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub code: &'a str,
    pub message: String,
}
