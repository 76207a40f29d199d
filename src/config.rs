use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Thresholds and pyramid parameters of the cascade. Index 0/1/2 of the
/// threshold arrays belong to the proposal/refine/output stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CascadeConfig {
    pub min_face_size: f64,
    pub factor: f64,
    pub thresholds: [f32; 3],
    pub nms_thresholds: [f32; 3],
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            min_face_size: 20.0,
            factor: 0.707,
            thresholds: [0.6, 0.7, 0.8],
            nms_thresholds: [0.7, 0.7, 0.7],
        }
    }
}

impl CascadeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_face_size > 0.0 && self.min_face_size.is_finite()) {
            return Err(Error::InvalidConfig(format!("minFaceSize must be positive, got {}", self.min_face_size)));
        }
        if !(self.factor > 0.0 && self.factor < 1.0) {
            return Err(Error::InvalidConfig(format!("factor must be in (0, 1), got {}", self.factor)));
        }
        for (name, values) in [("thresholds", &self.thresholds), ("nmsThresholds", &self.nms_thresholds)] {
            if let Some(v) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
                return Err(Error::InvalidConfig(format!("{name} must lie in [0, 1], got {v}")));
            }
        }
        Ok(())
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let config: CascadeConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }
}

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 << 20;

/// Process-level settings for the HTTP service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub models_dir: PathBuf,
    pub cascade_config: Option<PathBuf>,
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let addr = lookup("FACE_CASCADE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::InvalidConfig(format!("FACE_CASCADE_ADDR={addr}: {e}")))?;
        let max_body_bytes = match lookup("FACE_CASCADE_MAX_BODY") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|e| Error::InvalidConfig(format!("FACE_CASCADE_MAX_BODY={v}: {e}")))?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        Ok(Self {
            addr,
            models_dir: lookup("FACE_CASCADE_MODELS").unwrap_or_else(|| DEFAULT_MODELS_DIR.to_string()).into(),
            cascade_config: lookup("FACE_CASCADE_CONFIG").map(PathBuf::from),
            max_body_bytes,
        })
    }

    /// Cascade settings from `FACE_CASCADE_CONFIG` when set, defaults otherwise.
    pub fn load_cascade_config(&self) -> Result<CascadeConfig> {
        match &self.cascade_config {
            Some(path) => CascadeConfig::from_json_file(path),
            None => Ok(CascadeConfig::default()),
        }
    }
}
