use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("image dimensions must be positive, got {width}x{height}")]
    InvalidImage { width: usize, height: usize },

    #[error("candidate arrays are not aligned: {boxes} boxes, {scores} scores, {offsets} offsets")]
    LengthMismatch {
        boxes: usize,
        scores: usize,
        offsets: usize,
    },

    #[error("{what}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("candidate {index} clips to an empty region")]
    DegenerateBox { index: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("model not available: {0}")]
    ModelUnavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[cfg(feature = "onnx")]
    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
