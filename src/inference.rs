use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CascadeConfig;
use crate::infer::FaceCascade;
use crate::models::{select_best_models, SelectedCatalog};

/// Models picked from the catalog and the cascade built from them, if any.
pub struct InferenceContext {
    pub selected_models: SelectedCatalog,
    pub cascade: Option<Arc<FaceCascade>>,
    pub cascade_config: CascadeConfig,
}

impl InferenceContext {
    pub fn new(models_dir: impl AsRef<Path>, cascade_config: CascadeConfig) -> Self {
        let selected = select_best_models(models_dir);
        if !selected.is_complete() {
            warn!("event" = "models.missing", missing = ?selected.missing(), "message" = "cascade needs proposal, refine and output models");
        }
        info!(
            "event" = "models.selected",
            has_proposal = selected.proposal.is_some(),
            has_refine = selected.refine.is_some(),
            has_output = selected.output.is_some()
        );

        #[cfg(feature = "onnx")]
        let _ = ort::init().with_name("face-cascade").commit();

        #[cfg(feature = "onnx")]
        let cascade = if selected.is_complete() {
            match crate::infer::onnx::load_cascade(&selected, cascade_config.clone()) {
                Ok(cascade) => {
                    info!("event" = "cascade.ready", min_face_size = cascade_config.min_face_size);
                    Some(Arc::new(cascade))
                }
                Err(err) => {
                    warn!("event" = "cascade.load.fail", %err);
                    None
                }
            }
        } else {
            None
        };

        #[cfg(not(feature = "onnx"))]
        let cascade = {
            warn!("event" = "cascade.disabled", "message" = "built without the onnx feature");
            None
        };

        InferenceContext { selected_models: selected, cascade, cascade_config }
    }

    /// Context around an already built cascade, bypassing the catalog.
    pub fn with_cascade(cascade: FaceCascade) -> Self {
        InferenceContext {
            selected_models: SelectedCatalog::default(),
            cascade_config: cascade.config().clone(),
            cascade: Some(Arc::new(cascade)),
        }
    }

    pub fn without_cascade(cascade_config: CascadeConfig) -> Self {
        InferenceContext { selected_models: SelectedCatalog::default(), cascade: None, cascade_config }
    }
}
