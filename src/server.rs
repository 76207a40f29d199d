use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use image::GenericImageView;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::error::Error;
use crate::inference::InferenceContext;
use crate::models;
use crate::protocol::{ConfigResponse, DetectRequest, DetectResponse, ErrorResponse, FaceDebug, HealthResponse};

#[derive(Clone)]
pub struct AppState {
    pub inference: Arc<InferenceContext>,
    pub models_dir: PathBuf,
}

pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(config))
        .route("/detect", post(detect))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_origin(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { code, message: message.into() })).into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cascade_ready: state.inference.cascade.is_some(),
        selected: state.inference.selected_models.clone(),
    };
    (StatusCode::OK, Json(body))
}

async fn config(State(state): State<AppState>) -> impl IntoResponse {
    let body = ConfigResponse {
        models: models::inspect_models_dir(&state.models_dir),
        selected: state.inference.selected_models.clone(),
        cascade: state.inference.cascade_config.clone(),
    };
    (StatusCode::OK, Json(body))
}

async fn detect(State(state): State<AppState>, Json(req): Json<DetectRequest>) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let Some(cascade) = state.inference.cascade.clone() else {
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "models-unavailable", "no cascade loaded");
    };
    if req.format != "jpeg" && req.format != "png" {
        return error_response(StatusCode::BAD_REQUEST, "unsupported-format", format!("unsupported format {:?}", req.format));
    }
    let bytes = match base64::engine::general_purpose::STANDARD.decode(&req.data) {
        Ok(bytes) => bytes,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, "invalid-payload", err.to_string()),
    };

    let started = Instant::now();
    let joined = tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&bytes)?;
        let (w, h) = img.dimensions();
        let faces = cascade.detect_image(&img)?;
        Ok::<_, Error>((w, h, faces))
    })
    .await;

    match joined {
        Ok(Ok((width, height, faces))) => {
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            info!("event" = "detect.done", request_id = %request_id, faces = faces.len(), elapsed_ms);
            let body = DetectResponse {
                request_id,
                width,
                height,
                faces: faces.iter().map(FaceDebug::from).collect(),
                elapsed_ms,
                detected_at: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Ok(Err(Error::Image(err))) => {
            warn!("event" = "detect.bad_image", request_id = %request_id, %err);
            error_response(StatusCode::BAD_REQUEST, "invalid-image", err.to_string())
        }
        Ok(Err(err)) => {
            error!("event" = "detect.fail", request_id = %request_id, %err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "detect-failed", err.to_string())
        }
        Err(err) => {
            error!("event" = "detect.panic", request_id = %request_id, %err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "detect-failed", "detection task aborted")
        }
    }
}
