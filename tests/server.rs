mod common;

use std::io::Cursor;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use common::*;
use face_cascade::inference::InferenceContext;
use face_cascade::protocol::DetectResponse;
use face_cascade::server::{router, AppState};
use face_cascade::CascadeConfig;
use tower::ServiceExt;

fn app(inference: InferenceContext) -> Router {
    let state = AppState { inference: Arc::new(inference), models_dir: "/nonexistent/models".into() };
    router(state, 1 << 20)
}

fn ready_app() -> Router {
    app(InferenceContext::with_cascade(cascade(face_at_origin(), accepting_refine(), accepting_output())))
}

fn png_base64(width: u32, height: u32) -> String {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut buf), image::ImageOutputFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(buf)
}

fn detect_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_cascade_state() {
    let resp = app(InferenceContext::without_cascade(CascadeConfig::default()))
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cascadeReady"], false);

    let resp = ready_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_body(resp).await["cascadeReady"], true);
}

#[tokio::test]
async fn config_exposes_active_thresholds() {
    let config = CascadeConfig { min_face_size: 32.0, ..Default::default() };
    let resp = app(InferenceContext::without_cascade(config))
        .oneshot(Request::builder().uri("/config").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["cascade"]["minFaceSize"], 32.0);
    assert_eq!(body["models"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn detect_returns_faces_with_landmarks() {
    let resp = ready_app()
        .oneshot(detect_request(serde_json::json!({ "format": "png", "data": png_base64(24, 24) })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: DetectResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!((body.width, body.height), (24, 24));
    assert_eq!(body.faces.len(), 1);
    assert_eq!(body.faces[0].x1, 2.0);
    assert_eq!(body.faces[0].landmarks[2], [12.5, 12.5]);
    assert!(!body.request_id.is_empty());
    assert!(!body.detected_at.is_empty());
}

#[tokio::test]
async fn detect_without_models_is_unavailable() {
    let resp = app(InferenceContext::without_cascade(CascadeConfig::default()))
        .oneshot(detect_request(serde_json::json!({ "format": "png", "data": png_base64(24, 24) })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(resp).await["code"], "models-unavailable");
}

#[tokio::test]
async fn detect_rejects_bad_input() {
    let cases = [
        (serde_json::json!({ "format": "gif", "data": png_base64(24, 24) }), "unsupported-format"),
        (serde_json::json!({ "format": "png", "data": "***" }), "invalid-payload"),
        (
            serde_json::json!({ "format": "png", "data": base64::engine::general_purpose::STANDARD.encode(b"not an image") }),
            "invalid-image",
        ),
    ];
    for (body, code) in cases {
        let resp = ready_app().oneshot(detect_request(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(json_body(resp).await["code"], code);
    }
}
