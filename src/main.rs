use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use face_cascade::config::ServerConfig;
use face_cascade::inference::InferenceContext;
use face_cascade::server::{router, AppState};

#[tokio::main]
async fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,axum=info,hyper=info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("event" = "config.invalid", %err);
            std::process::exit(2);
        }
    };
    let cascade_config = match config.load_cascade_config() {
        Ok(c) => c,
        Err(err) => {
            error!("event" = "config.invalid", path = ?config.cascade_config, %err);
            std::process::exit(2);
        }
    };

    let state = AppState {
        inference: Arc::new(InferenceContext::new(&config.models_dir, cascade_config)),
        models_dir: config.models_dir.clone(),
    };
    let app = router(state, config.max_body_bytes);

    info!("listening" = %config.addr, "event" = "server.start");
    let listener = match TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("event" = "server.bind", %err);
            std::process::exit(1);
        }
    };
    if let Err(err) = axum::serve(listener, app).await {
        error!(%err, "server error");
    }
}
