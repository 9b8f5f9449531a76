// HTTP routes: metrics scrape, health probe, version

mod http;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::collector::Collector;
use crate::config::ServerConfig;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) collector: Arc<Collector>,
}

pub fn app(collector: Arc<Collector>, config: &ServerConfig) -> Router {
    let state = AppState { collector };
    Router::new()
        .route("/", get(|| async { "nasne_exporter\n" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(&config.metrics_path, get(http::metrics_handler)) // GET /metrics
        .route(&config.health_path, get(http::health_handler)) // GET /healthz
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
