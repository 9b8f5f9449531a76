// GET handlers: version, metrics, health

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::metrics::{self, PrometheusSink};
use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET <metrics_path>: polls every device now and renders the result.
pub(super) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let mut sink = PrometheusSink::new();
    state.collector.collect(&mut sink).await;
    match sink.finish() {
        Ok(body) => ([(header::CONTENT_TYPE, metrics::content_type())], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "metrics encoding failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics\n").into_response()
        }
    }
}

/// GET <health_path>: 200 when the last scrape reached every device, else 503 with the failures.
pub(super) async fn health_handler(State(state): State<AppState>) -> Response {
    let health = state.collector.health().await;
    if health.is_healthy(state.collector.target_count()) {
        return (StatusCode::OK, "ok\n").into_response();
    }
    let mut body = String::from("unhealthy\n");
    if !health.has_scraped() {
        body.push_str("no scrape completed yet\n");
    }
    for (target, error) in health.errors() {
        body.push_str(&format!("{}: {}\n", target, error));
    }
    (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
}
