use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use prometheus::TEXT_FORMAT;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, instrument};

use crate::observability::Metrics;

/// Prometheus scrape endpoint: HTTP traffic plus cart, catalog and auth counters
#[instrument(name = "metrics_handler", skip(metrics))]
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to encode metrics" })),
            )
                .into_response()
        }
    }
}
