use axum::{handler::HandlerWithoutStateExt, http::StatusCode, response::Json, Router};
use serde_json::{json, Value};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

/// Serve the storefront pages: `/` is the login page, `/main` the shop,
/// everything else falls through to the static directory.
pub fn create_frontend_router(static_dir: impl AsRef<Path>) -> Router {
    let static_dir = static_dir.as_ref();

    // Unknown paths are 404 for every method, not 405 for non-GET
    let assets = ServeDir::new(static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("login.html")))
        .route_service("/main", ServeFile::new(static_dir.join("index.html")))
        .fallback_service(assets)
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
