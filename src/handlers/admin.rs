use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::models::RepositoryError;
use crate::repositories::{CleanupSummary, SchemaManager, SeedSummary};

/// Admin state containing the schema manager
#[derive(Clone)]
pub struct AdminState {
    pub schema_manager: Arc<SchemaManager>,
}

/// Response for schema setup
#[derive(Debug, Serialize)]
pub struct SetupSchemaResponse {
    pub message: String,
    pub statements_executed: usize,
    pub timestamp: String,
}

/// Response for seeding operations
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: SeedSummary,
    pub timestamp: String,
}

/// Response for cleanup operations
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: CleanupSummary,
    pub timestamp: String,
}

/// Create admin router with database management endpoints
pub fn create_admin_router(schema_manager: Arc<SchemaManager>) -> Router {
    let state = AdminState { schema_manager };

    Router::new()
        .route("/api/admin/setup-schema", post(setup_schema))
        .route("/api/admin/seed", post(seed_database))
        .route("/api/admin/cleanup", post(cleanup_database))
        .with_state(state)
}

/// Create the storefront tables if they do not exist
#[instrument(name = "setup_schema", skip(state))]
pub async fn setup_schema(
    State(state): State<AdminState>,
) -> Result<Json<SetupSchemaResponse>, (StatusCode, Json<Value>)> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    info!("Setting up database schema");

    match state.schema_manager.ensure_schema().await {
        Ok(statements_executed) => {
            info!("Schema ready after {} statements", statements_executed);
            Ok(Json(SetupSchemaResponse {
                message: "Schema is up to date".to_string(),
                statements_executed,
                timestamp,
            }))
        }
        Err(err) => Err(admin_failure("Failed to set up schema", err, timestamp)),
    }
}

/// Seed the catalog with sample categories and products
#[instrument(name = "seed_database", skip(state))]
pub async fn seed_database(
    State(state): State<AdminState>,
) -> Result<Json<SeedResponse>, (StatusCode, Json<Value>)> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    info!("Seeding database with sample catalog");

    match state.schema_manager.seed_sample_catalog().await {
        Ok(summary) => {
            info!(
                categories = summary.categories_inserted,
                products = summary.products_inserted,
                "Sample catalog seeded"
            );
            Ok(Json(SeedResponse {
                message: format!(
                    "Database seeded with {} products",
                    summary.products_inserted
                ),
                summary,
                timestamp,
            }))
        }
        Err(err) => Err(admin_failure("Failed to seed database", err, timestamp)),
    }
}

/// Remove carts and products so the storefront can be reset
#[instrument(name = "cleanup_database", skip(state))]
pub async fn cleanup_database(
    State(state): State<AdminState>,
) -> Result<Json<CleanupResponse>, (StatusCode, Json<Value>)> {
    let timestamp = chrono::Utc::now().to_rfc3339();

    info!("Cleaning up database");

    match state.schema_manager.cleanup().await {
        Ok(summary) => {
            info!(
                carts = summary.carts_deleted,
                products = summary.products_deleted,
                "Database cleaned up"
            );
            Ok(Json(CleanupResponse {
                message: format!(
                    "Database cleaned up, removed {} carts and {} products",
                    summary.carts_deleted, summary.products_deleted
                ),
                summary,
                timestamp,
            }))
        }
        Err(err) => Err(admin_failure("Failed to cleanup database", err, timestamp)),
    }
}

fn admin_failure(
    message: &str,
    err: RepositoryError,
    timestamp: String,
) -> (StatusCode, Json<Value>) {
    error!("{}: {}", message, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "timestamp": timestamp,
        })),
    )
}
