use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::handlers::{
    admin, api, auth, cors_middleware, create_frontend_router, health_check, metrics_handler,
    request_validation_middleware, security_headers_middleware,
};
use crate::observability::{observability_middleware, Metrics};
use crate::repositories::SchemaManager;
use crate::services::{AuthService, CartService, CatalogService};

/// Everything the router needs to serve requests
#[derive(Clone)]
pub struct AppServices {
    pub metrics: Arc<Metrics>,
    pub catalog_service: Arc<CatalogService>,
    pub cart_service: Arc<CartService>,
    pub auth_service: Arc<AuthService>,
    /// Needed for the admin endpoints, which also require `enable_admin`
    pub schema_manager: Option<Arc<SchemaManager>>,
}

/// Build the application router
pub fn create_app(services: AppServices, server: &ServerConfig) -> Router {
    let metrics_for_middleware = services.metrics.clone();
    let max_request_size = server.max_request_size as u64;

    let api_state = api::ApiState {
        catalog_service: services.catalog_service,
        cart_service: services.cart_service,
    };

    let auth_state = auth::AuthState {
        auth_service: services.auth_service,
    };

    let mut app = Router::new()
        // Health and metrics endpoints (with metrics state)
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(services.metrics)
        // Catalog and cart endpoints
        .route("/api/products", get(api::list_products))
        .route("/api/products/:product_id", get(api::get_product))
        .route("/api/cart/:customer_id", get(api::get_cart))
        .route("/api/cart/:customer_id/items", post(api::add_cart_item))
        .route(
            "/api/cart/:customer_id/items/:product_id",
            delete(api::remove_cart_item),
        )
        .with_state(api_state)
        // Account endpoints
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/check", get(auth::check_auth))
        .with_state(auth_state);

    match services.schema_manager {
        Some(schema_manager) if server.enable_admin => {
            warn!("Admin endpoints are enabled");
            app = app.merge(admin::create_admin_router(schema_manager));
        }
        _ => debug!("Admin endpoints are disabled"),
    }

    app.merge(create_frontend_router(&server.static_dir))
        // Add middleware layers (order matters - outer to inner)
        .layer(DefaultBodyLimit::max(server.max_request_size))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(move |req, next| {
            request_validation_middleware(max_request_size, req, next)
        }))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
