use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::models::{AddCartItemRequest, CartResponse, MessageResponse, Product, ServiceError};
use crate::services::{CartService, CatalogService};

/// Shared state for catalog and cart endpoints
#[derive(Clone)]
pub struct ApiState {
    pub catalog_service: Arc<CatalogService>,
    pub cart_service: Arc<CartService>,
}

/// Query parameters for listing products
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub category: Option<String>,
}

pub type ApiError = (StatusCode, Json<Value>);

// =============================================================================
// CATALOG ENDPOINTS
// =============================================================================

/// List products, optionally filtered by category name
#[instrument(name = "list_products", skip(state), fields(category = query.category.as_deref()))]
pub async fn list_products(
    State(state): State<ApiState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    match state.catalog_service.list_products(query.category).await {
        Ok(products) => {
            info!("Successfully listed {} products", products.len());
            Ok(Json(products))
        }
        Err(err) => {
            error!("Failed to list products: {}", err);
            Err(service_error_to_response(err, "Error fetching products"))
        }
    }
}

/// Get a single product by id
#[instrument(name = "get_product", skip(state), fields(product_id = %product_id))]
pub async fn get_product(
    State(state): State<ApiState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    match state.catalog_service.get_product(&product_id).await {
        Ok(product) => Ok(Json(product)),
        Err(err) => {
            error!("Failed to get product: {}", err);
            Err(service_error_to_response(err, "Error fetching product"))
        }
    }
}

// =============================================================================
// CART ENDPOINTS
// =============================================================================

/// Get a customer's cart, creating it on first access
#[instrument(name = "get_cart", skip(state), fields(customer_id = %customer_id))]
pub async fn get_cart(
    State(state): State<ApiState>,
    Path(customer_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    match state.cart_service.get_cart(&customer_id).await {
        Ok(cart) => {
            info!(
                "Successfully retrieved cart {} with {} items",
                cart.cart_id,
                cart.items.len()
            );
            Ok(Json(cart))
        }
        Err(err) => {
            error!("Failed to get cart: {}", err);
            Err(service_error_to_response(err, "Error fetching cart"))
        }
    }
}

/// Add an item to the cart
#[instrument(name = "add_cart_item", skip(state, payload), fields(customer_id = %customer_id))]
pub async fn add_cart_item(
    State(state): State<ApiState>,
    Path(customer_id): Path<String>,
    payload: Result<Json<AddCartItemRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload.map_err(json_rejection_to_response)?;

    match state.cart_service.add_item(&customer_id, request).await {
        Ok(item) => {
            info!(
                "Product {} quantity is now {}",
                item.product_id, item.quantity
            );
            Ok(Json(MessageResponse::new("Cart updated successfully")))
        }
        Err(err) => {
            error!("Failed to add item to cart: {}", err);
            Err(service_error_to_response(err, "Error updating cart"))
        }
    }
}

/// Remove a product line from the cart
#[instrument(name = "remove_cart_item", skip(state), fields(customer_id = %customer_id, product_id = %product_id))]
pub async fn remove_cart_item(
    State(state): State<ApiState>,
    Path((customer_id, product_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    match state
        .cart_service
        .remove_item(&customer_id, &product_id)
        .await
    {
        Ok(outcome) => {
            info!(
                item_removed = outcome.item_removed,
                cart_deleted = outcome.cart_deleted,
                "Successfully processed item removal"
            );
            Ok(Json(MessageResponse::new(
                "Item removed from cart successfully",
            )))
        }
        Err(err) => {
            error!("Failed to remove item from cart: {}", err);
            Err(service_error_to_response(
                err,
                "Error removing item from cart",
            ))
        }
    }
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({
            "error": message.into(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// Malformed JSON bodies are client errors like any other validation failure
pub(crate) fn json_rejection_to_response(rejection: JsonRejection) -> ApiError {
    error!("Rejected request body: {}", rejection.body_text());
    error_body(StatusCode::BAD_REQUEST, "Invalid JSON body")
}

/// Convert service errors to HTTP responses. Storage failures are reported
/// with the per-operation `storage_message`; details stay in the logs.
pub(crate) fn service_error_to_response(err: ServiceError, storage_message: &str) -> ApiError {
    let (status, message) = match err {
        ServiceError::CartNotFound { .. } | ServiceError::ProductNotFound { .. } => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        ServiceError::ValidationError { .. }
        | ServiceError::InvalidQuantity { .. }
        | ServiceError::UsernameTaken { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::InvalidCredentials | ServiceError::Unauthenticated => {
            (StatusCode::UNAUTHORIZED, err.to_string())
        }
        ServiceError::PasswordHash { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, storage_message.to_string())
        }
        ServiceError::Repository { source } => {
            error!("Storage failure: {}", source);
            (StatusCode::INTERNAL_SERVER_ERROR, storage_message.to_string())
        }
    };

    error_body(status, message)
}
