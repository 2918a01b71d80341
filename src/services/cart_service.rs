use std::future::Future;
use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    parse_entity_id, validate_cart_quantity, AddCartItemRequest, CartItem, CartResponse,
    RemoveItemOutcome, RepositoryError, ServiceError, ServiceResult, Validate, ValidationError,
};
use crate::observability::{BusinessTracingMiddleware, Metrics};
use crate::repositories::CartRepository;

/// Service for managing shopping carts
pub struct CartService {
    cart_repository: Arc<dyn CartRepository>,
    business_tracing: Option<BusinessTracingMiddleware>,
}

impl CartService {
    /// Create a new CartService
    pub fn new(cart_repository: Arc<dyn CartRepository>) -> Self {
        Self {
            cart_repository,
            business_tracing: None,
        }
    }

    /// Record `cart_operations_total` for every storage-backed operation
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.business_tracing = Some(BusinessTracingMiddleware::new(metrics));
        self
    }

    /// Get a customer's cart, creating an empty one if none exists
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_cart(&self, customer_id: &str) -> ServiceResult<CartResponse> {
        let customer_id = Self::parse_customer_id(customer_id)?;
        crate::info_with_trace!("Getting cart for customer");

        let cart = self
            .traced("get_cart", customer_id, async {
                self.cart_repository
                    .get_cart(customer_id)
                    .await
                    .map_err(ServiceError::from)
            })
            .await?;

        crate::info_with_trace!(
            "Cart {} retrieved with {} items",
            cart.cart_id,
            cart.items.len()
        );
        Ok(cart.into_response())
    }

    /// Resolve the customer's cart id, creating the cart if absent
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_or_create_cart(&self, customer_id: &str) -> ServiceResult<i64> {
        let customer_id = Self::parse_customer_id(customer_id)?;

        self.traced("get_or_create_cart", customer_id, async {
            self.cart_repository
                .get_or_create_cart(customer_id)
                .await
                .map_err(ServiceError::from)
        })
        .await
    }

    /// Add an item to the cart. Repeated adds of the same product accumulate.
    #[instrument(skip(self, request), fields(customer_id = %customer_id, product_id = ?request.product_id, quantity = ?request.quantity))]
    pub async fn add_item(
        &self,
        customer_id: &str,
        request: AddCartItemRequest,
    ) -> ServiceResult<CartItem> {
        let customer_id = Self::parse_customer_id(customer_id)?;
        let (product_id, quantity) = Self::validate_add_cart_item_request(&request)?;

        crate::info_with_trace!("Adding item to cart");

        let item = self
            .traced("add_item", customer_id, async {
                self.cart_repository
                    .add_item(customer_id, product_id, quantity)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound => ServiceError::ProductNotFound { product_id },
                        e if e.is_foreign_key_violation() => {
                            ServiceError::ProductNotFound { product_id }
                        }
                        // The accumulated line no longer fits the quantity column
                        RepositoryError::ValueOutOfRange { .. } => ServiceError::InvalidQuantity {
                            quantity: i64::from(quantity),
                        },
                        e => e.into(),
                    })
            })
            .await?;

        crate::info_with_trace!(
            "Cart {} now holds {} of product {}",
            item.cart_id,
            item.quantity,
            item.product_id
        );
        Ok(item)
    }

    /// Remove a product line. The cart is deleted when this empties it.
    #[instrument(skip(self), fields(customer_id = %customer_id, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        customer_id: &str,
        product_id: &str,
    ) -> ServiceResult<RemoveItemOutcome> {
        let customer_id = Self::parse_customer_id(customer_id)?;
        let product_id = parse_entity_id("productId", product_id)?;

        crate::info_with_trace!("Removing item from cart");

        let outcome = self
            .traced("remove_item", customer_id, async {
                self.cart_repository
                    .remove_item(customer_id, product_id)
                    .await
                    .map_err(|e| match e {
                        RepositoryError::NotFound => ServiceError::CartNotFound { customer_id },
                        e => e.into(),
                    })
            })
            .await?;

        if !outcome.item_removed {
            crate::warn_with_trace!("Product {} was not in cart {}", product_id, outcome.cart_id);
        }
        if outcome.cart_deleted {
            crate::info_with_trace!("Cart {} emptied and deleted", outcome.cart_id);
        }
        Ok(outcome)
    }

    async fn traced<F, T>(&self, operation: &str, customer_id: i64, future: F) -> ServiceResult<T>
    where
        F: Future<Output = ServiceResult<T>>,
    {
        match &self.business_tracing {
            Some(business_tracing) => {
                business_tracing
                    .trace_cart_operation(operation, customer_id, future)
                    .await
            }
            None => future.await,
        }
    }

    fn parse_customer_id(customer_id: &str) -> ServiceResult<i64> {
        Ok(parse_entity_id("customerId", customer_id)?)
    }

    /// Validate the request and return `(product_id, quantity)`
    fn validate_add_cart_item_request(request: &AddCartItemRequest) -> ServiceResult<(i64, i32)> {
        request
            .validate()
            .map_err(|err| match (err, request.quantity) {
                (ValidationError::OutOfRange { .. }, Some(quantity)) => {
                    ServiceError::InvalidQuantity { quantity }
                }
                (err, _) => err.into(),
            })?;

        match (request.product_id, request.quantity) {
            (Some(product_id), Some(quantity)) => {
                let quantity = validate_cart_quantity(quantity)
                    .map_err(|_| ServiceError::InvalidQuantity { quantity })?;
                Ok((product_id, quantity))
            }
            // validate() rejects missing fields
            _ => Err(ServiceError::ValidationError {
                message: "productId and quantity are required".to_string(),
            }),
        }
    }
}
