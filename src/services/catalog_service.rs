use std::sync::Arc;
use tracing::instrument;

use crate::models::{parse_entity_id, Product, ProductFilters, ServiceError, ServiceResult};
use crate::observability::{BusinessTracingMiddleware, Metrics};
use crate::repositories::CatalogRepository;

/// Read-only product catalog
pub struct CatalogService {
    catalog_repository: Arc<dyn CatalogRepository>,
    business_tracing: Option<BusinessTracingMiddleware>,
}

impl CatalogService {
    pub fn new(catalog_repository: Arc<dyn CatalogRepository>) -> Self {
        Self {
            catalog_repository,
            business_tracing: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.business_tracing = Some(BusinessTracingMiddleware::new(metrics));
        self
    }

    /// List products, optionally restricted to an exact category name.
    /// An unknown category yields an empty list.
    #[instrument(skip(self), fields(category = ?category))]
    pub async fn list_products(&self, category: Option<String>) -> ServiceResult<Vec<Product>> {
        let filters = ProductFilters::by_category(category);
        crate::info_with_trace!("Listing products, filtered: {}", filters.is_filtered());

        let query = async {
            self.catalog_repository
                .find_products(&filters)
                .await
                .map_err(ServiceError::from)
        };

        let products = match &self.business_tracing {
            Some(business_tracing) => {
                business_tracing
                    .trace_catalog_query(filters.is_filtered(), query)
                    .await?
            }
            None => query.await?,
        };

        crate::info_with_trace!("Found {} products", products.len());
        Ok(products)
    }

    /// Fetch one product by id
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: &str) -> ServiceResult<Product> {
        let product_id = parse_entity_id("productId", product_id)?;

        self.catalog_repository
            .find_product(product_id)
            .await?
            .ok_or(ServiceError::ProductNotFound { product_id })
    }
}
