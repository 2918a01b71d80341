use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, instrument, Instrument};

use super::postgres_span;
use crate::models::{Product, ProductFilters, RepositoryResult};

/// Read-only access to products and their categories
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// List products ordered by id, optionally restricted to one category name
    async fn find_products(&self, filters: &ProductFilters) -> RepositoryResult<Vec<Product>>;

    /// Find a product by its id
    async fn find_product(&self, product_id: i64) -> RepositoryResult<Option<Product>>;
}

/// PostgreSQL implementation of the CatalogRepository trait
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

const SELECT_PRODUCTS_SQL: &str = "\
SELECT p.product_id, p.name, p.description, p.price, p.category_id, p.image_url, \
       c.name AS category_name \
FROM product p \
JOIN category c ON c.category_id = p.category_id \
WHERE ($1::TEXT IS NULL OR c.name = $1) \
ORDER BY p.product_id";

const SELECT_PRODUCT_BY_ID_SQL: &str = "\
SELECT p.product_id, p.name, p.description, p.price, p.category_id, p.image_url, \
       c.name AS category_name \
FROM product p \
JOIN category c ON c.category_id = p.category_id \
WHERE p.product_id = $1";

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    #[instrument(skip(self), fields(category = ?filters.category))]
    async fn find_products(&self, filters: &ProductFilters) -> RepositoryResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(SELECT_PRODUCTS_SQL)
            .bind(filters.category.as_deref())
            .fetch_all(&self.pool)
            .instrument(postgres_span("SELECT", "product"))
            .await?;

        info!(count = products.len(), "Products fetched");
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = product_id))]
    async fn find_product(&self, product_id: i64) -> RepositoryResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(SELECT_PRODUCT_BY_ID_SQL)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .instrument(postgres_span("SELECT", "product"))
            .await?;
        Ok(product)
    }
}
