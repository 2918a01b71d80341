use rust_decimal_macros::dec;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{error, info, instrument, Instrument};

use super::postgres_span;
use crate::config::DatabaseConfig;
use crate::models::{RepositoryError, RepositoryResult, SeedProduct};

/// Idempotent DDL, applied in order
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS category (
        category_id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS product (
        product_id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT,
        price NUMERIC(10, 2) NOT NULL CHECK (price >= 0),
        category_id BIGINT NOT NULL REFERENCES category (category_id),
        image_url TEXT
    )",
    "CREATE TABLE IF NOT EXISTS cart (
        cart_id BIGSERIAL PRIMARY KEY,
        customer_id BIGINT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS cart_items (
        cart_id BIGINT NOT NULL REFERENCES cart (cart_id) ON DELETE CASCADE,
        product_id BIGINT NOT NULL REFERENCES product (product_id),
        quantity INTEGER NOT NULL CHECK (quantity > 0),
        PRIMARY KEY (cart_id, product_id)
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE INDEX IF NOT EXISTS idx_product_category ON product (category_id)",
];

/// Sample catalog inserted by the seed endpoint
pub fn sample_catalog() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            name: "Wireless Mouse",
            description: "Ergonomic 2.4GHz mouse with silent clicks",
            price: dec!(19.99),
            category: "Electronics",
            image_url: Some("https://images.example.com/wireless-mouse.jpg"),
        },
        SeedProduct {
            name: "Mechanical Keyboard",
            description: "Tenkeyless keyboard with hot-swappable switches",
            price: dec!(89.50),
            category: "Electronics",
            image_url: Some("https://images.example.com/mechanical-keyboard.jpg"),
        },
        SeedProduct {
            name: "USB-C Hub",
            description: "Seven-port hub with HDMI and card reader",
            price: dec!(34.00),
            category: "Electronics",
            image_url: None,
        },
        SeedProduct {
            name: "The Rust Programming Language",
            description: "Hands-on introduction to Rust",
            price: dec!(39.95),
            category: "Books",
            image_url: Some("https://images.example.com/rust-book.jpg"),
        },
        SeedProduct {
            name: "Designing Data-Intensive Applications",
            description: "Reliable, scalable and maintainable systems",
            price: dec!(45.00),
            category: "Books",
            image_url: None,
        },
        SeedProduct {
            name: "Cotton T-Shirt",
            description: "Organic cotton crew neck",
            price: dec!(12.99),
            category: "Clothing",
            image_url: Some("https://images.example.com/t-shirt.jpg"),
        },
        SeedProduct {
            name: "Rain Jacket",
            description: "Lightweight waterproof shell",
            price: dec!(74.25),
            category: "Clothing",
            image_url: None,
        },
        SeedProduct {
            name: "French Press",
            description: "1 litre borosilicate glass coffee maker",
            price: dec!(24.50),
            category: "Home",
            image_url: Some("https://images.example.com/french-press.jpg"),
        },
    ]
}

/// Counts returned by the seed operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub categories_inserted: u64,
    pub products_inserted: u64,
}

/// Counts returned by the cleanup operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub cart_items_deleted: u64,
    pub carts_deleted: u64,
    pub products_deleted: u64,
}

/// Create the connection pool from configuration
#[instrument(skip(config), fields(max_connections = config.max_connections))]
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await?;

    info!("Connected to PostgreSQL");
    Ok(pool)
}

/// Manages schema creation, sample data and cleanup
#[derive(Clone)]
pub struct SchemaManager {
    pool: PgPool,
}

impl SchemaManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply all DDL statements in one transaction. Safe to run repeatedly.
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> RepositoryResult<usize> {
        info!("Ensuring database schema");

        let mut tx = self.pool.begin().await?;
        for statement in SCHEMA_STATEMENTS {
            if let Err(e) = sqlx::query(statement)
                .execute(&mut *tx)
                .instrument(postgres_span("CREATE", "schema"))
                .await
            {
                error!("Schema statement failed: {}", e);
                let _ = tx.rollback().await;
                return Err(e.into());
            }
        }
        tx.commit()
            .await
            .map_err(|e| RepositoryError::TransactionFailed {
                message: e.to_string(),
            })?;

        info!(statements = SCHEMA_STATEMENTS.len(), "Database schema ready");
        Ok(SCHEMA_STATEMENTS.len())
    }

    /// Insert the sample catalog. Existing categories and same-named
    /// products are left alone.
    #[instrument(skip(self))]
    pub async fn seed_sample_catalog(&self) -> RepositoryResult<SeedSummary> {
        let catalog = sample_catalog();
        let mut summary = SeedSummary::default();

        let mut categories: Vec<&str> = catalog.iter().map(|p| p.category).collect();
        categories.dedup();

        let mut tx = self.pool.begin().await?;

        for category in categories {
            let result =
                sqlx::query("INSERT INTO category (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                    .bind(category)
                    .execute(&mut *tx)
                    .instrument(postgres_span("INSERT", "category"))
                    .await;
            match result {
                Ok(done) => summary.categories_inserted += done.rows_affected(),
                Err(e) => {
                    error!("Failed to seed category {}: {}", category, e);
                    let _ = tx.rollback().await;
                    return Err(e.into());
                }
            }
        }

        for product in &catalog {
            let result = sqlx::query(
                "INSERT INTO product (name, description, price, category_id, image_url) \
                 SELECT $1, $2, $3, c.category_id, $5 FROM category c \
                 WHERE c.name = $4 AND NOT EXISTS (SELECT 1 FROM product WHERE name = $1)",
            )
            .bind(product.name)
            .bind(product.description)
            .bind(product.price)
            .bind(product.category)
            .bind(product.image_url)
            .execute(&mut *tx)
            .instrument(postgres_span("INSERT", "product"))
            .await;
            match result {
                Ok(done) => summary.products_inserted += done.rows_affected(),
                Err(e) => {
                    error!("Failed to seed product {}: {}", product.name, e);
                    let _ = tx.rollback().await;
                    return Err(e.into());
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::TransactionFailed {
                message: e.to_string(),
            })?;

        info!(
            categories = summary.categories_inserted,
            products = summary.products_inserted,
            "Sample catalog seeded"
        );
        Ok(summary)
    }

    /// Delete carts, cart items and products. Categories and users are kept.
    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> RepositoryResult<CleanupSummary> {
        let mut tx = self.pool.begin().await?;
        let mut summary = CleanupSummary::default();

        for (table, counter) in [
            ("cart_items", &mut summary.cart_items_deleted),
            ("cart", &mut summary.carts_deleted),
            ("product", &mut summary.products_deleted),
        ] {
            let statement = format!("DELETE FROM {}", table);
            match sqlx::query(&statement)
                .execute(&mut *tx)
                .instrument(postgres_span("DELETE", table))
                .await
            {
                Ok(done) => *counter = done.rows_affected(),
                Err(e) => {
                    error!("Failed to clean up {}: {}", table, e);
                    let _ = tx.rollback().await;
                    return Err(e.into());
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::TransactionFailed {
                message: e.to_string(),
            })?;

        info!(?summary, "Cleanup completed");
        Ok(summary)
    }
}
