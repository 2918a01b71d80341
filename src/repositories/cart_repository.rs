use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{info, instrument, warn, Instrument};

use super::postgres_span;
use crate::models::{Cart, CartItem, RemoveItemOutcome, RepositoryError, RepositoryResult};

/// Trait defining the interface for cart data access operations.
///
/// Every mutating call runs in its own transaction and takes the customer's
/// cart row lock before touching items, so all item mutations for one
/// customer are serialized.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Return the customer's cart id, creating the cart if absent
    async fn get_or_create_cart(&self, customer_id: i64) -> RepositoryResult<i64>;

    /// Read the customer's cart with its items, creating the cart if absent
    async fn get_cart(&self, customer_id: i64) -> RepositoryResult<Cart>;

    /// Add `quantity` units of a product. Fails with `NotFound` when the
    /// product does not exist.
    async fn add_item(
        &self,
        customer_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> RepositoryResult<CartItem>;

    /// Remove a product line and delete the cart if it became empty.
    /// Fails with `NotFound` when the customer has no cart.
    async fn remove_item(
        &self,
        customer_id: i64,
        product_id: i64,
    ) -> RepositoryResult<RemoveItemOutcome>;

    /// Count total number of carts
    async fn count_carts(&self) -> RepositoryResult<i64>;
}

/// PostgreSQL implementation of the CartRepository trait
#[derive(Clone)]
pub struct PgCartRepository {
    pool: PgPool,
}

const UPSERT_CART_SQL: &str = "\
INSERT INTO cart (customer_id) VALUES ($1) \
ON CONFLICT (customer_id) DO UPDATE SET customer_id = EXCLUDED.customer_id \
RETURNING cart_id";

const LOCK_CART_SQL: &str = "SELECT cart_id FROM cart WHERE customer_id = $1 FOR UPDATE";

const SELECT_ITEMS_SQL: &str = "\
SELECT ci.cart_id, ci.product_id, ci.quantity, p.name, p.price \
FROM cart_items ci \
JOIN product p ON p.product_id = ci.product_id \
WHERE ci.cart_id = $1 \
ORDER BY ci.product_id";

const UPSERT_ITEM_SQL: &str = "\
WITH upserted AS ( \
    INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
    ON CONFLICT (cart_id, product_id) \
    DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
    RETURNING cart_id, product_id, quantity \
) \
SELECT u.cart_id, u.product_id, u.quantity, p.name, p.price \
FROM upserted u \
JOIN product p ON p.product_id = u.product_id";

impl PgCartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert-if-absent in a single statement. The returned cart row stays
    /// locked until the surrounding transaction ends, whether it was just
    /// created or already existed.
    pub async fn get_or_create_cart_locked(
        conn: &mut PgConnection,
        customer_id: i64,
    ) -> RepositoryResult<i64> {
        let cart_id = sqlx::query_scalar::<_, i64>(UPSERT_CART_SQL)
            .bind(customer_id)
            .fetch_one(&mut *conn)
            .instrument(postgres_span("INSERT", "cart"))
            .await?;
        Ok(cart_id)
    }

    /// Lock an existing cart row without creating one
    pub async fn lock_cart(
        conn: &mut PgConnection,
        customer_id: i64,
    ) -> RepositoryResult<Option<i64>> {
        let cart_id = sqlx::query_scalar::<_, i64>(LOCK_CART_SQL)
            .bind(customer_id)
            .fetch_optional(&mut *conn)
            .instrument(postgres_span("SELECT FOR UPDATE", "cart"))
            .await?;
        Ok(cart_id)
    }

    /// Delete the cart if it has no items left. The caller must already
    /// hold the cart row lock in the same transaction, since the count
    /// itself cannot be taken `FOR UPDATE`.
    pub async fn cleanup_if_empty(conn: &mut PgConnection, cart_id: i64) -> RepositoryResult<bool> {
        let remaining =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
                .bind(cart_id)
                .fetch_one(&mut *conn)
                .instrument(postgres_span("SELECT", "cart_items"))
                .await?;

        if remaining > 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM cart WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .instrument(postgres_span("DELETE", "cart"))
            .await?;

        info!(cart_id, "Deleted empty cart");
        Ok(true)
    }

    async fn load_items(conn: &mut PgConnection, cart_id: i64) -> RepositoryResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(SELECT_ITEMS_SQL)
            .bind(cart_id)
            .fetch_all(&mut *conn)
            .instrument(postgres_span("SELECT", "cart_items"))
            .await?;
        Ok(items)
    }

    async fn product_exists(conn: &mut PgConnection, product_id: i64) -> RepositoryResult<bool> {
        let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM product WHERE product_id = $1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .instrument(postgres_span("SELECT", "product"))
            .await?;
        Ok(found.is_some())
    }

    async fn read_cart(conn: &mut PgConnection, customer_id: i64) -> RepositoryResult<Cart> {
        let cart_id = Self::get_or_create_cart_locked(conn, customer_id).await?;
        let items = Self::load_items(conn, cart_id).await?;
        Ok(Cart {
            cart_id,
            customer_id,
            items,
        })
    }

    async fn upsert_item(
        conn: &mut PgConnection,
        customer_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> RepositoryResult<CartItem> {
        let cart_id = Self::get_or_create_cart_locked(conn, customer_id).await?;

        if !Self::product_exists(conn, product_id).await? {
            return Err(RepositoryError::NotFound);
        }

        let item = sqlx::query_as::<_, CartItem>(UPSERT_ITEM_SQL)
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity)
            .fetch_one(&mut *conn)
            .instrument(postgres_span("INSERT", "cart_items"))
            .await?;
        Ok(item)
    }

    async fn delete_item(
        conn: &mut PgConnection,
        customer_id: i64,
        product_id: i64,
    ) -> RepositoryResult<RemoveItemOutcome> {
        let cart_id = Self::lock_cart(conn, customer_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let deleted = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(product_id)
            .execute(&mut *conn)
            .instrument(postgres_span("DELETE", "cart_items"))
            .await?;

        let cart_deleted = Self::cleanup_if_empty(conn, cart_id).await?;

        Ok(RemoveItemOutcome {
            cart_id,
            item_removed: deleted.rows_affected() > 0,
            cart_deleted,
        })
    }

    async fn begin(&self) -> RepositoryResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> RepositoryResult<()> {
        tx.commit()
            .await
            .map_err(|e| RepositoryError::TransactionFailed {
                message: e.to_string(),
            })
    }

    async fn rollback(tx: Transaction<'static, Postgres>, operation: &str) {
        if let Err(e) = tx.rollback().await {
            warn!(operation, error = %e, "Rollback failed, connection will be discarded");
        }
    }

    /// Commit on success, roll back explicitly on failure
    async fn finish<T>(
        tx: Transaction<'static, Postgres>,
        operation: &str,
        result: RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        match result {
            Ok(value) => {
                Self::commit(tx).await?;
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "Rolling back cart transaction");
                Self::rollback(tx, operation).await;
                Err(err)
            }
        }
    }
}

#[async_trait]
impl CartRepository for PgCartRepository {
    #[instrument(skip(self), fields(customer_id = customer_id))]
    async fn get_or_create_cart(&self, customer_id: i64) -> RepositoryResult<i64> {
        let mut tx = self.begin().await?;
        let result = Self::get_or_create_cart_locked(&mut tx, customer_id).await;
        Self::finish(tx, "get_or_create_cart", result).await
    }

    #[instrument(skip(self), fields(customer_id = customer_id))]
    async fn get_cart(&self, customer_id: i64) -> RepositoryResult<Cart> {
        let mut tx = self.begin().await?;
        let result = Self::read_cart(&mut tx, customer_id).await;
        let cart = Self::finish(tx, "get_cart", result).await?;

        info!(cart_id = cart.cart_id, item_count = cart.items.len(), "Cart loaded");
        Ok(cart)
    }

    #[instrument(skip(self), fields(customer_id = customer_id, product_id = product_id, quantity = quantity))]
    async fn add_item(
        &self,
        customer_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> RepositoryResult<CartItem> {
        let mut tx = self.begin().await?;
        let result = Self::upsert_item(&mut tx, customer_id, product_id, quantity).await;
        let item = Self::finish(tx, "add_item", result).await?;

        info!(
            cart_id = item.cart_id,
            new_quantity = item.quantity,
            "Cart item upserted"
        );
        Ok(item)
    }

    #[instrument(skip(self), fields(customer_id = customer_id, product_id = product_id))]
    async fn remove_item(
        &self,
        customer_id: i64,
        product_id: i64,
    ) -> RepositoryResult<RemoveItemOutcome> {
        let mut tx = self.begin().await?;
        let result = Self::delete_item(&mut tx, customer_id, product_id).await;
        let outcome = Self::finish(tx, "remove_item", result).await?;

        info!(
            cart_id = outcome.cart_id,
            item_removed = outcome.item_removed,
            cart_deleted = outcome.cart_deleted,
            "Cart item removed"
        );
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn count_carts(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cart")
            .fetch_one(&self.pool)
            .instrument(postgres_span("SELECT", "cart"))
            .await?;
        Ok(count)
    }
}
