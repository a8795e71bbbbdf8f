//! Order repository for database operations.

use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use maison_core::{OrderId, OrderStatus};

use super::RepositoryError;
use crate::models::{NewOrder, Order};

const ORDER_COLUMNS: &str = "id, order_id, full_name, phone_number, delivery_type, \
     delivery_address, notes, payment_proof_path, subtotal, status, items, created_at";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new order with status `new`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order number is already used.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, order), fields(order_id = %order.order_number))]
    pub async fn create(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let sql = format!(
            "INSERT INTO orders (order_id, full_name, phone_number, delivery_type, \
                 delivery_address, notes, payment_proof_path, subtotal, status, items) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ORDER_COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&sql)
            .bind(order.order_number.as_str())
            .bind(&order.full_name)
            .bind(&order.phone_number)
            .bind(order.delivery_type)
            .bind(&order.delivery_address)
            .bind(&order.notes)
            .bind(&order.payment_proof_path)
            .bind(order.subtotal)
            .bind(OrderStatus::New)
            .bind(Json(&order.items))
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "order number"))
    }

    /// Look up an order by its customer-facing number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_order_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1");
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(order_number)
            .fetch_optional(self.pool)
            .await?;
        Ok(order)
    }

    /// All orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
        let orders = sqlx::query_as::<_, Order>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(orders)
    }

    /// Set an order's status. Any status may follow any other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has this id.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove an order. Only used to undo a checkout that failed after persisting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
