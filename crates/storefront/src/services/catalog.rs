//! Catalog access used by checkout.
//!
//! [`Catalog`] is the narrow slice of the product repository that the order
//! flow needs. `PostgreSQL` backs it in production; tests use an in-memory map.

use std::future::Future;

use maison_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::models::Product;

/// What to do when a deduction exceeds the stock on hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortfall {
    /// Clamp the new stock at zero.
    Floor,
    /// Leave the row untouched and report the shortfall.
    Reject,
}

/// Outcome of a stock deduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockChange {
    /// The new stock was written; availability has been recomputed.
    Applied(Product),
    /// Rejected because only `available` units remain.
    Insufficient { available: i32 },
    /// No product with that id.
    NotFound,
}

/// Compute the stock left after taking `quantity` units.
///
/// # Errors
///
/// With [`Shortfall::Reject`], returns the current stock when it cannot cover
/// `quantity`.
pub fn deduct(current: i32, quantity: u32, shortfall: Shortfall) -> Result<i32, i32> {
    let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
    match shortfall {
        Shortfall::Floor => Ok(current.saturating_sub(quantity).max(0)),
        Shortfall::Reject if quantity > current => Err(current),
        Shortfall::Reject => Ok(current - quantity),
    }
}

/// Stock after returning `quantity` units.
#[must_use]
pub fn replenish(current: i32, quantity: u32) -> i32 {
    current
        .max(0)
        .saturating_add(i32::try_from(quantity).unwrap_or(i32::MAX))
}

/// Product lookups and stock mutations needed to place an order.
pub trait Catalog: Send + Sync {
    /// Fetch a product by id.
    fn product_by_id(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;

    /// Atomically deduct stock and recompute availability.
    fn reduce_stock(
        &self,
        id: ProductId,
        quantity: u32,
        shortfall: Shortfall,
    ) -> impl Future<Output = Result<StockChange, RepositoryError>> + Send;

    /// Atomically return stock (compensation) and recompute availability.
    fn restock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<Option<Product>, RepositoryError>> + Send;
}

impl Catalog for ProductRepository<'_> {
    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn reduce_stock(
        &self,
        id: ProductId,
        quantity: u32,
        shortfall: Shortfall,
    ) -> Result<StockChange, RepositoryError> {
        Self::reduce_stock(self, id, quantity, shortfall).await
    }

    async fn restock(&self, id: ProductId, quantity: u32) -> Result<Option<Product>, RepositoryError> {
        Self::restock(self, id, quantity).await
    }
}
