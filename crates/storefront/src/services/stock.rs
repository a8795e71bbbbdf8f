//! Post-order stock reconciliation.
//!
//! Runs only after the order row exists. Under [`StockPolicy::Strict`] a line
//! that can no longer be covered undoes the deductions already made and fails;
//! the caller then removes the order. Under [`StockPolicy::BestEffort`] stock
//! floors at zero and problems are only logged.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::{error, instrument, warn};

use maison_core::{OrderLineItem, ProductId};

use super::catalog::{Catalog, Shortfall, StockChange};
use crate::db::RepositoryError;

/// How checkout treats a stock deduction that cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockPolicy {
    /// Refuse to oversell; compensate and fail the checkout.
    #[default]
    Strict,
    /// Clamp at zero and keep the order.
    BestEffort,
}

impl StockPolicy {
    #[must_use]
    pub const fn shortfall(self) -> Shortfall {
        match self {
            Self::Strict => Shortfall::Reject,
            Self::BestEffort => Shortfall::Floor,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::BestEffort => "best-effort",
        }
    }
}

impl fmt::Display for StockPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown stock policy '{0}' (expected 'strict' or 'best-effort')")]
pub struct InvalidStockPolicy(String);

impl FromStr for StockPolicy {
    type Err = InvalidStockPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "best-effort" | "best_effort" | "besteffort" => Ok(Self::BestEffort),
            other => Err(InvalidStockPolicy(other.to_string())),
        }
    }
}

/// Reconciliation failures under the strict policy.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A line could not be covered; earlier deductions were restocked.
    #[error("insufficient stock for {product_name}")]
    Unavailable { product_name: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Applies an order's quantities to the catalog.
pub struct StockReconciler<'a, C> {
    catalog: &'a C,
    policy: StockPolicy,
}

impl<'a, C: Catalog> StockReconciler<'a, C> {
    #[must_use]
    pub const fn new(catalog: &'a C, policy: StockPolicy) -> Self {
        Self { catalog, policy }
    }

    /// Deduct every line's quantity from its product.
    ///
    /// # Errors
    ///
    /// Only under the strict policy: `Unavailable` names the first line that
    /// could not be covered, `Repository` reports a failed stock update. In
    /// both cases every deduction already made has been restocked.
    #[instrument(skip(self, items), fields(policy = %self.policy, lines = items.len()))]
    pub async fn apply(&self, items: &[OrderLineItem]) -> Result<(), ReconcileError> {
        let shortfall = self.policy.shortfall();
        let mut applied: Vec<(ProductId, u32)> = Vec::with_capacity(items.len());

        for item in items {
            let outcome = self
                .catalog
                .reduce_stock(item.product_id, item.quantity, shortfall)
                .await;

            let failure = match outcome {
                Ok(StockChange::Applied(_)) => {
                    applied.push((item.product_id, item.quantity));
                    continue;
                }
                Ok(StockChange::Insufficient { available }) => {
                    warn!(
                        product_id = %item.product_id,
                        requested = item.quantity,
                        available,
                        "Insufficient stock during reconciliation"
                    );
                    ReconcileError::Unavailable {
                        product_name: item.product_name.clone(),
                    }
                }
                Ok(StockChange::NotFound) => {
                    warn!(product_id = %item.product_id, "Ordered product no longer exists");
                    ReconcileError::Unavailable {
                        product_name: item.product_name.clone(),
                    }
                }
                Err(e) => {
                    warn!(product_id = %item.product_id, error = %e, "Stock deduction failed");
                    ReconcileError::Repository(e)
                }
            };

            if self.policy == StockPolicy::BestEffort {
                continue;
            }

            self.restock(&applied).await;
            return Err(failure);
        }

        Ok(())
    }

    /// Return previously deducted quantities. Failures are logged, not raised.
    async fn restock(&self, applied: &[(ProductId, u32)]) {
        for &(product_id, quantity) in applied {
            match self.catalog.restock(product_id, quantity).await {
                Ok(Some(_)) => {}
                Ok(None) => warn!(%product_id, "Cannot restock a deleted product"),
                Err(e) => error!(%product_id, quantity, error = %e, "Restock failed"),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use maison_core::Availability;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::product::fixtures::product;
    use crate::services::testing::MemoryCatalog;

    fn item(id: i32, quantity: u32) -> OrderLineItem {
        OrderLineItem::snapshot(
            ProductId::new(id),
            &format!("Wig {id}"),
            "SKU",
            "Black",
            "18",
            quantity,
            Decimal::from(100),
        )
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("strict".parse::<StockPolicy>().unwrap(), StockPolicy::Strict);
        assert_eq!(
            " Best-Effort ".parse::<StockPolicy>().unwrap(),
            StockPolicy::BestEffort
        );
        assert!("lenient".parse::<StockPolicy>().is_err());
        assert_eq!(StockPolicy::default(), StockPolicy::Strict);
    }

    #[tokio::test]
    async fn test_strict_applies_all_lines() {
        let catalog = MemoryCatalog::new([product(1, 100, 5), product(2, 50, 3)]);
        let reconciler = StockReconciler::new(&catalog, StockPolicy::Strict);

        reconciler.apply(&[item(1, 2), item(2, 3)]).await.unwrap();

        let one = catalog.get(1).unwrap();
        assert_eq!(one.stock_qty, 3);
        assert_eq!(one.availability, Availability::InStock);
        let two = catalog.get(2).unwrap();
        assert_eq!(two.stock_qty, 0);
        assert_eq!(two.availability, Availability::SoldOut);
    }

    #[tokio::test]
    async fn test_strict_restocks_on_shortfall() {
        let catalog = MemoryCatalog::new([product(1, 100, 5), product(2, 50, 1)]);
        let reconciler = StockReconciler::new(&catalog, StockPolicy::Strict);

        let err = reconciler.apply(&[item(1, 2), item(2, 3)]).await.unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Unavailable { ref product_name } if product_name == "Wig 2"
        ));
        assert_eq!(catalog.get(1).unwrap().stock_qty, 5);
        assert_eq!(catalog.get(2).unwrap().stock_qty, 1);
    }

    #[tokio::test]
    async fn test_strict_missing_product_fails() {
        let catalog = MemoryCatalog::new([product(1, 100, 5)]);
        let reconciler = StockReconciler::new(&catalog, StockPolicy::Strict);

        let err = reconciler.apply(&[item(1, 1), item(9, 1)]).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Unavailable { .. }));
        assert_eq!(catalog.get(1).unwrap().stock_qty, 5);
    }

    #[tokio::test]
    async fn test_best_effort_floors_and_continues() {
        let catalog = MemoryCatalog::new([product(1, 100, 1), product(2, 50, 4)]);
        let reconciler = StockReconciler::new(&catalog, StockPolicy::BestEffort);

        reconciler
            .apply(&[item(1, 3), item(9, 1), item(2, 1)])
            .await
            .unwrap();

        assert_eq!(catalog.get(1).unwrap().stock_qty, 0);
        assert_eq!(catalog.get(1).unwrap().availability, Availability::SoldOut);
        assert_eq!(catalog.get(2).unwrap().stock_qty, 3);
    }
}
