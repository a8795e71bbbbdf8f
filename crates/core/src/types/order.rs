//! Order numbers and frozen order line snapshots.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Prefix of every customer-facing order number.
pub const ORDER_NUMBER_PREFIX: &str = "MJ";

/// Customer-facing order identifier, e.g. `MJ-20260412-3FA9`.
///
/// Human-shareable rather than globally unique: the database's unique
/// constraint is the final authority and callers retry on collision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Build an order number from the order date and a random 16-bit suffix.
    #[must_use]
    pub fn new(date: NaiveDate, suffix: u16) -> Self {
        Self(format!(
            "{ORDER_NUMBER_PREFIX}-{}-{suffix:04X}",
            date.format("%Y%m%d")
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cart line frozen at checkout.
///
/// Copies name, SKU and price out of the product so later catalog edits never
/// change a historical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub color: String,
    pub length: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl OrderLineItem {
    /// Snapshot a line, computing `line_total = unit_price * quantity`.
    #[must_use]
    pub fn snapshot(
        product_id: ProductId,
        product_name: &str,
        sku: &str,
        color: &str,
        length: &str,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.to_owned(),
            sku: sku.to_owned(),
            color: color.to_owned(),
            length: length.to_owned(),
            quantity,
            unit_price,
            line_total: unit_price * Decimal::from(quantity),
        }
    }
}

/// Sum of the line totals.
#[must_use]
pub fn subtotal(items: &[OrderLineItem]) -> Decimal {
    items.iter().map(|item| item.line_total).sum()
}
