//! Order model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use maison_core::{DeliveryType, Money, OrderId, OrderLineItem, OrderNumber, OrderStatus};

/// A placed order as stored in `orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    /// Customer-facing number (`MJ-YYYYMMDD-XXXX`).
    #[sqlx(rename = "order_id")]
    pub order_number: String,
    pub full_name: String,
    pub phone_number: String,
    pub delivery_type: DeliveryType,
    /// Empty for pickup orders.
    pub delivery_address: String,
    pub notes: String,
    /// Public URL of the uploaded payment proof, or empty.
    pub payment_proof_path: String,
    pub subtotal: Decimal,
    pub status: OrderStatus,
    #[sqlx(json)]
    pub items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    #[must_use]
    pub fn subtotal_money(&self) -> Money {
        Money::ghs(self.subtotal)
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |sum, item| sum.saturating_add(item.quantity))
    }
}

/// An order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub full_name: String,
    pub phone_number: String,
    pub delivery_type: DeliveryType,
    pub delivery_address: String,
    pub notes: String,
    pub payment_proof_path: String,
    /// Sum of `items[].line_total`; fixed at creation.
    pub subtotal: Decimal,
    pub items: Vec<OrderLineItem>,
}
