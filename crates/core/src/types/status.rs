//! Status enums for products and orders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Stock-derived availability tier of a product.
///
/// Never stored independently of stock: always obtain one through
/// [`Availability::for_stock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "availability", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    InStock,
    LowStock,
    SoldOut,
}

impl Availability {
    /// All tiers, in display order.
    pub const ALL: [Self; 3] = [Self::InStock, Self::LowStock, Self::SoldOut];

    /// Derive the tier from a stock quantity and the product's low-stock threshold.
    ///
    /// - `stock <= 0` is sold out
    /// - `0 < stock <= threshold` is low stock
    /// - anything above the threshold is in stock
    #[must_use]
    pub const fn for_stock(stock_qty: i32, low_stock_threshold: i32) -> Self {
        if stock_qty <= 0 {
            Self::SoldOut
        } else if stock_qty <= low_stock_threshold {
            Self::LowStock
        } else {
            Self::InStock
        }
    }

    /// Machine value used in URLs and the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::LowStock => "low_stock",
            Self::SoldOut => "sold_out",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::LowStock => "Low Stock",
            Self::SoldOut => "Sold Out",
        }
    }

    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        matches!(self, Self::SoldOut)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Availability {
    type Err = String;

    /// Accepts both machine values (`low_stock`) and labels (`Low Stock`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(' ', "_");
        match normalized.as_str() {
            "in_stock" => Ok(Self::InStock),
            "low_stock" => Ok(Self::LowStock),
            "sold_out" => Ok(Self::SoldOut),
            _ => Err(format!("invalid availability: {s}")),
        }
    }
}

/// Order processing status.
///
/// Admins may move an order between any two statuses; there is no enforced
/// transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 4] = [Self::New, Self::Processing, Self::Completed, Self::Cancelled];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Self::New),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "delivery_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    #[default]
    Pickup,
    Delivery,
}

impl DeliveryType {
    /// Parse a submitted form value. Anything other than "delivery" is a pickup.
    #[must_use]
    pub fn from_form(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "delivery" => Self::Delivery,
            _ => Self::Pickup,
        }
    }

    #[must_use]
    pub const fn requires_address(&self) -> bool {
        matches!(self, Self::Delivery)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pickup => "Pickup",
            Self::Delivery => "Delivery",
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
