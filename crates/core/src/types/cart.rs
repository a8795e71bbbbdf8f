//! Shopping cart held by the client.
//!
//! A [`Cart`] is a plain value: route handlers decode it from the request,
//! mutate it, and encode it back into the response. Nothing here knows about
//! cookies or signatures; see the storefront's cart token codec for that.

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Variant label used when a product has no colors or lengths to choose from.
pub const DEFAULT_VARIANT: &str = "Default";

/// A selected product variant and quantity, not yet checked against stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub color: String,
    pub length: String,
}

impl CartLine {
    /// Build a line, substituting [`DEFAULT_VARIANT`] for blank variant labels.
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32, color: &str, length: &str) -> Self {
        Self {
            product_id,
            quantity,
            color: variant_or_default(color),
            length: variant_or_default(length),
        }
    }

    fn same_variant(&self, other: &Self) -> bool {
        self.product_id == other.product_id
            && self.color == other.color
            && self.length == other.length
    }
}

fn variant_or_default(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        DEFAULT_VARIANT.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Ordered cart lines, unique by `(product_id, color, length)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from raw lines, merging duplicate variants.
    ///
    /// Zero-quantity lines are dropped. The first occurrence of a variant keeps
    /// its position; later duplicates add their quantity to it.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines.into_iter().filter(|l| l.quantity > 0) {
            match cart.lines.iter_mut().find(|l| l.same_variant(&line)) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total number of units across all lines (the cart badge count).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |sum, line| sum.saturating_add(line.quantity))
    }

    /// Add a variant to the cart.
    ///
    /// `stock_qty` is the product's live stock. The requested quantity is
    /// clamped to `1..=max(stock_qty, 1)`; if the variant is already in the
    /// cart its quantity grows but never past `stock_qty`.
    pub fn add(&mut self, line: CartLine, stock_qty: i32) {
        let ceiling = clamp_to_u32(stock_qty).max(1);
        let quantity = line.quantity.clamp(1, ceiling);

        if let Some(existing) = self.lines.iter_mut().find(|l| l.same_variant(&line)) {
            existing.quantity = existing.quantity.saturating_add(quantity).min(ceiling);
        } else {
            self.lines.push(CartLine { quantity, ..line });
        }
    }

    /// Set the quantity of the line at `index`.
    ///
    /// A quantity of zero removes the line. When the product's stock is known
    /// the quantity is capped at `max(stock, 1)`. Out-of-range indexes are ignored.
    pub fn update(&mut self, index: usize, quantity: u32, stock_qty: Option<i32>) {
        if quantity == 0 {
            self.remove(index);
            return;
        }
        if let Some(line) = self.lines.get_mut(index) {
            line.quantity = match stock_qty {
                Some(stock) => quantity.min(clamp_to_u32(stock).max(1)),
                None => quantity,
            };
        }
    }

    /// Remove the line at `index`. Out-of-range indexes are ignored.
    pub fn remove(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
        }
    }

    /// Empty the cart (after a successful checkout).
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

fn clamp_to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
