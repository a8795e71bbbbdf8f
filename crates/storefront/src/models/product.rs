//! Product catalog model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use maison_core::{Availability, DEFAULT_VARIANT, MediaItem, MediaKind, Money, ProductId};

/// A catalog product as stored in `products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    /// Always derived from `stock_qty` and `low_stock_threshold`.
    pub availability: Availability,
    pub stock_qty: i32,
    pub low_stock_threshold: i32,
    pub lace_type: String,
    pub density: String,
    pub cap_size: String,
    #[sqlx(json)]
    pub colors: Vec<String>,
    #[sqlx(json)]
    pub lengths: Vec<String>,
    #[sqlx(json)]
    pub media: Vec<MediaItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[must_use]
    pub fn money(&self) -> Money {
        Money::ghs(self.price)
    }

    /// Whether the product can be added to a cart at all.
    #[must_use]
    pub fn is_purchasable(&self) -> bool {
        self.stock_qty > 0 && !self.availability.is_sold_out()
    }

    /// First image, used for listing cards and the cart.
    #[must_use]
    pub fn primary_image(&self) -> Option<&MediaItem> {
        self.media.iter().find(|m| m.is_image())
    }

    /// Media of one kind, in display order.
    pub fn media_of(&self, kind: MediaKind) -> impl Iterator<Item = &MediaItem> {
        self.media.iter().filter(move |m| m.kind == kind)
    }

    /// Color to use when the shopper did not pick one.
    #[must_use]
    pub fn default_color(&self) -> &str {
        self.colors.first().map_or(DEFAULT_VARIANT, String::as_str)
    }

    /// Length to use when the shopper did not pick one.
    #[must_use]
    pub fn default_length(&self) -> &str {
        self.lengths.first().map_or(DEFAULT_VARIANT, String::as_str)
    }
}

/// Fields an administrator submits to create or edit a product.
///
/// Availability is not part of the input: the repository derives it from
/// `stock_qty` and `low_stock_threshold`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub stock_qty: i32,
    pub low_stock_threshold: i32,
    pub lace_type: String,
    pub density: String,
    pub cap_size: String,
    pub colors: Vec<String>,
    pub lengths: Vec<String>,
    pub media: Vec<MediaItem>,
}

impl NewProduct {
    #[must_use]
    pub const fn availability(&self) -> Availability {
        Availability::for_stock(self.stock_qty, self.low_stock_threshold)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A product with sensible defaults for tests.
    pub fn product(id: i32, price: i64, stock_qty: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Wig {id}"),
            slug: format!("wig-{id}"),
            sku: format!("MJ-{id:03}"),
            description: String::new(),
            category: "Straight".to_string(),
            price: Decimal::from(price),
            availability: Availability::for_stock(stock_qty, 2),
            stock_qty,
            low_stock_threshold: 2,
            lace_type: "Closure".to_string(),
            density: "180%".to_string(),
            cap_size: "Medium".to_string(),
            colors: vec!["Black".to_string(), "Brown".to_string()],
            lengths: vec!["18".to_string(), "20".to_string()],
            media: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::product;
    use super::*;

    #[test]
    fn test_default_variants() {
        let mut p = product(1, 100, 5);
        assert_eq!(p.default_color(), "Black");
        assert_eq!(p.default_length(), "18");

        p.colors.clear();
        p.lengths.clear();
        assert_eq!(p.default_color(), DEFAULT_VARIANT);
        assert_eq!(p.default_length(), DEFAULT_VARIANT);
    }

    #[test]
    fn test_is_purchasable() {
        assert!(product(1, 100, 1).is_purchasable());
        assert!(!product(1, 100, 0).is_purchasable());
    }

    #[test]
    fn test_primary_image_skips_video() {
        let mut p = product(1, 100, 5);
        p.media = vec![
            MediaItem {
                kind: MediaKind::Video,
                path: "/v.mp4".to_string(),
                alt: None,
            },
            MediaItem {
                kind: MediaKind::Image,
                path: "/a.jpg".to_string(),
                alt: None,
            },
        ];
        assert_eq!(p.primary_image().map(|m| m.path.as_str()), Some("/a.jpg"));
        assert_eq!(p.media_of(MediaKind::Model).count(), 0);
    }
}
