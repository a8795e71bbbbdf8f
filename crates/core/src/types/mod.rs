//! Core types for Maison.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod id;
pub mod media;
pub mod money;
pub mod order;
pub mod slug;
pub mod status;

pub use cart::{Cart, CartLine, DEFAULT_VARIANT};
pub use id::*;
pub use media::{MediaItem, MediaKind};
pub use money::{CurrencyCode, Money};
pub use order::{ORDER_NUMBER_PREFIX, OrderLineItem, OrderNumber, subtotal};
pub use slug::{Slug, SlugError, parse_csv_list};
pub use status::*;
