//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart_token` - Signed cart cookie encoding and decoding
//! - `catalog` - Product lookups and stock mutation seam used by checkout
//! - `checkout` - Cart validation, order assembly and the order store seam
//! - `stock` - Post-order stock reconciliation and the stock policy
//! - `storage` - Supabase Storage uploads for media and payment proofs

pub mod cart_token;
pub mod catalog;
pub mod checkout;
pub mod stock;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use cart_token::{CartCodec, CurrentCart};
pub use catalog::Catalog;
pub use checkout::{Checkout, CheckoutError, CheckoutForm, OrderStore};
pub use stock::StockPolicy;
pub use storage::{ObjectStorage, StorageError, SupabaseStorage};
