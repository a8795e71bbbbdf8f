//! Domain models for the storefront.
//!
//! Rows loaded from `PostgreSQL` and the inputs used to create them. Pure value
//! types shared with other crates live in `maison-core`.

pub mod order;
pub mod product;
pub mod session;

pub use order::{NewOrder, Order};
pub use product::{NewProduct, Product};
pub use session::{CurrentAdmin, keys as session_keys};
