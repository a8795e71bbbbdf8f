//! Maison Core - Shared domain types.
//!
//! This crate provides the types used across all Maison components:
//! - `storefront` - Public store and admin panel (single binary)
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Anything here can be exercised in a plain unit test.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, money, availability/status enums, carts and order snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
