//! Balloon Boutique Core - Domain library.
//!
//! This crate holds the business rules shared by the storefront server and
//! the CLI:
//! - `storefront` - Public JSON API (catalog, checkout, order management)
//! - `cli` - Migrations and operator tooling
//!
//! # Architecture
//!
//! Everything in here is pure: no database access, no HTTP, no clock reads
//! except where a function explicitly says so. Callers pass `now` in, which
//! keeps the rules deterministic under test.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails, and statuses
//! - [`delivery`] - Delivery slot generation and booking validation
//! - [`discount`] - Discount scoping and precedence resolution
//! - [`catalog`] - Product model and catalog filtering
//! - [`order`] - Cart pricing and order totals

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod delivery;
pub mod discount;
pub mod order;
pub mod types;

pub use types::*;
