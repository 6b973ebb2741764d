//! Business logic services for storefront.
//!
//! # Services
//!
//! - `orders` - Checkout, slot validation, rescheduling and status changes

pub mod orders;

pub use orders::{Checkout, OrderError, OrderService, ValidCheckout};
