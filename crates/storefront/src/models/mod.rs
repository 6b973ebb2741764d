//! Domain models for storefront.
//!
//! These types represent stored records assembled from database rows; the
//! pure pricing and scheduling types live in `balloon_boutique_core`.

mod order;

pub use order::{NewOrder, Order, OrderItem};
