//! Database operations for the storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `category_group`, `category` - Catalog taxonomy
//! - `product`, `product_category`, `product_size` - Catalog
//! - `discount` - Percentage discounts scoped to a product, group or category
//! - `customer_order`, `order_item` - Orders and their priced lines
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p balloon-boutique-cli -- migrate
//! ```

pub mod discounts;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use discounts::DiscountRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// A conditional write lost a race (e.g. stock ran out).
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a non-negative `INTEGER` column to `u32`.
pub(crate) fn non_negative(column: &str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a `u32` count to an `INTEGER` bind value.
pub(crate) fn to_integer(column: &str, value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("{column} out of range: {value}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_non_negative() {
        assert_eq!(non_negative("stock", 7).unwrap(), 7);
        assert!(matches!(
            non_negative("stock", -1),
            Err(RepositoryError::DataCorruption(msg)) if msg == "negative stock: -1"
        ));
    }

    #[test]
    fn test_to_integer_rejects_overflow_instead_of_clamping() {
        assert_eq!(to_integer("quantity", 3).unwrap(), 3);
        assert_eq!(to_integer("quantity", 2_147_483_647).unwrap(), i32::MAX);
        assert!(matches!(
            to_integer("quantity", 2_147_483_648),
            Err(RepositoryError::DataCorruption(msg))
                if msg == "quantity out of range: 2147483648"
        ));
    }
}
