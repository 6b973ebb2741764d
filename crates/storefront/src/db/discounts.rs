//! Discount repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

use balloon_boutique_core::DiscountId;
use balloon_boutique_core::discount::{
    Discount, DiscountError, DiscountScope, DiscountTarget, validate_terms,
};

use super::RepositoryError;

#[derive(sqlx::FromRow)]
struct DiscountRow {
    id: DiscountId,
    name: String,
    scope: DiscountScope,
    target_id: i64,
    percentage: Decimal,
    is_active: bool,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
}

impl From<DiscountRow> for Discount {
    fn from(row: DiscountRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            target: DiscountTarget::from_parts(row.scope, row.target_id),
            percentage: row.percentage,
            is_active: row.is_active,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
        }
    }
}

/// A discount that has not been stored yet.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDiscount {
    pub name: String,
    #[serde(flatten)]
    pub target: DiscountTarget,
    pub percentage: Decimal,
    #[serde(default = "enabled")]
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl NewDiscount {
    /// Check the terms before inserting.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError` if the name, percentage or window is invalid.
    pub fn validate(&self) -> Result<(), DiscountError> {
        validate_terms(&self.name, self.percentage, self.starts_at, self.ends_at)
    }
}

const fn enabled() -> bool {
    true
}

/// Repository for discount operations.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    /// Create a new discount repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Every discount, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Discount>, RepositoryError> {
        let rows = sqlx::query_as::<_, DiscountRow>(
            r"
            SELECT id, name, scope, target_id, percentage, is_active, starts_at, ends_at
            FROM discount
            ORDER BY id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Discount::from).collect())
    }

    /// Discounts with the active flag set.
    ///
    /// The time window is not checked here; callers resolve against their
    /// own clock so cached lists stay correct as windows open and close.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_enabled(&self) -> Result<Vec<Discount>, RepositoryError> {
        let rows = sqlx::query_as::<_, DiscountRow>(
            r"
            SELECT id, name, scope, target_id, percentage, is_active, starts_at, ends_at
            FROM discount
            WHERE is_active
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Discount::from).collect())
    }

    /// Store a new discount.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, discount: &NewDiscount) -> Result<Discount, RepositoryError> {
        let row = sqlx::query_as::<_, DiscountRow>(
            r"
            INSERT INTO discount (name, scope, target_id, percentage, is_active, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, name, scope, target_id, percentage, is_active, starts_at, ends_at
            ",
        )
        .bind(&discount.name)
        .bind(discount.target.scope())
        .bind(discount.target.target_id())
        .bind(discount.percentage)
        .bind(discount.is_active)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
