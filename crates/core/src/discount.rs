//! Percentage discounts and precedence resolution.
//!
//! A discount targets one product, one category group, or one category.
//! When several active discounts apply to a product, the most specific scope
//! wins (product > group > category) and, within that scope, the largest
//! percentage.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::types::{CategoryGroupId, CategoryId, DiscountId, Price, ProductId};

/// Entity class a discount applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "discount_scope", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountScope {
    Product,
    Group,
    Category,
}

/// The entity a discount targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "target_id", rename_all = "snake_case")]
pub enum DiscountTarget {
    Product(ProductId),
    Group(CategoryGroupId),
    Category(CategoryId),
}

impl DiscountTarget {
    /// Rebuild a target from its stored `(scope, id)` pair.
    #[must_use]
    pub const fn from_parts(scope: DiscountScope, id: i64) -> Self {
        match scope {
            DiscountScope::Product => Self::Product(ProductId::new(id)),
            DiscountScope::Group => Self::Group(CategoryGroupId::new(id)),
            DiscountScope::Category => Self::Category(CategoryId::new(id)),
        }
    }

    #[must_use]
    pub const fn scope(&self) -> DiscountScope {
        match self {
            Self::Product(_) => DiscountScope::Product,
            Self::Group(_) => DiscountScope::Group,
            Self::Category(_) => DiscountScope::Category,
        }
    }

    #[must_use]
    pub const fn target_id(&self) -> i64 {
        match self {
            Self::Product(id) => id.as_i64(),
            Self::Group(id) => id.as_i64(),
            Self::Category(id) => id.as_i64(),
        }
    }

    fn applies_to(&self, product: &Product) -> bool {
        match self {
            Self::Product(id) => *id == product.id,
            Self::Group(id) => product.group_id == Some(*id),
            Self::Category(id) => product.category_ids.contains(id),
        }
    }
}

/// Invalid discount definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscountError {
    #[error("discount name cannot be empty")]
    EmptyName,
    #[error("percentage must be greater than 0 and at most 100, got {0}")]
    PercentageOutOfRange(Decimal),
    #[error("discount window ends before it starts")]
    InvertedWindow,
}

/// A percentage discount with an optional active window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub name: String,
    #[serde(flatten)]
    pub target: DiscountTarget,
    pub percentage: Decimal,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Discount {
    /// Check the definition before it is stored.
    ///
    /// # Errors
    ///
    /// Returns `DiscountError` for an empty name, a percentage outside
    /// `(0, 100]`, or an `ends_at` earlier than `starts_at`.
    pub fn validate(&self) -> Result<(), DiscountError> {
        validate_terms(&self.name, self.percentage, self.starts_at, self.ends_at)
    }

    /// Whether the discount is switched on and `now` is inside its window.
    ///
    /// Both window bounds are inclusive; a missing bound is open.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now <= end)
    }
}

/// Check discount terms before they are stored.
///
/// # Errors
///
/// Returns `DiscountError` for an empty name, a percentage outside
/// `(0, 100]`, or an `ends_at` earlier than `starts_at`.
pub fn validate_terms(
    name: &str,
    percentage: Decimal,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
) -> Result<(), DiscountError> {
    if name.trim().is_empty() {
        return Err(DiscountError::EmptyName);
    }
    if percentage <= Decimal::ZERO || percentage > Decimal::ONE_HUNDRED {
        return Err(DiscountError::PercentageOutOfRange(percentage));
    }
    if let (Some(start), Some(end)) = (starts_at, ends_at)
        && end < start
    {
        return Err(DiscountError::InvertedWindow);
    }
    Ok(())
}

/// Pick the discount that applies to `product` at `now`, if any.
#[must_use]
pub fn resolve_discount<'a>(
    product: &Product,
    discounts: &'a [Discount],
    now: DateTime<Utc>,
) -> Option<&'a Discount> {
    discounts
        .iter()
        .filter(|d| d.is_active_at(now) && d.target.applies_to(product))
        .min_by(|a, b| {
            a.target
                .scope()
                .cmp(&b.target.scope())
                .then_with(|| b.percentage.cmp(&a.percentage))
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Summary of the discount used for a price, as shown to customers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub id: DiscountId,
    pub name: String,
    pub scope: DiscountScope,
    pub percentage: Decimal,
}

impl From<&Discount> for AppliedDiscount {
    fn from(d: &Discount) -> Self {
        Self {
            id: d.id,
            name: d.name.clone(),
            scope: d.target.scope(),
            percentage: d.percentage,
        }
    }
}

/// A base price and the price after discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePrice {
    pub base: Price,
    pub price: Price,
    pub discount: Option<AppliedDiscount>,
}

impl EffectivePrice {
    /// Apply an optional discount to a base price.
    #[must_use]
    pub fn new(base: Price, discount: Option<&Discount>) -> Self {
        match discount {
            Some(d) => Self {
                base,
                price: base.apply_percent_off(d.percentage),
                discount: Some(AppliedDiscount::from(d)),
            },
            None => Self {
                base,
                price: base,
                discount: None,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_product;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn discount(id: i64, target: DiscountTarget, pct: i64) -> Discount {
        Discount {
            id: DiscountId::new(id),
            name: format!("promo {id}"),
            target,
            percentage: Decimal::from(pct),
            is_active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        utc("2025-06-10T12:00:00Z")
    }

    #[test]
    fn test_product_beats_group_beats_category() {
        let product = sample_product(1);
        let discounts = vec![
            discount(1, DiscountTarget::Category(CategoryId::new(10)), 50),
            discount(2, DiscountTarget::Group(CategoryGroupId::new(5)), 30),
            discount(3, DiscountTarget::Product(ProductId::new(1)), 10),
        ];

        let chosen = resolve_discount(&product, &discounts, now()).unwrap();
        assert_eq!(chosen.id, DiscountId::new(3));

        let chosen = resolve_discount(&product, &discounts[..2], now()).unwrap();
        assert_eq!(chosen.id, DiscountId::new(2));

        let chosen = resolve_discount(&product, &discounts[..1], now()).unwrap();
        assert_eq!(chosen.id, DiscountId::new(1));
    }

    #[test]
    fn test_highest_percentage_within_scope() {
        let product = sample_product(1);
        let discounts = vec![
            discount(1, DiscountTarget::Category(CategoryId::new(10)), 15),
            discount(2, DiscountTarget::Category(CategoryId::new(11)), 25),
        ];
        let chosen = resolve_discount(&product, &discounts, now()).unwrap();
        assert_eq!(chosen.id, DiscountId::new(2));
    }

    #[test]
    fn test_ignores_other_targets() {
        let product = sample_product(1);
        let discounts = vec![
            discount(1, DiscountTarget::Product(ProductId::new(2)), 40),
            discount(2, DiscountTarget::Group(CategoryGroupId::new(6)), 40),
            discount(3, DiscountTarget::Category(CategoryId::new(99)), 40),
        ];
        assert!(resolve_discount(&product, &discounts, now()).is_none());
    }

    #[test]
    fn test_inactive_or_out_of_window_falls_through() {
        let product = sample_product(1);
        let mut expired = discount(1, DiscountTarget::Product(ProductId::new(1)), 20);
        expired.ends_at = Some(utc("2025-06-09T23:59:59Z"));
        let mut scheduled = discount(2, DiscountTarget::Product(ProductId::new(1)), 20);
        scheduled.starts_at = Some(utc("2025-06-11T00:00:00Z"));
        let mut disabled = discount(3, DiscountTarget::Product(ProductId::new(1)), 20);
        disabled.is_active = false;
        let fallback = discount(4, DiscountTarget::Category(CategoryId::new(10)), 5);

        let discounts = vec![expired, scheduled, disabled, fallback];
        let chosen = resolve_discount(&product, &discounts, now()).unwrap();
        assert_eq!(chosen.id, DiscountId::new(4));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let mut d = discount(1, DiscountTarget::Product(ProductId::new(1)), 20);
        d.starts_at = Some(now());
        d.ends_at = Some(now());
        assert!(d.is_active_at(now()));
    }

    #[test]
    fn test_validate() {
        let mut d = discount(1, DiscountTarget::Product(ProductId::new(1)), 20);
        assert!(d.validate().is_ok());

        d.percentage = Decimal::ZERO;
        assert!(matches!(
            d.validate(),
            Err(DiscountError::PercentageOutOfRange(_))
        ));

        d.percentage = Decimal::from(101);
        assert!(d.validate().is_err());

        d.percentage = Decimal::ONE_HUNDRED;
        d.starts_at = Some(utc("2025-06-10T00:00:00Z"));
        d.ends_at = Some(utc("2025-06-01T00:00:00Z"));
        assert_eq!(d.validate(), Err(DiscountError::InvertedWindow));
    }

    #[test]
    fn test_effective_price() {
        let d = discount(1, DiscountTarget::Product(ProductId::new(1)), 20);
        let pricing = EffectivePrice::new(Price::from_minor(15_000), Some(&d));
        assert_eq!(pricing.price, Price::from_minor(12_000));
        assert_eq!(pricing.discount.unwrap().scope, DiscountScope::Product);

        let plain = EffectivePrice::new(Price::from_minor(15_000), None);
        assert_eq!(plain.price, plain.base);
    }

    #[test]
    fn test_target_serde_shape() {
        let d = discount(7, DiscountTarget::Group(CategoryGroupId::new(5)), 10);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["scope"], "group");
        assert_eq!(json["target_id"], 5);
    }
}
