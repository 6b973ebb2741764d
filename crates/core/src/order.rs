//! Cart pricing and order totals.
//!
//! Checkout sends a list of cart lines; the server re-prices every line from
//! the catalog and the active discounts so a stale or tampered client total
//! is never trusted.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Product;
use crate::discount::{Discount, resolve_discount};
use crate::types::{DeliveryType, Price, ProductId, SizeId};

/// Largest quantity accepted on a single line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// One cart line as submitted by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub size_id: Option<SizeId>,
    pub quantity: u32,
}

/// A cart line priced by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub size_id: Option<SizeId>,
    pub product_name: String,
    pub size_label: Option<String>,
    pub quantity: u32,
    pub original_unit_price: Price,
    pub unit_price: Price,
    pub discount_percent: Option<Decimal>,
    pub line_total: Price,
}

/// Cart could not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("quantity for product {product_id} must be between 1 and 99, got {quantity}")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },
    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),
    #[error("product {0} is not available")]
    Unavailable(ProductId),
    #[error("product {0} requires a size")]
    SizeRequired(ProductId),
    #[error("product {product_id} has no size {size_id}")]
    UnknownSize { product_id: ProductId, size_id: SizeId },
    #[error("only {available} of product {product_id} left, requested {requested}")]
    OutOfStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },
}

/// Store delivery fee rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryFee {
    pub fee: Price,
    /// Subtotal from which delivery is free.
    pub free_from: Option<Price>,
}

impl DeliveryFee {
    /// Fee owed for an order with `subtotal` received via `delivery_type`.
    #[must_use]
    pub fn for_order(&self, delivery_type: DeliveryType, subtotal: Price) -> Price {
        match delivery_type {
            DeliveryType::Pickup => Price::ZERO,
            DeliveryType::Delivery if self.free_from.is_some_and(|t| subtotal >= t) => Price::ZERO,
            DeliveryType::Delivery => self.fee,
        }
    }
}

/// Priced cart with totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderQuote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
}

/// Price a cart against the catalog and the discounts active at `now`.
///
/// Lines for the same product and size are merged before stock is checked.
///
/// # Errors
///
/// Returns `PricingError` for an empty cart, a bad quantity, an unknown or
/// inactive product, a missing or unknown size, or insufficient stock.
pub fn quote_order(
    lines: &[CartLine],
    products: &[Product],
    discounts: &[Discount],
    delivery_type: DeliveryType,
    fee: DeliveryFee,
    now: DateTime<Utc>,
) -> Result<OrderQuote, PricingError> {
    if lines.is_empty() {
        return Err(PricingError::EmptyCart);
    }

    // BTreeMap keeps the quote in a stable order.
    let mut merged: BTreeMap<(ProductId, Option<SizeId>), u32> = BTreeMap::new();
    for line in lines {
        if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(PricingError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        *merged.entry((line.product_id, line.size_id)).or_default() += line.quantity;
    }

    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let priced = merged
        .into_iter()
        .map(|((product_id, size_id), quantity)| {
            let product = by_id
                .get(&product_id)
                .copied()
                .ok_or(PricingError::UnknownProduct(product_id))?;
            price_line(product, size_id, quantity, discounts, now)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal: Price = priced.iter().map(|l| l.line_total).sum();
    let delivery_fee = fee.for_order(delivery_type, subtotal);

    Ok(OrderQuote {
        lines: priced,
        subtotal,
        delivery_fee,
        total: subtotal + delivery_fee,
    })
}

fn price_line(
    product: &Product,
    size_id: Option<SizeId>,
    quantity: u32,
    discounts: &[Discount],
    now: DateTime<Utc>,
) -> Result<PricedLine, PricingError> {
    if !product.is_active {
        return Err(PricingError::Unavailable(product.id));
    }

    let (base, stock, size_label) = match size_id {
        Some(size_id) => {
            let size = product.size(size_id).ok_or(PricingError::UnknownSize {
                product_id: product.id,
                size_id,
            })?;
            (size.price, size.stock, Some(size.label.clone()))
        }
        None if product.has_sizes() => return Err(PricingError::SizeRequired(product.id)),
        None => (product.price, product.stock, None),
    };

    if quantity > stock {
        return Err(PricingError::OutOfStock {
            product_id: product.id,
            requested: quantity,
            available: stock,
        });
    }

    let discount = resolve_discount(product, discounts, now);
    let unit_price = discount.map_or(base, |d| base.apply_percent_off(d.percentage));

    Ok(PricedLine {
        product_id: product.id,
        size_id,
        product_name: product.name.clone(),
        size_label,
        quantity,
        original_unit_price: base,
        unit_price,
        discount_percent: discount.map(|d| d.percentage),
        line_total: unit_price.times(quantity),
    })
}

/// Invalid pickup/delivery details.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    #[error("delivery orders need a delivery time")]
    MissingDeliveryTime,
    #[error("delivery orders need an address")]
    MissingAddress,
    #[error("pickup orders cannot book a delivery time")]
    PickupWithDeliveryTime,
}

/// How an order reaches the customer, with the details each mode requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fulfillment {
    Pickup,
    Delivery { at: String, address: String },
}

impl Fulfillment {
    /// Combine the loose checkout fields into a consistent fulfillment.
    ///
    /// # Errors
    ///
    /// Returns `FulfillmentError` if a delivery lacks a time or address, or
    /// a pickup carries a delivery time.
    pub fn from_parts(
        delivery_type: DeliveryType,
        delivery_at: Option<&str>,
        address: Option<&str>,
    ) -> Result<Self, FulfillmentError> {
        match delivery_type {
            DeliveryType::Pickup if present(delivery_at).is_some() => {
                Err(FulfillmentError::PickupWithDeliveryTime)
            }
            DeliveryType::Pickup => Ok(Self::Pickup),
            DeliveryType::Delivery => {
                let at = present(delivery_at).ok_or(FulfillmentError::MissingDeliveryTime)?;
                let address = present(address).ok_or(FulfillmentError::MissingAddress)?;
                Ok(Self::Delivery {
                    at: at.to_owned(),
                    address: address.to_owned(),
                })
            }
        }
    }

    #[must_use]
    pub const fn delivery_type(&self) -> DeliveryType {
        match self {
            Self::Pickup => DeliveryType::Pickup,
            Self::Delivery { .. } => DeliveryType::Delivery,
        }
    }
}

fn present(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::catalog::ProductSize;
    use crate::catalog::tests::sample_product;
    use crate::discount::DiscountTarget;
    use crate::types::{CategoryGroupId, DiscountId};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn line(product: i64, size: Option<i64>, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            size_id: size.map(SizeId::new),
            quantity,
        }
    }

    fn sized_product(id: i64) -> Product {
        let mut p = sample_product(id);
        p.sizes = vec![ProductSize {
            id: SizeId::new(100),
            label: "45 cm".to_owned(),
            price: Price::from_minor(20_000),
            stock: 2,
        }];
        p
    }

    fn group_sale() -> Discount {
        Discount {
            id: DiscountId::new(1),
            name: "group sale".to_owned(),
            target: DiscountTarget::Group(CategoryGroupId::new(5)),
            percentage: Decimal::from(10),
            is_active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_quote_applies_discounts_and_merges_lines() {
        let products = vec![sample_product(1), sized_product(2)];
        let lines = [line(1, None, 1), line(2, Some(100), 2), line(1, None, 2)];

        let quote = quote_order(
            &lines,
            &products,
            &[group_sale()],
            DeliveryType::Pickup,
            DeliveryFee::default(),
            now(),
        )
        .unwrap();

        assert_eq!(quote.lines.len(), 2);
        assert_eq!(quote.lines[0].quantity, 3);
        assert_eq!(quote.lines[0].unit_price, Price::from_minor(13_500));
        assert_eq!(quote.lines[0].line_total, Price::from_minor(40_500));
        assert_eq!(quote.lines[1].size_label.as_deref(), Some("45 cm"));
        assert_eq!(quote.lines[1].line_total, Price::from_minor(36_000));
        assert_eq!(quote.subtotal, Price::from_minor(76_500));
        assert_eq!(quote.delivery_fee, Price::ZERO);
        assert_eq!(quote.total, quote.subtotal);
    }

    #[test]
    fn test_delivery_fee_and_threshold() {
        let fee = DeliveryFee {
            fee: Price::from_minor(5_000),
            free_from: Some(Price::from_minor(100_000)),
        };
        let products = vec![sample_product(1)];

        let quote = quote_order(
            &[line(1, None, 1)],
            &products,
            &[],
            DeliveryType::Delivery,
            fee,
            now(),
        )
        .unwrap();
        assert_eq!(quote.delivery_fee, Price::from_minor(5_000));
        assert_eq!(quote.total, Price::from_minor(20_000));

        let quote = quote_order(
            &[line(1, None, 7)],
            &products,
            &[],
            DeliveryType::Delivery,
            fee,
            now(),
        )
        .unwrap();
        assert_eq!(quote.delivery_fee, Price::ZERO);
    }

    #[test]
    fn test_default_fee_is_free_delivery() {
        let fee = DeliveryFee::default();
        assert_eq!(fee.fee, Price::ZERO);
        assert!(fee.free_from.is_none());
        assert_eq!(
            fee.for_order(DeliveryType::Delivery, Price::from_minor(1_000)),
            Price::ZERO
        );
    }

    #[test]
    fn test_pricing_errors() {
        let mut inactive = sample_product(3);
        inactive.is_active = false;
        let products = vec![sample_product(1), sized_product(2), inactive];
        let quote = |lines: &[CartLine]| {
            quote_order(
                lines,
                &products,
                &[],
                DeliveryType::Pickup,
                DeliveryFee::default(),
                now(),
            )
        };

        assert_eq!(quote(&[]), Err(PricingError::EmptyCart));
        assert!(matches!(
            quote(&[line(1, None, 0)]),
            Err(PricingError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            quote(&[line(1, None, 100)]),
            Err(PricingError::InvalidQuantity { .. })
        ));
        assert_eq!(
            quote(&[line(9, None, 1)]),
            Err(PricingError::UnknownProduct(ProductId::new(9)))
        );
        assert_eq!(
            quote(&[line(3, None, 1)]),
            Err(PricingError::Unavailable(ProductId::new(3)))
        );
        assert_eq!(
            quote(&[line(2, None, 1)]),
            Err(PricingError::SizeRequired(ProductId::new(2)))
        );
        assert!(matches!(
            quote(&[line(2, Some(7), 1)]),
            Err(PricingError::UnknownSize { .. })
        ));
        assert_eq!(
            quote(&[line(2, Some(100), 2), line(2, Some(100), 1)]),
            Err(PricingError::OutOfStock {
                product_id: ProductId::new(2),
                requested: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn test_fulfillment_from_parts() {
        assert_eq!(
            Fulfillment::from_parts(DeliveryType::Pickup, None, Some("ignored")),
            Ok(Fulfillment::Pickup)
        );
        assert_eq!(
            Fulfillment::from_parts(DeliveryType::Pickup, Some("2025-06-10T13:00:00Z"), None),
            Err(FulfillmentError::PickupWithDeliveryTime)
        );
        assert_eq!(
            Fulfillment::from_parts(DeliveryType::Delivery, Some("  "), Some("Str. 1")),
            Err(FulfillmentError::MissingDeliveryTime)
        );
        assert_eq!(
            Fulfillment::from_parts(DeliveryType::Delivery, Some("2025-06-10T13:00:00Z"), None),
            Err(FulfillmentError::MissingAddress)
        );

        let delivery = Fulfillment::from_parts(
            DeliveryType::Delivery,
            Some("2025-06-10T13:00:00Z"),
            Some(" Str. Pușkin 1 "),
        )
        .unwrap();
        assert_eq!(delivery.delivery_type(), DeliveryType::Delivery);
        assert_eq!(
            delivery,
            Fulfillment::Delivery {
                at: "2025-06-10T13:00:00Z".to_owned(),
                address: "Str. Pușkin 1".to_owned(),
            }
        );
    }
}
