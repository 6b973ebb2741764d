//! Order service.
//!
//! Checkout, rescheduling and status changes. Every path that books a
//! delivery slot runs in one transaction behind the schedule advisory lock,
//! so two customers racing for neighbouring slots cannot both succeed.

mod error;

pub use error::OrderError;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use balloon_boutique_core::delivery::{AvailableSlot, DeliveryConfig, Slot, parse_instant};
use balloon_boutique_core::discount::Discount;
use balloon_boutique_core::order::{CartLine, DeliveryFee, Fulfillment, quote_order};
use balloon_boutique_core::{DeliveryType, Email, OrderId, OrderStatus, PaymentMethod, ProductId};

use crate::db::{OrderRepository, ProductRepository};
use crate::models::{NewOrder, Order};

/// Checkout request as submitted by the customer.
#[derive(Debug, Clone, Deserialize)]
pub struct Checkout {
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub delivery_type: DeliveryType,
    /// RFC 3339 slot instant, required for delivery.
    pub delivery_at: Option<String>,
    pub delivery_address: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub items: Vec<CartLine>,
}

impl Checkout {
    /// Check contact and fulfillment details.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidEmail` or `OrderError::MissingField` for
    /// bad contact details and `OrderError::Fulfillment` for inconsistent
    /// delivery fields.
    pub fn validate(self) -> Result<ValidCheckout, OrderError> {
        let email = Email::parse(&self.email)?;
        let customer_name = required(&self.customer_name, "customer_name")?;
        let phone = required(&self.phone, "phone")?;
        let fulfillment = Fulfillment::from_parts(
            self.delivery_type,
            self.delivery_at.as_deref(),
            self.delivery_address.as_deref(),
        )?;

        Ok(ValidCheckout {
            customer_name,
            email,
            phone,
            fulfillment,
            payment_method: self.payment_method,
            notes: self
                .notes
                .map(|n| n.trim().to_owned())
                .filter(|n| !n.is_empty()),
            items: self.items,
        })
    }
}

/// A checkout whose contact and fulfillment details are consistent.
#[derive(Debug, Clone)]
pub struct ValidCheckout {
    pub customer_name: String,
    pub email: Email,
    pub phone: String,
    pub fulfillment: Fulfillment,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub items: Vec<CartLine>,
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    delivery: &'a DeliveryConfig,
    fee: DeliveryFee,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, delivery: &'a DeliveryConfig, fee: DeliveryFee) -> Self {
        Self {
            pool,
            delivery,
            fee,
        }
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    pub async fn get(&self, id: OrderId) -> Result<Order, OrderError> {
        OrderRepository::new(self.pool)
            .get(id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    /// Delivery slots for a `YYYY-MM-DD` date with their availability.
    ///
    /// A malformed date yields an empty list without touching the database.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if bookings cannot be loaded.
    pub async fn slot_availability(
        &self,
        date: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<AvailableSlot>, OrderError> {
        let slots = self.delivery.build_slots_for_date(date);
        let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
            return Ok(Vec::new());
        };

        let buffer = self.buffer();
        let bookings = OrderRepository::new(self.pool)
            .bookings_between(first.starts_at - buffer, last.starts_at + buffer)
            .await?;
        let booked: Vec<DateTime<Utc>> = bookings.iter().map(|b| b.delivery_at).collect();

        Ok(self.delivery.mark_availability(&slots, &booked, now))
    }

    /// Check a delivery time without booking it.
    ///
    /// Passing `order_id` lets an order being rescheduled ignore its own
    /// current booking.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Slot` if the time is not a free slot.
    pub async fn validate_slot(
        &self,
        selected: &str,
        order_id: Option<OrderId>,
        now: DateTime<Utc>,
    ) -> Result<Slot, OrderError> {
        let instant = parse_instant(selected)?;
        let (from, to) = self.conflict_window(instant);
        let bookings = OrderRepository::new(self.pool)
            .bookings_between(from, to)
            .await?;
        Ok(self
            .delivery
            .assert_instant_valid(instant, &bookings, order_id, now)?)
    }

    /// Price the cart, book the slot, take stock and store the order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Pricing` if the cart cannot be priced,
    /// `OrderError::Slot` if the delivery time is not free, and
    /// `OrderError::Repository` if stock ran out concurrently or the
    /// database fails.
    #[instrument(skip(self, checkout, discounts), fields(items = checkout.items.len()))]
    pub async fn place_order(
        &self,
        checkout: ValidCheckout,
        discounts: &[Discount],
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let ValidCheckout {
            customer_name,
            email,
            phone,
            fulfillment,
            payment_method,
            notes,
            items,
        } = checkout;

        let mut product_ids: Vec<ProductId> = items.iter().map(|l| l.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let products = ProductRepository::new(self.pool)
            .get_many(&product_ids)
            .await?;
        let quote = quote_order(
            &items,
            &products,
            discounts,
            fulfillment.delivery_type(),
            self.fee,
            now,
        )?;

        let delivery_type = fulfillment.delivery_type();
        let mut tx = self.pool.begin().await?;

        let (delivery_at, delivery_address) = match fulfillment {
            Fulfillment::Pickup => (None, None),
            Fulfillment::Delivery { at, address } => {
                let instant = parse_instant(&at)?;
                OrderRepository::lock_schedule(&mut tx).await?;
                let (from, to) = self.conflict_window(instant);
                let bookings = OrderRepository::bookings_between_tx(&mut tx, from, to).await?;
                let slot = self
                    .delivery
                    .assert_instant_valid(instant, &bookings, None, now)?;
                (Some(slot.starts_at), Some(address))
            }
        };

        for line in &quote.lines {
            ProductRepository::reserve_stock(&mut tx, line.product_id, line.size_id, line.quantity)
                .await?;
        }

        let order = OrderRepository::insert(
            &mut tx,
            &NewOrder {
                customer_name,
                email,
                phone,
                delivery_type,
                delivery_at,
                delivery_address,
                payment_method,
                notes,
                quote,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            total = %order.total,
            delivery_at = ?order.delivery_at,
            "Order placed"
        );
        Ok(order)
    }

    /// Move a delivery order to another slot.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound`, `OrderError::NotDelivery`,
    /// `OrderError::Closed` for delivered or canceled orders, and
    /// `OrderError::Slot` if the new time is not free.
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        id: OrderId,
        selected: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let instant = parse_instant(selected)?;

        let mut tx = self.pool.begin().await?;
        OrderRepository::lock_schedule(&mut tx).await?;

        let order = OrderRepository::get_for_update(&mut tx, id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if order.delivery_type != DeliveryType::Delivery {
            return Err(OrderError::NotDelivery);
        }
        if order.status.is_terminal() {
            return Err(OrderError::Closed(order.status));
        }

        let (from, to) = self.conflict_window(instant);
        let bookings = OrderRepository::bookings_between_tx(&mut tx, from, to).await?;
        let slot = self
            .delivery
            .assert_instant_valid(instant, &bookings, Some(id), now)?;

        OrderRepository::update_delivery_at(&mut tx, id, slot.starts_at).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, delivery_at = %slot.iso(), "Order rescheduled");
        self.get(id).await
    }

    /// Apply a status transition. Canceling returns the items to stock and
    /// frees the delivery slot.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist and
    /// `OrderError::Transition` if the lifecycle does not allow the change.
    #[instrument(skip(self))]
    pub async fn change_status(&self, id: OrderId, next: OrderStatus) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_for_update(&mut tx, id)
            .await?
            .ok_or(OrderError::NotFound)?;
        let next = order.status.transition(next)?;

        if next == OrderStatus::Canceled {
            for item in &order.items {
                ProductRepository::release_stock(
                    &mut tx,
                    item.product_id,
                    item.size_id,
                    item.quantity,
                )
                .await?;
            }
        }

        OrderRepository::update_status(&mut tx, id, next).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, from = %order.status, to = %next, "Order status changed");
        self.get(id).await
    }

    fn buffer(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.delivery.buffer_millis())
    }

    /// Bookings outside this window cannot conflict with `instant`.
    fn conflict_window(&self, instant: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let buffer = self.buffer();
        (instant - buffer, instant + buffer)
    }
}

fn required(value: &str, field: &'static str) -> Result<String, OrderError> {
    let value = value.trim();
    if value.is_empty() {
        Err(OrderError::MissingField(field))
    } else {
        Ok(value.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_and_rejects_blank() {
        assert_eq!(required("  Ana  ", "customer_name").unwrap(), "Ana");
        assert!(matches!(
            required("   ", "phone"),
            Err(OrderError::MissingField("phone"))
        ));
    }

    #[test]
    fn test_checkout_deserializes() {
        let checkout: Checkout = serde_json::from_value(serde_json::json!({
            "customer_name": "Ana",
            "email": "ana@example.md",
            "phone": "+37360000000",
            "delivery_type": "delivery",
            "delivery_at": "2025-06-10T15:00:00.000Z",
            "delivery_address": "Str. Pușkin 1",
            "payment_method": "cash",
            "items": [{ "product_id": 1, "size_id": null, "quantity": 2 }]
        }))
        .unwrap();

        assert_eq!(checkout.delivery_type, DeliveryType::Delivery);
        assert_eq!(checkout.payment_method, PaymentMethod::Cash);
        assert_eq!(checkout.items.len(), 1);
        assert!(checkout.notes.is_none());

        let valid = checkout.validate().unwrap();
        assert_eq!(valid.fulfillment.delivery_type(), DeliveryType::Delivery);
        assert_eq!(valid.email.as_str(), "ana@example.md");
    }

    #[test]
    fn test_validate_checks_contact_and_fulfillment() {
        let checkout = Checkout {
            customer_name: "Ana".to_owned(),
            email: "ana@example.md".to_owned(),
            phone: "  ".to_owned(),
            delivery_type: DeliveryType::Pickup,
            delivery_at: None,
            delivery_address: None,
            payment_method: PaymentMethod::Card,
            notes: Some("  ".to_owned()),
            items: Vec::new(),
        };
        assert!(matches!(
            checkout.clone().validate(),
            Err(OrderError::MissingField("phone"))
        ));

        let pickup = Checkout {
            phone: "+37360000000".to_owned(),
            ..checkout.clone()
        }
        .validate()
        .unwrap();
        assert_eq!(pickup.fulfillment, Fulfillment::Pickup);
        assert!(pickup.notes.is_none());

        let bad_email = Checkout {
            email: "ana".to_owned(),
            ..checkout
        };
        assert!(matches!(
            bad_email.validate(),
            Err(OrderError::InvalidEmail(_))
        ));
    }
}
