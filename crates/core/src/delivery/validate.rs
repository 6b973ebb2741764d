//! Booking-time slot validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::DeliveryConfig;
use super::slots::Slot;
use crate::types::OrderId;

/// An existing delivery booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub order_id: OrderId,
    pub delivery_at: DateTime<Utc>,
}

/// Why a selected delivery time was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The value is not an RFC 3339 timestamp.
    #[error("invalid delivery time: {0}")]
    InvalidTimestamp(String),

    /// The instant is not the start of any slot on its local day.
    #[error("selected delivery time is outside working hours")]
    OutsideWorkingHours,

    /// The slot is in the past or too close to another booking.
    #[error("selected delivery time {label} is no longer available")]
    Unavailable { label: String },
}

/// Parse a client-supplied RFC 3339 delivery time.
///
/// # Errors
///
/// Returns `SlotError::InvalidTimestamp` if `s` does not parse.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, SlotError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| SlotError::InvalidTimestamp(s.to_owned()))
}

impl DeliveryConfig {
    /// Re-check a customer's selected slot right before it is booked.
    ///
    /// The instant must be the start of one of the slots generated for its
    /// local date, and that slot must still be available against `bookings`.
    /// A booking belonging to `ignore_order` (the order being rescheduled)
    /// does not count against itself.
    ///
    /// # Errors
    ///
    /// Returns `SlotError::InvalidTimestamp` if `selected` does not parse,
    /// `SlotError::OutsideWorkingHours` if it is not a slot start, and
    /// `SlotError::Unavailable` if the slot has passed or conflicts.
    pub fn assert_slot_valid(
        &self,
        selected: &str,
        bookings: &[Booking],
        ignore_order: Option<OrderId>,
        now: DateTime<Utc>,
    ) -> Result<Slot, SlotError> {
        self.assert_instant_valid(parse_instant(selected)?, bookings, ignore_order, now)
    }

    /// [`DeliveryConfig::assert_slot_valid`] for an already-parsed instant.
    ///
    /// # Errors
    ///
    /// Same as [`DeliveryConfig::assert_slot_valid`], minus parsing.
    pub fn assert_instant_valid(
        &self,
        instant: DateTime<Utc>,
        bookings: &[Booking],
        ignore_order: Option<OrderId>,
        now: DateTime<Utc>,
    ) -> Result<Slot, SlotError> {
        let local_day = instant.with_timezone(&self.timezone()).date_naive();
        let target = instant.timestamp_millis();

        let slot = self
            .slots_for_day(local_day)
            .into_iter()
            .find(|s| s.starts_at.timestamp_millis() == target)
            .ok_or(SlotError::OutsideWorkingHours)?;

        let booked: Vec<DateTime<Utc>> = bookings
            .iter()
            .filter(|b| Some(b.order_id) != ignore_order)
            .map(|b| b.delivery_at)
            .collect();

        let available = self
            .mark_availability(std::slice::from_ref(&slot), &booked, now)
            .first()
            .is_some_and(|s| s.available);

        if available {
            Ok(slot)
        } else {
            Err(SlotError::Unavailable { label: slot.label })
        }
    }
}
