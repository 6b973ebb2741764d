//! Delivery slot scheduling.
//!
//! The store delivers inside a daily window (e.g. 16:00–21:00) expressed in
//! the store's own timezone. The window is cut into fixed-size slots; each
//! slot is identified by its UTC instant so the result does not depend on the
//! timezone the server happens to run in.
//!
//! A booked delivery blocks every slot whose instant is strictly closer than
//! `buffer_minutes` to it, in both directions. Slots in the past are never
//! offered.
//!
//! ```
//! use balloon_boutique_core::delivery::DeliveryConfig;
//!
//! let config = DeliveryConfig::default();
//! let slots = config.build_slots_for_date("2025-06-10");
//! assert_eq!(slots.first().map(|s| s.label.as_str()), Some("16:00"));
//!
//! // Malformed dates are not an error, just an empty day.
//! assert!(config.build_slots_for_date("10/06/2025").is_empty());
//! ```

mod config;
mod slots;
mod validate;

pub use config::{DeliveryConfig, DeliveryConfigError, format_clock, parse_clock};
pub use slots::{AvailableSlot, Slot, parse_date};
pub use validate::{Booking, SlotError, parse_instant};
