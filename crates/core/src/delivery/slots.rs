//! Slot generation and availability marking.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::config::{DeliveryConfig, format_clock};

/// One delivery slot on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Minutes after local midnight.
    pub minutes: u32,
    /// Local wall-clock start, `HH:MM`.
    pub label: String,
    /// UTC instant of the slot start.
    #[serde(rename = "iso", with = "iso_millis")]
    pub starts_at: DateTime<Utc>,
}

impl Slot {
    /// RFC 3339 UTC form with milliseconds, e.g. `2025-06-10T13:00:00.000Z`.
    #[must_use]
    pub fn iso(&self) -> String {
        iso_millis::format(&self.starts_at)
    }
}

/// A slot annotated with whether it can still be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableSlot {
    #[serde(flatten)]
    pub slot: Slot,
    pub available: bool,
}

/// Parse a strict `YYYY-MM-DD` calendar date.
///
/// Returns `None` for anything else, including valid-looking but impossible
/// dates such as `2025-02-30`.
#[must_use]
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    let well_formed = date.len() == 10
        && date.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return None;
    }
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

impl DeliveryConfig {
    /// Generate the slots for a `YYYY-MM-DD` date in the store timezone.
    ///
    /// A malformed date yields an empty list rather than an error, so callers
    /// can render "no slots" without special handling.
    #[must_use]
    pub fn build_slots_for_date(&self, date: &str) -> Vec<Slot> {
        parse_date(date).map_or_else(Vec::new, |day| self.slots_for_day(day))
    }

    /// Generate the slots for a calendar day in the store timezone.
    ///
    /// Wall-clock times skipped by a spring-forward transition have no
    /// instant and produce no slot.
    #[must_use]
    pub fn slots_for_day(&self, day: NaiveDate) -> Vec<Slot> {
        let last_start = self.end_minutes() - self.slot_minutes();
        (self.start_minutes()..=last_start)
            .step_by(self.slot_minutes() as usize)
            .filter_map(|minutes| {
                let local = day.and_hms_opt(minutes / 60, minutes % 60, 0)?;
                Some(Slot {
                    minutes,
                    label: format_clock(minutes),
                    starts_at: self.local_to_utc(local)?,
                })
            })
            .collect()
    }

    /// Resolve a store-local wall-clock time to a UTC instant.
    ///
    /// Repeated times (autumn fall-back) resolve to the earlier instant.
    /// Skipped times (spring-forward gap) return `None`.
    #[must_use]
    pub fn local_to_utc(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.timezone()
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Mark each slot available or not.
    ///
    /// A slot is unavailable when it starts before `now`, or when any booked
    /// instant is strictly less than the buffer away from it.
    #[must_use]
    pub fn mark_availability(
        &self,
        slots: &[Slot],
        booked: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> Vec<AvailableSlot> {
        let buffer = self.buffer_millis();
        slots
            .iter()
            .map(|slot| {
                let in_future = slot.starts_at >= now;
                let clear = booked
                    .iter()
                    .all(|b| (slot.starts_at - *b).num_milliseconds().abs() >= buffer);
                AvailableSlot {
                    slot: slot.clone(),
                    available: in_future && clear,
                }
            })
            .collect()
    }

    /// Slots for a date with availability against `booked`.
    #[must_use]
    pub fn availability_for_date(
        &self,
        date: &str,
        booked: &[DateTime<Utc>],
        now: DateTime<Utc>,
    ) -> Vec<AvailableSlot> {
        self.mark_availability(&self.build_slots_for_date(date), booked, now)
    }
}

pub(crate) mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
