//! Delivery window configuration.

use chrono_tz::Tz;
use thiserror::Error;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Invalid delivery window settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryConfigError {
    #[error("delivery window is empty: start {start} must be before end {end}")]
    EmptyWindow { start: String, end: String },
    #[error("delivery window end {0} is past midnight")]
    PastMidnight(String),
    #[error("slot length must be positive")]
    ZeroSlot,
    #[error("slot length of {slot} minutes does not fit in the {window}-minute window")]
    SlotTooLong { slot: u32, window: u32 },
    #[error("invalid time of day: {0} (expected HH:MM)")]
    InvalidClock(String),
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Store delivery window, slot size and booking buffer.
///
/// All minute values count from local midnight in `timezone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    timezone: Tz,
    start_minutes: u32,
    end_minutes: u32,
    slot_minutes: u32,
    buffer_minutes: u32,
}

impl DeliveryConfig {
    /// Build a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryConfigError` if the window is empty or extends past
    /// midnight, or if a zero-length or oversize slot is requested.
    pub fn new(
        timezone: Tz,
        start_minutes: u32,
        end_minutes: u32,
        slot_minutes: u32,
        buffer_minutes: u32,
    ) -> Result<Self, DeliveryConfigError> {
        if end_minutes > MINUTES_PER_DAY {
            return Err(DeliveryConfigError::PastMidnight(format_clock(end_minutes)));
        }
        if start_minutes >= end_minutes {
            return Err(DeliveryConfigError::EmptyWindow {
                start: format_clock(start_minutes),
                end: format_clock(end_minutes),
            });
        }
        if slot_minutes == 0 {
            return Err(DeliveryConfigError::ZeroSlot);
        }
        let window = end_minutes - start_minutes;
        if slot_minutes > window {
            return Err(DeliveryConfigError::SlotTooLong {
                slot: slot_minutes,
                window,
            });
        }

        Ok(Self {
            timezone,
            start_minutes,
            end_minutes,
            slot_minutes,
            buffer_minutes,
        })
    }

    /// Build from the string forms used in environment configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryConfigError` for an unknown IANA zone, a malformed
    /// `HH:MM` value, or any error from [`DeliveryConfig::new`].
    pub fn from_strs(
        timezone: &str,
        start: &str,
        end: &str,
        slot_minutes: u32,
        buffer_minutes: u32,
    ) -> Result<Self, DeliveryConfigError> {
        let tz = timezone
            .parse::<Tz>()
            .map_err(|_| DeliveryConfigError::UnknownTimezone(timezone.to_owned()))?;
        let start_minutes =
            parse_clock(start).ok_or_else(|| DeliveryConfigError::InvalidClock(start.to_owned()))?;
        let end_minutes =
            parse_clock(end).ok_or_else(|| DeliveryConfigError::InvalidClock(end.to_owned()))?;
        Self::new(tz, start_minutes, end_minutes, slot_minutes, buffer_minutes)
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    #[must_use]
    pub const fn start_minutes(&self) -> u32 {
        self.start_minutes
    }

    #[must_use]
    pub const fn end_minutes(&self) -> u32 {
        self.end_minutes
    }

    #[must_use]
    pub const fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    #[must_use]
    pub const fn buffer_minutes(&self) -> u32 {
        self.buffer_minutes
    }

    /// Buffer in milliseconds, the unit conflicts are checked in.
    #[must_use]
    pub fn buffer_millis(&self) -> i64 {
        i64::from(self.buffer_minutes) * 60_000
    }
}

impl Default for DeliveryConfig {
    /// Chisinau, 16:00–21:00, 30-minute slots, 90-minute buffer.
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Chisinau,
            start_minutes: 16 * 60,
            end_minutes: 21 * 60,
            slot_minutes: 30,
            buffer_minutes: 90,
        }
    }
}

/// Parse `HH:MM` into minutes after midnight.
///
/// `24:00` is accepted so a window can close at midnight.
#[must_use]
pub fn parse_clock(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if minutes >= 60 || hours > 24 || (hours == 24 && minutes != 0) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Format minutes after midnight as zero-padded `HH:MM`.
#[must_use]
pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
