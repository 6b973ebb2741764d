//! Delivery schedule inspection.
//!
//! Prints every slot of a day with its UTC instant and whether it can still
//! be booked, using the same `DELIVERY_*` settings as the storefront.

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use balloon_boutique_core::delivery::{
    AvailableSlot, DeliveryConfig, SlotError, format_clock, parse_instant,
};
use balloon_boutique_storefront::config::{
    ConfigError, database_url_from_env, delivery_config_from_env,
};
use balloon_boutique_storefront::db::{OrderRepository, RepositoryError, create_pool};

/// Arguments of the `slots` command.
#[derive(Debug, Clone)]
pub struct SlotsArgs {
    pub date: String,
    pub now: Option<String>,
    pub booked: Vec<String>,
    pub offline: bool,
}

/// Errors from the `slots` command.
#[derive(Debug, Error)]
pub enum SlotsError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Instant(#[from] SlotError),

    #[error("{0} is not a valid YYYY-MM-DD date")]
    InvalidDate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Print the schedule for `args.date`.
///
/// # Errors
///
/// Returns `SlotsError` for bad arguments, configuration, or database
/// failures.
pub async fn show(args: &SlotsArgs) -> Result<(), SlotsError> {
    let _ = dotenvy::dotenv();
    let config = delivery_config_from_env()?;

    let now = args
        .now
        .as_deref()
        .map(parse_instant)
        .transpose()?
        .unwrap_or_else(Utc::now);

    let mut booked = args
        .booked
        .iter()
        .map(|b| parse_instant(b))
        .collect::<Result<Vec<_>, _>>()?;

    let slots = config.build_slots_for_date(&args.date);
    let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
        return Err(SlotsError::InvalidDate(args.date.clone()));
    };

    if !args.offline {
        let pool = create_pool(&database_url_from_env()?).await?;
        let buffer = TimeDelta::milliseconds(config.buffer_millis());
        let bookings = OrderRepository::new(&pool)
            .bookings_between(first.starts_at - buffer, last.starts_at + buffer)
            .await?;
        tracing::info!(count = bookings.len(), "Loaded bookings");
        booked.extend(bookings.iter().map(|b| b.delivery_at));
    }

    let marked = config.mark_availability(&slots, &booked, now);

    #[allow(clippy::print_stdout)]
    {
        println!("{}", header(&config, &args.date, now));
        for line in render(&marked) {
            println!("{line}");
        }
    }
    Ok(())
}

fn header(config: &DeliveryConfig, date: &str, now: DateTime<Utc>) -> String {
    format!(
        "{date} ({tz}) {start}-{end}, {slot} min slots, {buffer} min buffer, as of {now}",
        tz = config.timezone().name(),
        start = format_clock(config.start_minutes()),
        end = format_clock(config.end_minutes()),
        slot = config.slot_minutes(),
        buffer = config.buffer_minutes(),
        now = now.to_rfc3339(),
    )
}

fn render(slots: &[AvailableSlot]) -> Vec<String> {
    slots
        .iter()
        .map(|s| {
            let state = if s.available { "available" } else { "taken" };
            format!("  {}  {}  {state}", s.slot.label, s.slot.iso())
        })
        .collect()
}
