//! Delivery slot route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use balloon_boutique_core::OrderId;
use balloon_boutique_core::delivery::{AvailableSlot, Slot, format_clock};

use crate::error::Result;
use crate::state::AppState;

/// Query for the slot listing.
#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    /// `YYYY-MM-DD` in the store timezone. Defaults to today.
    pub date: Option<String>,
}

/// Slot listing for one day.
#[derive(Debug, Serialize)]
pub struct SlotsResponse {
    pub date: String,
    pub timezone: String,
    pub window_start: String,
    pub window_end: String,
    pub slots: Vec<AvailableSlot>,
}

/// Delivery slots for a date with availability.
///
/// GET /api/delivery/slots?date=YYYY-MM-DD
///
/// A malformed date returns an empty slot list rather than an error.
///
/// # Errors
///
/// Returns `AppError::Order` if bookings cannot be loaded.
pub async fn slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>> {
    let now = Utc::now();
    let delivery = &state.config().delivery;
    let date = query.date.unwrap_or_else(|| {
        now.with_timezone(&delivery.timezone())
            .date_naive()
            .format("%Y-%m-%d")
            .to_string()
    });

    let slots = state.orders().slot_availability(&date, now).await?;

    Ok(Json(SlotsResponse {
        date,
        timezone: delivery.timezone().name().to_string(),
        window_start: format_clock(delivery.start_minutes()),
        window_end: format_clock(delivery.end_minutes()),
        slots,
    }))
}

/// Request to check a delivery time.
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub delivery_at: String,
    /// Order being rescheduled, whose own booking is ignored.
    pub order_id: Option<OrderId>,
}

/// Confirm a delivery time is still a free slot.
///
/// POST /api/delivery/validate
///
/// # Errors
///
/// Returns 422 for a malformed time or one outside working hours and 409 if
/// the slot is taken or has passed.
pub async fn validate(
    State(state): State<AppState>,
    Json(request): Json<ValidateRequest>,
) -> Result<Json<Slot>> {
    let slot = state
        .orders()
        .validate_slot(&request.delivery_at, request.order_id, Utc::now())
        .await?;
    Ok(Json(slot))
}
