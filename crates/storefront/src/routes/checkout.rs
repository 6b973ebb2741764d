//! Checkout route handler.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::error::{Result, add_breadcrumb};
use crate::models::Order;
use crate::services::Checkout;
use crate::state::AppState;

/// Place an order.
///
/// POST /api/checkout
///
/// Prices are recomputed server-side; the delivery slot is re-validated and
/// booked inside the same transaction that stores the order.
///
/// # Errors
///
/// Returns 400 for bad contact or fulfillment details, 422 for an unpriceable
/// cart or invalid delivery time, and 409 when stock or the slot is gone.
pub async fn create(
    State(state): State<AppState>,
    Json(checkout): Json<Checkout>,
) -> Result<(StatusCode, Json<Order>)> {
    let checkout = checkout.validate()?;
    let discounts = state.active_discounts().await?;
    let order = state
        .orders()
        .place_order(checkout, &discounts, Utc::now())
        .await?;

    let order_id = order.id.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
    Ok((StatusCode::CREATED, Json(order)))
}
