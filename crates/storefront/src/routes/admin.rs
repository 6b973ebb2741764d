//! Admin API handlers.
//!
//! Every handler requires the admin bearer token via [`RequireAdmin`].

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use balloon_boutique_core::discount::Discount;
use balloon_boutique_core::{OrderId, OrderStatus};

use crate::db::DiscountRepository;
use crate::db::discounts::NewDiscount;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Order;
use crate::state::AppState;

/// Requested status change.
#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: OrderStatus,
}

/// Move an order through its lifecycle.
///
/// POST /api/admin/orders/{id}/status
///
/// # Errors
///
/// Returns 404 for unknown orders and 422 for illegal transitions.
pub async fn change_status(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Order>> {
    let order = state.orders().change_status(id, change.status).await?;
    Ok(Json(order))
}

/// New delivery time for an order.
#[derive(Debug, Deserialize)]
pub struct Reschedule {
    pub delivery_at: String,
}

/// Move a delivery order to another free slot.
///
/// POST /api/admin/orders/{id}/reschedule
///
/// # Errors
///
/// Returns 404 for unknown orders, 422 for pickup orders or invalid times,
/// and 409 if the order is closed or the slot is taken.
pub async fn reschedule(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(request): Json<Reschedule>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .reschedule(id, &request.delivery_at, Utc::now())
        .await?;
    Ok(Json(order))
}

/// All discounts, newest first.
///
/// GET /api/admin/discounts
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_discounts(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Discount>>> {
    let discounts = DiscountRepository::new(state.pool()).list_all().await?;
    Ok(Json(discounts))
}

/// Create a discount.
///
/// POST /api/admin/discounts
///
/// # Errors
///
/// Returns 422 if the terms are invalid.
pub async fn create_discount(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Json(discount): Json<NewDiscount>,
) -> Result<(StatusCode, Json<Discount>)> {
    discount
        .validate()
        .map_err(|e| AppError::Unprocessable(e.to_string()))?;

    let created = DiscountRepository::new(state.pool())
        .create(&discount)
        .await?;
    state.invalidate_discounts().await;

    tracing::info!(
        discount_id = %created.id,
        scope = ?created.target.scope(),
        percentage = %created.percentage,
        "Discount created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}
