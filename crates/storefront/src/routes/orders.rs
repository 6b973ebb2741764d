//! Customer order lookup.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use balloon_boutique_core::{Email, OrderId};

use crate::error::{AppError, Result};
use crate::models::Order;
use crate::services::OrderError;
use crate::state::AppState;

/// Customers prove ownership with the email used at checkout.
#[derive(Debug, Deserialize)]
pub struct OrderLookup {
    pub email: String,
}

/// An order with its items.
///
/// GET /api/orders/{id}?email=...
///
/// # Errors
///
/// Returns `AppError::NotFound` if the order does not exist or the email
/// does not match.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Query(lookup): Query<OrderLookup>,
) -> Result<Json<Order>> {
    let not_found = || AppError::NotFound(format!("Order {id}"));
    let email = Email::parse(&lookup.email).map_err(|_| not_found())?;

    let order = match state.orders().get(id).await {
        Ok(order) => order,
        Err(OrderError::NotFound) => return Err(not_found()),
        Err(err) => return Err(err.into()),
    };
    if !order.email.as_str().eq_ignore_ascii_case(email.as_str()) {
        return Err(not_found());
    }

    Ok(Json(order))
}
