//! Product route handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::Utc;

use balloon_boutique_core::ProductId;
use balloon_boutique_core::catalog::{CatalogEntry, ProductFilter, filter_catalog};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Filtered, sorted catalog with discounted prices.
///
/// GET /api/products?category=&group=&min_price=&max_price=&in_stock=&search=&sort=
///
/// # Errors
///
/// Returns `AppError::Database` if products or discounts cannot be loaded.
pub async fn index(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<CatalogEntry>>> {
    let products = ProductRepository::new(state.pool()).list_active().await?;
    let discounts = state.active_discounts().await?;

    Ok(Json(filter_catalog(products, &discounts, &filter, Utc::now())))
}

/// A single product with its resolved discount and effective price.
///
/// GET /api/products/{id}
///
/// # Errors
///
/// Returns `AppError::NotFound` for unknown or inactive products.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<CatalogEntry>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Product {id}")))?;
    let discounts = state.active_discounts().await?;

    Ok(Json(CatalogEntry::new(product, &discounts, Utc::now())))
}
