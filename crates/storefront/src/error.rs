//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//! Error bodies are JSON: `{ "error": "message" }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use balloon_boutique_core::delivery::SlotError;
use balloon_boutique_core::order::PricingError;

use crate::db::RepositoryError;
use crate::services::OrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or wrong admin token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request that fails validation.
    #[error("Validation failed: {0}")]
    Unprocessable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Order(err) => order_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Server-side failures are not described.
    fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Order(OrderError::Repository(err)) | Self::Database(err) => match err {
                RepositoryError::NotFound => "Not found".to_string(),
                other => other.to_string(),
            },
            Self::Order(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg)
            | Self::BadRequest(msg)
            | Self::Unprocessable(msg)
            | Self::Internal(msg) => msg.clone(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

const fn order_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::InvalidEmail(_) | OrderError::MissingField(_) | OrderError::Fulfillment(_) => {
            StatusCode::BAD_REQUEST
        }
        OrderError::Pricing(PricingError::OutOfStock { .. })
        | OrderError::Slot(SlotError::Unavailable { .. })
        | OrderError::Closed(_) => StatusCode::CONFLICT,
        OrderError::Pricing(_)
        | OrderError::Slot(_)
        | OrderError::Transition(_)
        | OrderError::NotDelivery => StatusCode::UNPROCESSABLE_ENTITY,
        OrderError::NotFound => StatusCode::NOT_FOUND,
        OrderError::Repository(err) => repository_status(err),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(serde_json::json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Order placed", Some(&[("order_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use balloon_boutique_core::{OrderStatus, ProductId, StatusTransitionError};

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("stock".into()))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_slot_errors_map_to_422_and_409() {
        let outside = AppError::from(OrderError::Slot(SlotError::OutsideWorkingHours));
        assert_eq!(get_status(outside), StatusCode::UNPROCESSABLE_ENTITY);

        let garbage = AppError::from(OrderError::Slot(SlotError::InvalidTimestamp("x".into())));
        assert_eq!(get_status(garbage), StatusCode::UNPROCESSABLE_ENTITY);

        let taken = AppError::from(OrderError::Slot(SlotError::Unavailable {
            label: "18:00".into(),
        }));
        assert_eq!(get_status(taken), StatusCode::CONFLICT);
    }

    #[test]
    fn test_order_errors() {
        let out_of_stock = AppError::from(OrderError::Pricing(PricingError::OutOfStock {
            product_id: ProductId::new(1),
            requested: 3,
            available: 1,
        }));
        assert_eq!(get_status(out_of_stock), StatusCode::CONFLICT);

        let transition = AppError::from(OrderError::Transition(StatusTransitionError {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        }));
        assert_eq!(get_status(transition), StatusCode::UNPROCESSABLE_ENTITY);

        assert_eq!(
            get_status(AppError::from(OrderError::MissingField("phone"))),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_error_body_is_json_and_hides_internals() {
        let response =
            AppError::Database(RepositoryError::DataCorruption("secret".into())).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");

        let response = AppError::from(OrderError::Slot(SlotError::Unavailable {
            label: "18:00".into(),
        }))
        .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body["error"],
            "selected delivery time 18:00 is no longer available"
        );
    }
}
