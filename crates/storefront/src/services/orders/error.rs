//! Order error types.

use thiserror::Error;

use balloon_boutique_core::delivery::SlotError;
use balloon_boutique_core::order::{FulfillmentError, PricingError};
use balloon_boutique_core::{EmailError, OrderStatus, StatusTransitionError};

use crate::db::RepositoryError;

/// Errors that can occur while placing or managing orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// A required checkout field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Cart could not be priced.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Pickup/delivery details are inconsistent.
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    /// Selected delivery slot was rejected.
    #[error(transparent)]
    Slot(#[from] SlotError),

    /// Illegal status change.
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    /// Order not found.
    #[error("order not found")]
    NotFound,

    /// Only delivery orders have a slot to move.
    #[error("order is not a delivery order")]
    NotDelivery,

    /// The order can no longer be changed.
    #[error("order is already {0}")]
    Closed(OrderStatus),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
