use uuid::Uuid;
use crate::order::OrderStatus;

#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid order identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Order {order_id} is no longer PENDING, refusing transition to {to}")]
    InvalidTransition {
        order_id: Uuid,
        to: OrderStatus,
    },

    #[error("Webhook notification failed: {0}")]
    Notification(String),
}

impl PayoutError {
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn notification(err: impl std::fmt::Display) -> Self {
        Self::Notification(err.to_string())
    }
}

pub type PayoutResult<T> = Result<T, PayoutError>;
