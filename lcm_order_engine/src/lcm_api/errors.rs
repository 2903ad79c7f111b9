use lcm_common::Won;
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType},
    helpers::PricingError,
    traits::{GatewayError, OrderStoreError},
};

/// The error taxonomy of the order engine APIs.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid request: {0}")]
    ValidationError(String),
    /// The transaction was already verified. Verification turns this into an idempotent success.
    #[error("Transaction {0} has already been processed")]
    DuplicatePayment(String),
    #[error("The payment gateway is unavailable. Try again later. {0}")]
    GatewayUnavailable(String),
    #[error("The payment gateway rejected the request. {0}")]
    GatewayRejected(String),
    #[error("The payment has not been completed. Gateway status is {0}")]
    PaymentNotCompleted(String),
    #[error("Payment amount {actual} does not match the order total of {expected}")]
    AmountMismatch { expected: Won, actual: Won },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} cannot accept a payment while it is {1}")]
    OrderNotPayable(OrderId, OrderStatusType),
    #[error("Order {0} has already been paid by another transaction")]
    OrderAlreadyPaid(OrderId),
    #[error("Not authorized to access order {0}")]
    Unauthorized(OrderId),
    #[error("Order {0} has already been cancelled")]
    AlreadyCancelled(OrderId),
    #[error("Order {0} cannot be cancelled while it is {1}")]
    NotCancellable(OrderId, OrderStatusType),
    #[error("The refund for order {0} failed and needs manual reconciliation")]
    RefundFailed(OrderId),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    ForbiddenTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Order {0} has no cancellation record")]
    CancelNotFound(OrderId),
    #[error("Order {0} was modified concurrently. Try again")]
    ConcurrentModification(OrderId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl OrderFlowError {
    /// Errors worth retrying as-is. Everything else needs a different request, or a human.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GatewayUnavailable(_) | Self::ConcurrentModification(_) | Self::DatabaseError(_))
    }
}

impl From<OrderStoreError> for OrderFlowError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::DatabaseError(s) => Self::DatabaseError(s),
            OrderStoreError::OrderNotFound(id) => Self::OrderNotFound(id),
            OrderStoreError::OrderAlreadyExists(id) => Self::ValidationError(format!("Order {id} already exists")),
            OrderStoreError::Unauthorized(id) => Self::Unauthorized(id),
            OrderStoreError::AlreadyCancelled(id) => Self::AlreadyCancelled(id),
            OrderStoreError::NotCancellable(id, status) => Self::NotCancellable(id, status),
            OrderStoreError::ForbiddenTransition { order_id, from, to } => {
                Self::ForbiddenTransition { order_id, from, to }
            },
            OrderStoreError::DuplicatePayment(txid) => Self::DuplicatePayment(txid),
            OrderStoreError::PaymentNotFound(id) => Self::PaymentNotFound(id),
            OrderStoreError::OrderNotPayable(id, status) => Self::OrderNotPayable(id, status),
            OrderStoreError::OrderAlreadyPaid(id) => Self::OrderAlreadyPaid(id),
            OrderStoreError::PaymentChanged(id) => Self::ConcurrentModification(id),
            OrderStoreError::CancelNotFound(id) => Self::CancelNotFound(id),
            OrderStoreError::RefundNotFailed(id, status) => {
                Self::ValidationError(format!("The refund for order {id} is {status}, not FAILED"))
            },
        }
    }
}

impl From<GatewayError> for OrderFlowError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(s) => Self::GatewayUnavailable(s),
            GatewayError::TransactionNotFound(txid) => Self::PaymentNotFound(txid),
            GatewayError::Rejected(s) | GatewayError::Misconfigured(s) => Self::GatewayRejected(s),
        }
    }
}

impl From<PricingError> for OrderFlowError {
    fn from(e: PricingError) -> Self {
        Self::ValidationError(e.to_string())
    }
}
