use thiserror::Error;

use crate::db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType, OrderWithItems, RefundStatus};

/// Errors raised by the local order, payment and cancellation stores.
#[derive(Debug, Clone, Error)]
pub enum OrderStoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Order {0} does not belong to the requesting user")]
    Unauthorized(OrderId),
    #[error("Order {0} has already been cancelled")]
    AlreadyCancelled(OrderId),
    #[error("Order {0} cannot be cancelled while it is {1}")]
    NotCancellable(OrderId, OrderStatusType),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    ForbiddenTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("A payment for transaction {0} has already been recorded")]
    DuplicatePayment(String),
    #[error("Payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Order {0} cannot accept a payment while it is {1}")]
    OrderNotPayable(OrderId, OrderStatusType),
    #[error("Order {0} has already been paid by another transaction")]
    OrderAlreadyPaid(OrderId),
    #[error("The payments of order {0} changed while it was being cancelled")]
    PaymentChanged(OrderId),
    #[error("Order {0} has no cancellation record")]
    CancelNotFound(OrderId),
    #[error("The refund for order {0} is {1}. Only failed refunds can be reconciled")]
    RefundNotFailed(OrderId, RefundStatus),
}

impl From<sqlx::Error> for OrderStoreError {
    fn from(e: sqlx::Error) -> Self {
        OrderStoreError::DatabaseError(e.to_string())
    }
}

/// Storage of orders and their line items.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a priced order and its items in a single transaction. Fails with `OrderAlreadyExists` if the order id is
    /// taken.
    async fn insert_order(&self, order: NewOrder) -> Result<OrderWithItems, OrderStoreError>;

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError>;

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderStoreError>;

    /// All orders placed by the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderStoreError>;

    /// Conditionally moves an order (and its items) to `status`, provided the order is currently in one of the
    /// `allowed_from` states. The check and the update are a single statement, so a concurrent writer cannot slip in
    /// between them.
    ///
    /// Returns `None` if the order was not in an allowed state (or does not exist).
    async fn transition_order_status(
        &self,
        order_id: &OrderId,
        allowed_from: &[OrderStatusType],
        status: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// Moves an order forward along the state machine, as an administrator would. The transition is validated against
    /// [`OrderStatusType::can_transition_to`] inside the same transaction that writes it. Entering `Shipping` stamps the
    /// shipping date, courier and a tracking number.
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
    ) -> Result<Order, OrderStoreError>;
}
