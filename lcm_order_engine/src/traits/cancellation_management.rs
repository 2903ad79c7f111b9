use crate::{
    db_types::{NewOrderCancel, Order, OrderCancel, OrderId, OrderStatusType},
    traits::OrderStoreError,
};

/// Storage side of the cancellation saga.
#[allow(async_fn_in_trait)]
pub trait CancellationManagement {
    async fn fetch_cancel_for_order(&self, order_id: &OrderId) -> Result<Option<OrderCancel>, OrderStoreError>;

    async fn fetch_cancels_for_user(&self, user_id: &str) -> Result<Vec<OrderCancel>, OrderStoreError>;

    /// Records the outcome of a cancellation in one transaction:
    ///
    /// * The order must still exist, belong to `cancel.user_id`, have no cancellation record and be cancellable.
    ///   These are checked again here even if the caller already checked them.
    /// * The order must have no completed payment other than `cancel.payment_id`. Otherwise a payment was verified
    ///   after the caller decided what to refund, and `PaymentChanged` is returned.
    /// * The `order_cancel` row is inserted. A uniqueness violation is reported as `AlreadyCancelled`.
    /// * The order and every one of its items move to `terminal_status`.
    /// * If the refund completed, the refunded payment is marked `Cancelled`.
    /// * If the refund failed, a `RefundFailed` audit entry is written.
    async fn commit_cancellation(
        &self,
        cancel: NewOrderCancel,
        terminal_status: OrderStatusType,
    ) -> Result<(OrderCancel, Order), OrderStoreError>;

    async fn fetch_failed_refunds(&self) -> Result<Vec<OrderCancel>, OrderStoreError>;

    /// Marks a `Failed` refund as `Completed` after it was settled outside the system. The payment is marked
    /// `Cancelled` and a `RefundReconciled` audit entry is written in the same transaction.
    async fn reconcile_refund(
        &self,
        order_id: &OrderId,
        external_cancel_id: Option<String>,
        note: &str,
    ) -> Result<OrderCancel, OrderStoreError>;
}
