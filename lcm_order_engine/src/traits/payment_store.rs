use crate::{
    db_types::{NewAuditEntry, NewPayment, OrderId, Payment, PaymentAudit, PaymentStatus},
    traits::OrderStoreError,
};

/// Durable storage for verified payments, keyed by the gateway's transaction id, and the append-only payment audit
/// trail.
///
/// The uniqueness of `external_transaction_id` is what makes payment verification idempotent. Implementations MUST
/// enforce it in storage, and report a violation as [`OrderStoreError::DuplicatePayment`]. They MUST also ensure that
/// an order never holds more than one `Completed` payment.
#[allow(async_fn_in_trait)]
pub trait PaymentStore {
    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, OrderStoreError>;

    async fn fetch_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, OrderStoreError>;

    /// The `Completed` payment recorded against the order, if any.
    async fn fetch_completed_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderStoreError>;

    /// Stores a payment, provided its order can still take one. The checks and the insert happen atomically with
    /// respect to other writers of the same order.
    ///
    /// * `DuplicatePayment` if the transaction has been stored before.
    /// * `OrderNotFound` if the order does not exist.
    /// * `OrderNotPayable` if the order is no longer in a pre-payment state.
    /// * `OrderAlreadyPaid` if the order already holds a completed payment from another transaction.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, OrderStoreError>;

    async fn update_payment_status(&self, payment_id: &str, status: PaymentStatus) -> Result<Payment, OrderStoreError>;

    async fn record_audit(&self, entry: NewAuditEntry) -> Result<PaymentAudit, OrderStoreError>;

    async fn fetch_audit_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentAudit>, OrderStoreError>;
}
