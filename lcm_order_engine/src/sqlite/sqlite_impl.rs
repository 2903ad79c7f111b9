//! `SqliteDatabase` is a concrete implementation of an order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the storage traits defined in the [`traits`]
//! module.
use std::fmt::Debug;

use chrono::Utc;
use lcm_common::Won;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{audit, cancels, db_url, new_pool, orders, payments};
use crate::{
    db_types::{
        AuditKind,
        NewAuditEntry,
        NewOrder,
        NewOrderCancel,
        NewPayment,
        Order,
        OrderCancel,
        OrderId,
        OrderItem,
        OrderStatusType,
        OrderWithItems,
        Payment,
        PaymentAudit,
        PaymentStatus,
        RefundStatus,
    },
    traits::{CancellationManagement, OrderManagement, OrderStoreError, PaymentStore},
};

/// The courier assigned to every shipment.
pub const DEFAULT_DELIVERY_COMPANY: &str = "한진택배";

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<OrderWithItems, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let saved = orders::insert_order(&order, &mut tx).await?;
        let mut items = Vec::with_capacity(order.items.len());
        for item in order.items {
            items.push(orders::insert_item(&saved.order_id, item, &mut tx).await?);
        }
        tx.commit().await?;
        debug!("🗃️ Order {} with {} items has been saved in the DB", saved.order_id, items.len());
        Ok(OrderWithItems { order: saved, items })
    }

    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn transition_order_status(
        &self,
        order_id: &OrderId,
        allowed_from: &[OrderStatusType],
        status: OrderStatusType,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::transition_status(order_id, allowed_from, status, &mut tx).await?;
        if order.is_some() {
            let n = orders::update_items_status(order_id, status, &mut tx).await?;
            trace!("🗃️ {n} items of order {order_id} moved to {status}");
        }
        tx.commit().await?;
        Ok(order)
    }

    async fn update_order_status(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
    ) -> Result<Order, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(order_id, &mut tx).await? {
            return Err(OrderStoreError::OrderNotFound(order_id.clone()));
        }
        let order =
            orders::fetch_order(order_id, &mut tx).await?.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        let from = order.order_status;
        if !from.can_transition_to(status) {
            return Err(OrderStoreError::ForbiddenTransition { order_id: order_id.clone(), from, to: status });
        }
        let mut updated = orders::transition_status(order_id, &[from], status, &mut tx)
            .await?
            .ok_or_else(|| OrderStoreError::ForbiddenTransition { order_id: order_id.clone(), from, to: status })?;
        orders::update_items_status(order_id, status, &mut tx).await?;
        if status == OrderStatusType::Shipping {
            let now = Utc::now();
            let tracking_number = format!("TRK{}", now.timestamp_millis());
            updated =
                orders::set_shipping_details(order_id, now, &tracking_number, DEFAULT_DELIVERY_COMPANY, &mut tx).await?;
            debug!("🗃️ Order {order_id} shipped with tracking number {tracking_number}");
        }
        tx.commit().await?;
        info!("🗃️ Order {order_id} status changed from {from} to {status}");
        Ok(updated)
    }
}

impl PaymentStore for SqliteDatabase {
    async fn fetch_payment(&self, payment_id: &str) -> Result<Option<Payment>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment(payment_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_payment_by_external_id(&self, external_id: &str) -> Result<Option<Payment>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_payment_by_external_id(external_id, &mut conn).await?;
        Ok(payment)
    }

    async fn fetch_completed_payment_for_order(&self, order_id: &OrderId) -> Result<Option<Payment>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::fetch_completed_payment_for_order(order_id, &mut conn).await?;
        Ok(payment)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, OrderStoreError> {
        let order_id = payment.order_id.clone();
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(&order_id, &mut tx).await? {
            return Err(OrderStoreError::OrderNotFound(order_id));
        }
        if payments::fetch_payment_by_external_id(&payment.external_transaction_id, &mut tx).await?.is_some() {
            return Err(OrderStoreError::DuplicatePayment(payment.external_transaction_id));
        }
        let order =
            orders::fetch_order(&order_id, &mut tx).await?.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        if !order.order_status.is_pre_payment() {
            return Err(OrderStoreError::OrderNotPayable(order_id, order.order_status));
        }
        if !payments::fetch_completed_payment_ids(&order_id, &mut tx).await?.is_empty() {
            return Err(OrderStoreError::OrderAlreadyPaid(order_id));
        }
        let payment = payments::insert_payment(payment, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Payment {} for transaction {} saved against order {}",
            payment.payment_id, payment.external_transaction_id, payment.order_id
        );
        Ok(payment)
    }

    async fn update_payment_status(&self, payment_id: &str, status: PaymentStatus) -> Result<Payment, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::update_payment_status(payment_id, status, &mut conn).await?;
        debug!("🗃️ Payment {payment_id} is now {status}");
        Ok(payment)
    }

    async fn record_audit(&self, entry: NewAuditEntry) -> Result<PaymentAudit, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let entry = audit::insert_entry(entry, &mut conn).await?;
        debug!("🗃️ Audit entry #{} ({}) recorded", entry.id, entry.kind);
        Ok(entry)
    }

    async fn fetch_audit_for_order(&self, order_id: &OrderId) -> Result<Vec<PaymentAudit>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let entries = audit::fetch_entries_for_order(order_id, &mut conn).await?;
        Ok(entries)
    }
}

impl CancellationManagement for SqliteDatabase {
    async fn fetch_cancel_for_order(&self, order_id: &OrderId) -> Result<Option<OrderCancel>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let cancel = cancels::fetch_cancel_for_order(order_id, &mut conn).await?;
        Ok(cancel)
    }

    async fn fetch_cancels_for_user(&self, user_id: &str) -> Result<Vec<OrderCancel>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let cancels = cancels::fetch_cancels_for_user(user_id, &mut conn).await?;
        Ok(cancels)
    }

    async fn commit_cancellation(
        &self,
        cancel: NewOrderCancel,
        terminal_status: OrderStatusType,
    ) -> Result<(OrderCancel, Order), OrderStoreError> {
        let order_id = cancel.order_id.clone();
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(&order_id, &mut tx).await? {
            return Err(OrderStoreError::OrderNotFound(order_id));
        }
        let order =
            orders::fetch_order(&order_id, &mut tx).await?.ok_or_else(|| OrderStoreError::OrderNotFound(order_id.clone()))?;
        if order.user_id != cancel.user_id {
            return Err(OrderStoreError::Unauthorized(order_id));
        }
        if cancels::fetch_cancel_for_order(&order_id, &mut tx).await?.is_some() {
            return Err(OrderStoreError::AlreadyCancelled(order_id));
        }
        if !order.order_status.is_cancellable() {
            return Err(OrderStoreError::NotCancellable(order_id, order.order_status));
        }
        let completed = payments::fetch_completed_payment_ids(&order_id, &mut tx).await?;
        if completed.iter().any(|pid| Some(pid) != cancel.payment_id.as_ref()) {
            return Err(OrderStoreError::PaymentChanged(order_id));
        }
        let refund_status = cancel.refund_status;
        let payment_id = cancel.payment_id.clone();
        let refund_amount = cancel.refund_amount;
        let saved = cancels::insert_cancel(cancel, &mut tx).await?;
        let order = orders::transition_status(&order_id, &[order.order_status], terminal_status, &mut tx)
            .await?
            .ok_or_else(|| OrderStoreError::NotCancellable(order_id.clone(), order.order_status))?;
        let n = orders::update_items_status(&order_id, terminal_status, &mut tx).await?;
        trace!("🗃️ {n} items of order {order_id} moved to {terminal_status}");
        match (refund_status, payment_id) {
            (RefundStatus::Completed, Some(pid)) => {
                settle_refunded_payment(&pid, refund_amount, &mut tx).await?;
            },
            (RefundStatus::Failed, pid) => {
                let detail = format!("Refund of {refund_amount} for payment {} failed", pid.unwrap_or_default());
                let entry = NewAuditEntry::new(AuditKind::RefundFailed, detail).with_order_id(&order_id);
                audit::insert_entry(entry, &mut tx).await?;
            },
            _ => {},
        }
        tx.commit().await?;
        debug!("🗃️ Cancellation of order {order_id} committed. Refund is {refund_status}");
        Ok((saved, order))
    }

    async fn fetch_failed_refunds(&self) -> Result<Vec<OrderCancel>, OrderStoreError> {
        let mut conn = self.pool.acquire().await?;
        let cancels = cancels::fetch_cancels_with_refund_status(RefundStatus::Failed, &mut conn).await?;
        Ok(cancels)
    }

    async fn reconcile_refund(
        &self,
        order_id: &OrderId,
        external_cancel_id: Option<String>,
        note: &str,
    ) -> Result<OrderCancel, OrderStoreError> {
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(order_id, &mut tx).await? {
            return Err(OrderStoreError::OrderNotFound(order_id.clone()));
        }
        let cancel = cancels::fetch_cancel_for_order(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderStoreError::CancelNotFound(order_id.clone()))?;
        if cancel.refund_status != RefundStatus::Failed {
            return Err(OrderStoreError::RefundNotFailed(order_id.clone(), cancel.refund_status));
        }
        let updated = cancels::update_refund_status(order_id, RefundStatus::Completed, external_cancel_id, &mut tx).await?;
        if let Some(pid) = &updated.payment_id {
            settle_refunded_payment(pid, updated.refund_amount, &mut tx).await?;
        }
        let detail = format!("Refund of {} marked as completed. {note}", updated.refund_amount);
        let entry = NewAuditEntry::new(AuditKind::RefundReconciled, detail).with_order_id(order_id);
        audit::insert_entry(entry, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Failed refund for order {order_id} reconciled");
        Ok(updated)
    }
}

/// A payment is only cancelled once its whole amount has been refunded. After a partial refund the remainder is still
/// charged, so the payment stays `Completed`.
async fn settle_refunded_payment(
    payment_id: &str,
    refunded: Won,
    conn: &mut SqliteConnection,
) -> Result<(), OrderStoreError> {
    let payment =
        payments::fetch_payment(payment_id, conn).await?.ok_or_else(|| OrderStoreError::PaymentNotFound(payment_id.into()))?;
    if refunded < payment.amount {
        trace!("🗃️ Payment {payment_id} was partially refunded ({refunded} of {}). It stays {}", payment.amount, payment.status);
        return Ok(());
    }
    payments::update_payment_status(payment_id, PaymentStatus::Cancelled, conn).await?;
    trace!("🗃️ Payment {payment_id} marked as cancelled");
    Ok(())
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await
    }
}
