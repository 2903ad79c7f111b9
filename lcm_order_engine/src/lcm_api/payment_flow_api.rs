use std::fmt::Debug;

use chrono::Utc;
use lcm_common::Won;
use log::*;

use crate::{
    db_types::{
        AuditKind,
        NewAuditEntry,
        NewPayment,
        Order,
        OrderId,
        OrderStatusType,
        Payment,
        PaymentAudit,
        PaymentStatus,
    },
    helpers::new_payment_id,
    lcm_api::{errors::OrderFlowError, order_objects::VerificationResult},
    traits::{
        CancellationManagement,
        GatewayCancelRequest,
        GatewayPaymentStatus,
        GatewayTransaction,
        OrderManagement,
        OrderStoreError,
        PaymentGateway,
        PaymentStore,
    },
};

/// `PaymentFlowApi` verifies gateway transactions against orders.
///
/// Verification is safe to call any number of times, concurrently, for the same transaction: from the client right
/// after checkout and from the gateway's webhook. Exactly one payment is stored per transaction id, and the order
/// moves to `PaymentCompleted` at most once.
pub struct PaymentFlowApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for PaymentFlowApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B, G> PaymentFlowApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }
}

impl<B, G> PaymentFlowApi<B, G>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    /// Verifies the gateway transaction `external_id` against the order `order_reference`.
    ///
    /// 1. If the transaction was verified before, the stored payment is returned without asking the gateway again.
    /// 2. The gateway's record must be `paid`, and opened for the same order.
    /// 3. The amount charged must equal the order total exactly. Otherwise the charge is refunded (best effort) and the
    ///    mismatch is audited.
    /// 4. The payment is stored, provided the order can still take it. If a concurrent call stored it first, that payment
    ///    is returned instead. If the order was cancelled, shipped or paid by another transaction in the meantime, the
    ///    charge is refunded (best effort) and `OrderNotPayable` or `OrderAlreadyPaid` is returned.
    /// 5. The order moves to `PaymentCompleted`. If that fails for a technical reason, the payment still stands and the
    ///    failure is audited.
    ///
    /// `user_id` is informational. The gateway's webhook carries no user.
    pub async fn verify(
        &self,
        external_id: &str,
        order_reference: &str,
        user_id: &str,
    ) -> Result<VerificationResult, OrderFlowError> {
        let external_id = external_id.trim();
        let order_reference = order_reference.trim();
        if external_id.is_empty() || order_reference.is_empty() {
            return Err(OrderFlowError::ValidationError("Both a transaction id and an order id are required".into()));
        }
        let order_id = OrderId::from(order_reference);
        debug!("💳️ Verifying transaction {external_id} for order {order_id} (user: {user_id})");
        if let Some(payment) = self.db.fetch_payment_by_external_id(external_id).await? {
            return self.already_processed(payment, &order_id).await;
        }

        let tx = self.gateway.query_transaction(external_id).await.map_err(|e| {
            warn!("💳️ Could not fetch transaction {external_id} from the gateway. {e}");
            OrderFlowError::from(e)
        })?;
        if tx.status != GatewayPaymentStatus::Paid {
            info!("💳️ Transaction {external_id} is {} at the gateway, not paid", tx.status);
            return Err(OrderFlowError::PaymentNotCompleted(tx.status.to_string()));
        }
        if !tx.order_reference.is_empty() && tx.order_reference != order_reference {
            warn!(
                "💳️ Transaction {external_id} was opened for order {} but is being verified against order {order_id}",
                tx.order_reference
            );
            return Err(OrderFlowError::ValidationError(format!(
                "Transaction {external_id} does not belong to order {order_id}"
            )));
        }
        let order =
            self.db.fetch_order(&order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;

        if tx.amount != order.total_price {
            return Err(self.reject_amount_mismatch(&tx, &order).await);
        }

        let new_payment = NewPayment {
            payment_id: new_payment_id(Utc::now()),
            order_id: order_id.clone(),
            external_transaction_id: external_id.to_string(),
            amount: tx.amount,
            status: PaymentStatus::Completed,
            method: tx.method,
            approval_number: tx.approval_number,
            card_name: tx.card_name,
            bank_name: tx.bank_name,
        };
        let payment = match self.db.insert_payment(new_payment).await {
            Ok(p) => p,
            Err(OrderStoreError::DuplicatePayment(_)) => {
                debug!("💳️ Transaction {external_id} was stored by a concurrent verification");
                let payment = self
                    .db
                    .fetch_payment_by_external_id(external_id)
                    .await?
                    .ok_or_else(|| OrderFlowError::PaymentNotFound(external_id.to_string()))?;
                return Ok(VerificationResult::already_processed(payment));
            },
            Err(e @ (OrderStoreError::OrderNotPayable(..) | OrderStoreError::OrderAlreadyPaid(_))) => {
                warn!("💳️ Transaction {external_id} cannot be applied. {e}. Refunding it");
                self.refund_unapplied(external_id, tx.amount, &order_id, &e.to_string()).await;
                return Err(e.into());
            },
            Err(e) => return Err(e.into()),
        };
        info!("💳️ Payment {} of {} verified for order {order_id}", payment.payment_id, payment.amount);
        let payment = self.complete_order(payment).await?;
        Ok(VerificationResult::verified(payment))
    }

    pub async fn fetch_payment(&self, payment_id: &str) -> Result<Payment, OrderFlowError> {
        self.db.fetch_payment(payment_id).await?.ok_or_else(|| OrderFlowError::PaymentNotFound(payment_id.to_string()))
    }

    /// Every audit entry recorded against the order, oldest first.
    pub async fn audit_trail(&self, order_id: &OrderId) -> Result<Vec<PaymentAudit>, OrderFlowError> {
        let entries = self.db.fetch_audit_for_order(order_id).await?;
        Ok(entries)
    }

    /// Returns the stored outcome of an earlier verification. If that verification stored the payment but never
    /// managed to move the order, the move is retried here.
    async fn already_processed(
        &self,
        payment: Payment,
        order_id: &OrderId,
    ) -> Result<VerificationResult, OrderFlowError> {
        if &payment.order_id != order_id {
            warn!(
                "💳️ Transaction {} belongs to order {}, not {order_id}",
                payment.external_transaction_id, payment.order_id
            );
            return Err(OrderFlowError::ValidationError(format!(
                "Transaction {} does not belong to order {order_id}",
                payment.external_transaction_id
            )));
        }
        debug!("💳️ Transaction {} was already processed as payment {}", payment.external_transaction_id, payment.payment_id);
        if payment.status == PaymentStatus::Completed {
            match self.db.fetch_order(order_id).await {
                Ok(Some(order)) if order.order_status.is_pre_payment() => {
                    info!("💳️ Order {order_id} is still {} after payment {}. Retrying", order.order_status, payment.payment_id);
                    let payment = self.complete_order(payment).await?;
                    return Ok(VerificationResult::already_processed(payment));
                },
                Ok(_) => {},
                Err(e) => warn!("💳️ Could not check order {order_id} for payment {}. {e}", payment.payment_id),
            }
        }
        Ok(VerificationResult::already_processed(payment))
    }

    /// Moves the order to `PaymentCompleted`. If that fails for a technical reason, the payment still stands and the
    /// failure is audited.
    async fn complete_order(&self, payment: Payment) -> Result<Payment, OrderFlowError> {
        let order_id = payment.order_id.clone();
        let result = self
            .db
            .transition_order_status(&order_id, &OrderStatusType::PRE_PAYMENT, OrderStatusType::PaymentCompleted)
            .await;
        match result {
            Ok(Some(_)) => {
                info!("💳️ Order {order_id} is now {}", OrderStatusType::PaymentCompleted);
                Ok(payment)
            },
            Ok(None) => self.order_moved_on(payment).await,
            Err(e) => {
                let detail = format!("Could not update order for payment {}. {e}", payment.payment_id);
                error!("💳️ {detail}. The payment stands. Order: {order_id}");
                let entry = NewAuditEntry::new(AuditKind::OrderTransitionFailed, detail)
                    .with_order_id(&order_id)
                    .with_transaction_id(&payment.external_transaction_id);
                self.audit(entry).await;
                Ok(payment)
            },
        }
    }

    /// The order left the pre-payment states after the payment was stored, but before it could be moved.
    ///
    /// A cancellation that accounted for the payment owns its refund. A cancellation that did not leaves a charge on a
    /// cancelled order, which is refunded here. Any other state keeps the payment.
    async fn order_moved_on(&self, payment: Payment) -> Result<Payment, OrderFlowError> {
        let order_id = payment.order_id.clone();
        let order =
            self.db.fetch_order(&order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let payment = self.db.fetch_payment(&payment.payment_id).await?.unwrap_or(payment);
        if payment.status != PaymentStatus::Completed {
            info!("💳️ Payment {} was refunded by the cancellation of order {order_id}", payment.payment_id);
            return Err(OrderFlowError::OrderNotPayable(order_id, order.order_status));
        }
        if order.order_status.is_cancellation() {
            let cancel = self.db.fetch_cancel_for_order(&order_id).await?;
            if cancel.and_then(|c| c.payment_id).as_deref() == Some(payment.payment_id.as_str()) {
                info!("💳️ Payment {} is awaiting its refund from the cancellation of order {order_id}", payment.payment_id);
                return Err(OrderFlowError::OrderNotPayable(order_id, order.order_status));
            }
            warn!("💳️ Order {order_id} was cancelled without payment {}. Refunding it", payment.payment_id);
            let reason = format!("Order is {}", order.order_status);
            if self.refund_unapplied(&payment.external_transaction_id, payment.amount, &order_id, &reason).await {
                self.db.update_payment_status(&payment.payment_id, PaymentStatus::Cancelled).await?;
            }
            return Err(OrderFlowError::OrderNotPayable(order_id, order.order_status));
        }
        if order.order_status != OrderStatusType::PaymentCompleted {
            let detail = format!("Order was {} when payment {} was stored", order.order_status, payment.payment_id);
            error!("💳️ {detail}. The payment stands. Order: {order_id}");
            let entry = NewAuditEntry::new(AuditKind::OrderTransitionFailed, detail)
                .with_order_id(&order_id)
                .with_transaction_id(&payment.external_transaction_id);
            self.audit(entry).await;
        }
        Ok(payment)
    }

    async fn reject_amount_mismatch(&self, tx: &GatewayTransaction, order: &Order) -> OrderFlowError {
        let expected = order.total_price;
        let actual = tx.amount;
        warn!(
            "💳️ Transaction {} charged {actual}, but order {} totals {expected}. Refunding",
            tx.external_transaction_id, order.order_id
        );
        let entry = NewAuditEntry::new(AuditKind::AmountMismatch, "Gateway amount does not match the order total")
            .with_order_id(&order.order_id)
            .with_transaction_id(&tx.external_transaction_id)
            .with_amounts(expected, actual);
        self.audit(entry).await;
        self.compensate(&tx.external_transaction_id, actual, &order.order_id, "Payment amount does not match the order").await;
        OrderFlowError::AmountMismatch { expected, actual }
    }

    /// Refunds a charge the order cannot take, and audits the refund so that it shows up on the order's trail.
    async fn refund_unapplied(&self, external_id: &str, amount: Won, order_id: &OrderId, reason: &str) -> bool {
        let refunded = self.compensate(external_id, amount, order_id, reason).await;
        if refunded {
            let entry = NewAuditEntry::new(AuditKind::AutoCancelled, reason)
                .with_order_id(order_id)
                .with_transaction_id(external_id)
                .with_amounts(amount, amount);
            self.audit(entry).await;
        }
        refunded
    }

    /// Refunds the whole transaction. A failure is audited, but never returned. Returns true if the refund went through.
    async fn compensate(&self, external_id: &str, amount: Won, order_id: &OrderId, reason: &str) -> bool {
        let request = GatewayCancelRequest::full(external_id, reason);
        match self.gateway.cancel_transaction(request).await {
            Ok(receipt) => {
                info!("💳️ Transaction {external_id} refunded. Cancel id: {}", receipt.cancel_id.unwrap_or_default());
                true
            },
            Err(e) => {
                error!("💳️ Could not refund transaction {external_id}. {e}");
                let entry = NewAuditEntry::new(AuditKind::AutoCancelFailed, format!("{reason}. {e}"))
                    .with_order_id(order_id)
                    .with_transaction_id(external_id)
                    .with_amounts(amount, amount);
                self.audit(entry).await;
                false
            },
        }
    }

    async fn audit(&self, entry: NewAuditEntry) {
        let kind = entry.kind;
        if let Err(e) = self.db.record_audit(entry).await {
            error!("💳️ Could not record {kind} audit entry. {e}");
        }
    }
}
