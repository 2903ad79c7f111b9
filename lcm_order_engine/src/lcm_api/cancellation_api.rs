use std::fmt::Debug;

use lcm_common::Won;
use log::*;

use crate::{
    db_types::{
        AuditKind,
        NewAuditEntry,
        NewOrderCancel,
        Order,
        OrderCancel,
        OrderId,
        OrderStatusType,
        Payment,
        PaymentStatus,
        RefundStatus,
    },
    lcm_api::{
        errors::OrderFlowError,
        order_objects::{CancelRequest, CancelResult, WithdrawalOutcome, WithdrawalSummary},
    },
    traits::{CancellationManagement, GatewayCancelRequest, OrderManagement, PaymentGateway, PaymentStore},
};

pub const WITHDRAWAL_REASON: &str = "Member withdrawal";
/// A payment verified while the saga is running forces the saga to start over, at most this many times.
const MAX_SAGA_ATTEMPTS: usize = 3;

/// `CancellationApi` runs the cancellation saga.
///
/// The order store and the gateway cannot share a transaction, so the saga attempts the refund first and then records
/// whatever happened, failure included, in one local transaction. A refund that fails never blocks the cancellation.
/// It is recorded as `FAILED` and left for manual reconciliation.
pub struct CancellationApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for CancellationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CancellationApi")
    }
}

impl<B, G> CancellationApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }
}

impl<B, G> CancellationApi<B, G>
where
    B: OrderManagement + PaymentStore + CancellationManagement,
    G: PaymentGateway,
{
    /// Cancels an order on behalf of its owner.
    ///
    /// The first failing precondition wins: the order must exist (`OrderNotFound`) and belong to the user
    /// (`Unauthorized`), must not have been cancelled before (`AlreadyCancelled`) and must be in a cancellable state
    /// (`NotCancellable`). All of these are checked again when the outcome is committed.
    ///
    /// If the order has a completed payment, it is refunded at the gateway, by `refund_amount` if given and in full
    /// otherwise. The response always carries a definitive refund status.
    pub async fn cancel_order(&self, request: CancelRequest) -> Result<CancelResult, OrderFlowError> {
        let mut attempt = 1;
        loop {
            match self.run_saga(&request).await {
                Err(OrderFlowError::ConcurrentModification(id)) if attempt < MAX_SAGA_ATTEMPTS => {
                    debug!("🔄️ A payment for order {id} arrived mid-cancellation. Starting over (attempt {attempt})");
                    attempt += 1;
                },
                result => return result,
            }
        }
    }

    async fn run_saga(&self, request: &CancelRequest) -> Result<CancelResult, OrderFlowError> {
        if !request.terminal_status.is_cancellation() {
            return Err(OrderFlowError::ValidationError(format!(
                "{} is not a cancellation status",
                request.terminal_status
            )));
        }
        let order = self.check_cancellable(&request.order_id, &request.user_id).await?;
        let order_id = order.order_id.clone();
        let payment = self.refundable_payment(&order, request.payment_id.as_deref()).await?;
        let (refund_amount, gateway_request) = match &payment {
            Some(p) => {
                let amount = request.refund_amount.unwrap_or(p.amount);
                if !amount.is_positive() || amount > p.amount {
                    return Err(OrderFlowError::ValidationError(format!(
                        "Refund amount {amount} must be positive and no more than the payment of {}",
                        p.amount
                    )));
                }
                let req = if amount == p.amount {
                    GatewayCancelRequest::full(&p.external_transaction_id, request.reason.as_str())
                } else {
                    GatewayCancelRequest::partial(&p.external_transaction_id, amount, request.reason.as_str())
                };
                (amount, Some(req))
            },
            None => {
                if request.refund_amount.map(|a| a.is_positive()).unwrap_or(false) {
                    warn!("🔄️ Order {order_id} has no completed payment. Ignoring the requested refund amount");
                }
                (Won::zero(), None)
            },
        };

        let (refund_status, external_cancel_id) = match gateway_request {
            None => (RefundStatus::Completed, None),
            Some(req) => {
                debug!("🔄️ Refunding {refund_amount} of transaction {} for order {order_id}", req.external_transaction_id);
                match self.gateway.cancel_transaction(req).await {
                    Ok(receipt) => (RefundStatus::Completed, receipt.cancel_id),
                    Err(e) => {
                        warn!("🔄️ Refund for order {order_id} failed. The order is cancelled regardless. {e}");
                        (RefundStatus::Failed, None)
                    },
                }
            },
        };

        let cancel = NewOrderCancel {
            order_id: order_id.clone(),
            user_id: request.user_id.clone(),
            reason: request.reason.clone(),
            refund_amount,
            refund_status,
            payment_id: payment.as_ref().map(|p| p.payment_id.clone()),
            external_cancel_id,
        };
        match self.db.commit_cancellation(cancel, request.terminal_status).await {
            Ok((cancel, order)) => {
                info!(
                    "🔄️ Order {order_id} is {}. Refund of {refund_amount} is {refund_status}",
                    order.order_status
                );
                Ok(CancelResult { cancel, order_status: order.order_status })
            },
            Err(e) => {
                if let (Some(p), RefundStatus::Completed) = (&payment, refund_status) {
                    error!(
                        "🔄️ Payment {} was refunded, but the cancellation of order {order_id} could not be recorded. {e}",
                        p.payment_id
                    );
                    let entry = NewAuditEntry::new(
                        AuditKind::RefundOrphaned,
                        format!("Refund of {refund_amount} for payment {} was not recorded. {e}", p.payment_id),
                    )
                    .with_order_id(&order_id)
                    .with_transaction_id(&p.external_transaction_id);
                    if let Err(e) = self.db.record_audit(entry).await {
                        error!("🔄️ Could not record the orphaned refund for order {order_id}. {e}");
                    }
                }
                Err(e.into())
            },
        }
    }

    /// Evaluates the cancellation preconditions without side effects. A missing order or an order belonging to
    /// someone else is an error, rather than `false`.
    pub async fn is_cancellable(&self, order_id: &OrderId, user_id: &str) -> Result<bool, OrderFlowError> {
        match self.check_cancellable(order_id, user_id).await {
            Ok(_) => Ok(true),
            Err(OrderFlowError::AlreadyCancelled(_)) | Err(OrderFlowError::NotCancellable(_, _)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Closes out every order of a withdrawing member.
    ///
    /// * Cancellable orders run through the saga, ending as `CancelledByWithdrawal` with a full refund.
    /// * `Shipping` and `Delivered` orders are marked `ShippingMemberWithdrawn` and `DeliveredMemberWithdrawn`.
    /// * Everything else is left alone.
    ///
    /// Failures are reported per order and never abort the batch.
    pub async fn withdraw_member(&self, user_id: &str) -> Result<WithdrawalSummary, OrderFlowError> {
        if user_id.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("A user id is required".into()));
        }
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        info!("🔄️ Processing withdrawal of user {user_id}. {} orders to review", orders.len());
        let mut outcomes = Vec::with_capacity(orders.len());
        for order in orders {
            let outcome = self.withdraw_order(user_id, order).await;
            if let Some(e) = &outcome.error {
                warn!("🔄️ Withdrawal of order {} for user {user_id}: {e}", outcome.order_id);
            }
            outcomes.push(outcome);
        }
        Ok(WithdrawalSummary { user_id: user_id.to_string(), outcomes })
    }

    async fn withdraw_order(&self, user_id: &str, order: Order) -> WithdrawalOutcome {
        use OrderStatusType::*;
        let previous_status = order.order_status;
        let mut outcome = WithdrawalOutcome {
            order_id: order.order_id.clone(),
            previous_status,
            new_status: None,
            refund_status: None,
            error: None,
        };
        let marker = match previous_status {
            s if s.is_cancellable() => {
                let request = CancelRequest::new(order.order_id.clone(), user_id, WITHDRAWAL_REASON).for_withdrawal();
                match self.cancel_order(request).await {
                    Ok(result) => {
                        outcome.new_status = Some(result.order_status);
                        outcome.refund_status = Some(result.cancel.refund_status);
                        if result.cancel.refund_status == RefundStatus::Failed {
                            outcome.error = Some(OrderFlowError::RefundFailed(order.order_id).to_string());
                        }
                    },
                    Err(e) => outcome.error = Some(e.to_string()),
                }
                return outcome;
            },
            Shipping => ShippingMemberWithdrawn,
            Delivered => DeliveredMemberWithdrawn,
            _ => return outcome,
        };
        match self.db.transition_order_status(&order.order_id, &[previous_status], marker).await {
            Ok(Some(o)) => outcome.new_status = Some(o.order_status),
            Ok(None) => outcome.error = Some(format!("Order is no longer {previous_status}")),
            Err(e) => outcome.error = Some(e.to_string()),
        }
        outcome
    }

    /// The cancellation record of an order, visible only to the order's owner.
    pub async fn cancel_for_order(&self, order_id: &OrderId, user_id: &str) -> Result<OrderCancel, OrderFlowError> {
        let cancel = self
            .db
            .fetch_cancel_for_order(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::CancelNotFound(order_id.clone()))?;
        if cancel.user_id != user_id {
            return Err(OrderFlowError::Unauthorized(order_id.clone()));
        }
        Ok(cancel)
    }

    pub async fn cancels_for_user(&self, user_id: &str) -> Result<Vec<OrderCancel>, OrderFlowError> {
        let cancels = self.db.fetch_cancels_for_user(user_id).await?;
        Ok(cancels)
    }

    /// Cancellations whose refund failed, oldest first.
    pub async fn failed_refunds(&self) -> Result<Vec<OrderCancel>, OrderFlowError> {
        let cancels = self.db.fetch_failed_refunds().await?;
        Ok(cancels)
    }

    /// Records that a failed refund was settled out-of-band. Only `FAILED` refunds can be reconciled.
    pub async fn reconcile_refund(
        &self,
        order_id: &OrderId,
        external_cancel_id: Option<String>,
        note: &str,
    ) -> Result<OrderCancel, OrderFlowError> {
        let cancel = self.db.reconcile_refund(order_id, external_cancel_id, note).await?;
        info!("🔄️ Refund for order {order_id} reconciled as {}", cancel.refund_status);
        Ok(cancel)
    }

    async fn check_cancellable(&self, order_id: &OrderId, user_id: &str) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if order.user_id != user_id {
            return Err(OrderFlowError::Unauthorized(order_id.clone()));
        }
        if self.db.fetch_cancel_for_order(order_id).await?.is_some() {
            return Err(OrderFlowError::AlreadyCancelled(order_id.clone()));
        }
        if !order.order_status.is_cancellable() {
            return Err(OrderFlowError::NotCancellable(order_id.clone(), order.order_status));
        }
        Ok(order)
    }

    /// The completed payment to refund, if there is one. A pinned payment must belong to the order.
    async fn refundable_payment(
        &self,
        order: &Order,
        payment_id: Option<&str>,
    ) -> Result<Option<Payment>, OrderFlowError> {
        let payment = match payment_id {
            Some(pid) => {
                let p =
                    self.db.fetch_payment(pid).await?.ok_or_else(|| OrderFlowError::PaymentNotFound(pid.to_string()))?;
                if p.order_id != order.order_id {
                    return Err(OrderFlowError::ValidationError(format!(
                        "Payment {pid} does not belong to order {}",
                        order.order_id
                    )));
                }
                Some(p)
            },
            None => self.db.fetch_completed_payment_for_order(&order.order_id).await?,
        };
        Ok(payment.filter(|p| p.status == PaymentStatus::Completed))
    }
}
