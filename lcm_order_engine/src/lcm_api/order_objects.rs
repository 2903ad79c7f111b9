use lcm_common::Won;
use serde::{Deserialize, Serialize};

use crate::db_types::{
    ContactDetails,
    NewOrderItem,
    OrderCancel,
    OrderId,
    OrderStatusType,
    Payment,
    RefundStatus,
};

/// A cart snapshot submitted at checkout. Prices are per line (unit price times quantity), as the cart reports them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub items: Vec<NewOrderItem>,
    #[serde(default)]
    pub used_point: Won,
    pub payment_method: String,
    #[serde(default)]
    pub payment_method_name: Option<String>,
    #[serde(flatten)]
    pub contact: ContactDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    /// This call verified the transaction.
    Verified,
    /// An earlier call verified the transaction. The stored payment is returned unchanged.
    AlreadyProcessed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub outcome: VerificationOutcome,
    pub payment: Payment,
}

impl VerificationResult {
    pub fn verified(payment: Payment) -> Self {
        Self { outcome: VerificationOutcome::Verified, payment }
    }

    pub fn already_processed(payment: Payment) -> Self {
        Self { outcome: VerificationOutcome::AlreadyProcessed, payment }
    }
}

#[derive(Debug, Clone)]
pub struct CancelRequest {
    pub order_id: OrderId,
    pub user_id: String,
    pub reason: String,
    /// Defaults to the full amount of the completed payment
    pub refund_amount: Option<Won>,
    /// Pins the refund to a specific payment of the order
    pub payment_id: Option<String>,
    pub terminal_status: OrderStatusType,
}

impl CancelRequest {
    pub fn new<S: Into<String>>(order_id: OrderId, user_id: &str, reason: S) -> Self {
        Self {
            order_id,
            user_id: user_id.to_string(),
            reason: reason.into(),
            refund_amount: None,
            payment_id: None,
            terminal_status: OrderStatusType::Cancelled,
        }
    }

    pub fn with_refund_amount(mut self, amount: Won) -> Self {
        self.refund_amount = Some(amount);
        self
    }

    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn for_withdrawal(mut self) -> Self {
        self.terminal_status = OrderStatusType::CancelledByWithdrawal;
        self
    }
}

/// What happened to one order when its owner withdrew their membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalOutcome {
    pub order_id: OrderId,
    pub previous_status: OrderStatusType,
    /// `None` when the order was left as it was
    pub new_status: Option<OrderStatusType>,
    pub refund_status: Option<RefundStatus>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSummary {
    pub user_id: String,
    pub outcomes: Vec<WithdrawalOutcome>,
}

impl WithdrawalSummary {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }
}

/// The saga's answer to a cancellation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResult {
    pub cancel: OrderCancel,
    pub order_status: OrderStatusType,
}
