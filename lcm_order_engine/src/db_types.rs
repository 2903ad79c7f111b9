use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use lcm_common::Won;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The lifecycle of an order. Items share the same status vocabulary and follow their order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Created at checkout. No payment has been verified yet.
    Pending,
    OrderCompleted,
    Preparing,
    /// A payment for the full order amount has been verified against the gateway.
    PaymentCompleted,
    Shipping,
    Delivered,
    Cancelled,
    CancelledByWithdrawal,
    ShippingMemberWithdrawn,
    DeliveredMemberWithdrawn,
}

use OrderStatusType::*;

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 10] = [
        Pending,
        OrderCompleted,
        Preparing,
        PaymentCompleted,
        Shipping,
        Delivered,
        Cancelled,
        CancelledByWithdrawal,
        ShippingMemberWithdrawn,
        DeliveredMemberWithdrawn,
    ];

    /// The states from which a verified payment may move the order to `PaymentCompleted`.
    pub const PRE_PAYMENT: [OrderStatusType; 3] = [Pending, OrderCompleted, Preparing];

    /// The states from which the cancellation saga may run.
    pub const CANCELLABLE: [OrderStatusType; 4] = [Pending, OrderCompleted, Preparing, PaymentCompleted];

    pub fn is_pre_payment(&self) -> bool {
        Self::PRE_PAYMENT.contains(self)
    }

    pub fn is_cancellable(&self) -> bool {
        Self::CANCELLABLE.contains(self)
    }

    /// Statuses that only the cancellation saga may write.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Cancelled | CancelledByWithdrawal)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Cancelled | CancelledByWithdrawal | ShippingMemberWithdrawn | DeliveredMemberWithdrawn)
    }

    /// Forward transitions of the order state machine. Cancellation edges are not listed here, since they are owned by
    /// the cancellation saga.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        match self {
            Pending => matches!(next, OrderCompleted | Preparing | PaymentCompleted),
            OrderCompleted => matches!(next, Preparing | PaymentCompleted),
            Preparing => matches!(next, PaymentCompleted | Shipping),
            PaymentCompleted => matches!(next, Preparing | Shipping),
            Shipping => matches!(next, Delivered | ShippingMemberWithdrawn),
            Delivered => matches!(next, DeliveredMemberWithdrawn),
            Cancelled | CancelledByWithdrawal | ShippingMemberWithdrawn | DeliveredMemberWithdrawn => false,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pending => "PENDING",
            OrderCompleted => "ORDER_COMPLETED",
            Preparing => "PREPARING",
            PaymentCompleted => "PAYMENT_COMPLETED",
            Shipping => "SHIPPING",
            Delivered => "DELIVERED",
            Cancelled => "CANCELLED",
            CancelledByWithdrawal => "CANCELLED_BY_WITHDRAWAL",
            ShippingMemberWithdrawn => "SHIPPING_MEMBER_WITHDRAWN",
            DeliveredMemberWithdrawn => "DELIVERED_MEMBER_WITHDRAWN",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .find(|v| v.to_string() == status)
            .copied()
            .ok_or_else(|| ConversionError(format!("Invalid order status: {s}")))
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    /// The payment was refunded at the gateway, fully or partially.
    Cancelled,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Completed => write!(f, "COMPLETED"),
            PaymentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

//--------------------------------------     RefundStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Completed,
    /// The gateway refused or never answered the refund. Needs manual reconciliation.
    Failed,
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::Pending => write!(f, "PENDING"),
            RefundStatus::Completed => write!(f, "COMPLETED"),
            RefundStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for RefundStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(ConversionError(format!("Invalid refund status: {s}"))),
        }
    }
}

//--------------------------------------       AuditKind       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    /// The gateway charged a different amount than the order total.
    AmountMismatch,
    /// A charge that could not be applied to its order was refunded by the verification flow.
    AutoCancelled,
    /// A compensating cancel issued by the verification flow did not go through.
    AutoCancelFailed,
    /// A payment was stored, but the order could not be moved to `PaymentCompleted`.
    OrderTransitionFailed,
    RefundFailed,
    /// A failed refund was corrected out-of-band.
    RefundReconciled,
    /// The gateway refunded a payment, but the local cancellation lost a race and was not recorded.
    RefundOrphaned,
}

impl Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AuditKind::AmountMismatch => "AMOUNT_MISMATCH",
            AuditKind::AutoCancelled => "AUTO_CANCELLED",
            AuditKind::AutoCancelFailed => "AUTO_CANCEL_FAILED",
            AuditKind::OrderTransitionFailed => "ORDER_TRANSITION_FAILED",
            AuditKind::RefundFailed => "REFUND_FAILED",
            AuditKind::RefundReconciled => "REFUND_RECONCILED",
            AuditKind::RefundOrphaned => "REFUND_ORPHANED",
        };
        f.write_str(s)
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: String,
    #[sqlx(rename = "status")]
    pub order_status: OrderStatusType,
    /// Fixed at checkout. Every payment is reconciled against this amount.
    pub total_price: Won,
    pub delivery_fee: Won,
    pub discount_amount: Won,
    pub used_point: Won,
    pub saved_point: Won,
    pub payment_method: String,
    pub payment_method_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub zipcode: Option<String>,
    pub address_detail: Option<String>,
    pub delivery_memo: Option<String>,
    pub estimated_date: Option<DateTime<Utc>>,
    pub shipping_date: Option<DateTime<Utc>>,
    pub tracking_number: Option<String>,
    pub delivery_company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       OrderItem       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub order_item_id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub total_price: Won,
    pub status: OrderStatusType,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// A fully priced order, ready to be stored. These are produced by the checkout flow.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub user_id: String,
    pub total_price: Won,
    pub delivery_fee: Won,
    pub discount_amount: Won,
    pub used_point: Won,
    pub saved_point: Won,
    pub payment_method: String,
    pub payment_method_name: Option<String>,
    pub contact: ContactDetails,
    pub estimated_date: Option<DateTime<Utc>>,
    pub items: Vec<NewOrderItem>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub recipient_name: Option<String>,
    pub recipient_phone: Option<String>,
    pub zipcode: Option<String>,
    pub address_detail: Option<String>,
    pub delivery_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub total_price: Won,
    #[serde(default)]
    pub image_url: Option<String>,
}

//--------------------------------------        Payment        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: String,
    pub order_id: OrderId,
    /// The gateway's transaction id (`imp_uid`). Unique across all payments.
    pub external_transaction_id: String,
    pub amount: Won,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub approval_number: Option<String>,
    pub card_name: Option<String>,
    pub bank_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub payment_id: String,
    pub order_id: OrderId,
    pub external_transaction_id: String,
    pub amount: Won,
    pub status: PaymentStatus,
    pub method: Option<String>,
    pub approval_number: Option<String>,
    pub card_name: Option<String>,
    pub bank_name: Option<String>,
}

//--------------------------------------      OrderCancel      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCancel {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: String,
    pub reason: String,
    pub refund_amount: Won,
    pub refund_status: RefundStatus,
    pub payment_id: Option<String>,
    pub external_cancel_id: Option<String>,
    pub cancel_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrderCancel {
    pub order_id: OrderId,
    pub user_id: String,
    pub reason: String,
    pub refund_amount: Won,
    pub refund_status: RefundStatus,
    pub payment_id: Option<String>,
    pub external_cancel_id: Option<String>,
}

//--------------------------------------     PaymentAudit      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAudit {
    pub id: i64,
    pub external_transaction_id: Option<String>,
    pub order_id: Option<OrderId>,
    pub kind: AuditKind,
    pub expected_amount: Option<Won>,
    pub actual_amount: Option<Won>,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub external_transaction_id: Option<String>,
    pub order_id: Option<OrderId>,
    pub kind: AuditKind,
    pub expected_amount: Option<Won>,
    pub actual_amount: Option<Won>,
    pub detail: String,
}

impl NewAuditEntry {
    pub fn new<S: Into<String>>(kind: AuditKind, detail: S) -> Self {
        Self {
            external_transaction_id: None,
            order_id: None,
            kind,
            expected_amount: None,
            actual_amount: None,
            detail: detail.into(),
        }
    }

    pub fn with_order_id(mut self, order_id: &OrderId) -> Self {
        self.order_id = Some(order_id.clone());
        self
    }

    pub fn with_transaction_id(mut self, external_transaction_id: &str) -> Self {
        self.external_transaction_id = Some(external_transaction_id.to_string());
        self
    }

    pub fn with_amounts(mut self, expected: Won, actual: Won) -> Self {
        self.expected_amount = Some(expected);
        self.actual_amount = Some(actual);
        self
    }
}
