use std::fmt::Display;

use chrono::{DateTime, Utc};
use lcm_common::Won;
use lcm_order_engine::{
    db_types::{OrderCancel, OrderId, OrderStatusType, PaymentStatus, RefundStatus},
    order_objects::{CancelResult, VerificationOutcome, VerificationResult},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Sent by the storefront once the gateway's checkout widget reports a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationRequest {
    pub imp_uid: String,
    pub merchant_uid: String,
}

/// The gateway's server-to-server notification. The gateway uses snake_case field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub imp_uid: String,
    pub merchant_uid: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentVerificationResponse {
    pub success: bool,
    pub payment_id: String,
    pub order_id: OrderId,
    pub amount: Won,
    pub status: PaymentStatus,
    pub already_processed: bool,
}

impl From<VerificationResult> for PaymentVerificationResponse {
    fn from(result: VerificationResult) -> Self {
        let p = result.payment;
        Self {
            success: true,
            payment_id: p.payment_id,
            order_id: p.order_id,
            amount: p.amount,
            status: p.status,
            already_processed: result.outcome == VerificationOutcome::AlreadyProcessed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderRequest {
    /// Optional, since the caller is identified by the `X-User-Id` header. If given, it must agree with the header.
    #[serde(default)]
    pub user_id: Option<String>,
    pub reason: String,
    #[serde(default)]
    pub refund_amount: Option<Won>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    pub order_id: OrderId,
    pub order_status: OrderStatusType,
    pub refund_status: RefundStatus,
    pub refund_amount: Won,
    pub external_cancel_id: Option<String>,
    pub cancel_date: DateTime<Utc>,
}

impl From<CancelResult> for CancelOrderResponse {
    fn from(result: CancelResult) -> Self {
        let OrderCancel { order_id, refund_status, refund_amount, external_cancel_id, cancel_date, .. } = result.cancel;
        Self {
            order_id,
            order_status: result.order_status,
            refund_status,
            refund_amount,
            external_cancel_id,
            cancel_date,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellableResponse {
    pub order_id: OrderId,
    pub cancelable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRefundRequest {
    pub refund_status: RefundStatus,
    #[serde(default)]
    pub external_cancel_id: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}
