use std::fmt::Display;

use lcm_common::Won;
use serde::{Deserialize, Serialize};

use crate::helpers::deserialize_won;

/// Every Iamport endpoint wraps its payload in the same envelope. `code` is zero on success.
#[derive(Debug, Clone, Deserialize)]
pub struct IamportResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub response: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    /// Unix timestamp, according to the gateway's clock
    pub now: i64,
    /// Unix timestamp, according to the gateway's clock
    pub expired_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Ready,
    Paid,
    Cancelled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Paid => write!(f, "paid"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// The subset of the gateway's payment record that the order engine reconciles against.
#[derive(Debug, Clone, Deserialize)]
pub struct IamportPayment {
    pub imp_uid: String,
    pub merchant_uid: String,
    pub status: PaymentStatus,
    #[serde(deserialize_with = "deserialize_won")]
    pub amount: Won,
    #[serde(default)]
    pub pay_method: Option<String>,
    #[serde(default)]
    pub apply_num: Option<String>,
    #[serde(default)]
    pub card_name: Option<String>,
    #[serde(default)]
    pub bank_name: Option<String>,
    /// Refunds applied to this payment, oldest first
    #[serde(default)]
    pub cancel_history: Vec<CancelHistoryEntry>,
}

impl IamportPayment {
    /// The PG's reference for the most recent refund, if any
    pub fn latest_cancel_id(&self) -> Option<&str> {
        self.cancel_history.last().map(|c| c.pg_tid.as_str()).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelHistoryEntry {
    #[serde(default)]
    pub pg_tid: String,
    #[serde(deserialize_with = "deserialize_won")]
    pub amount: Won,
    #[serde(default)]
    pub cancelled_at: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /payments/cancel`. When `amount` is absent the whole payment is cancelled.
#[derive(Debug, Clone, Serialize)]
pub struct CancelData {
    pub imp_uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Won>,
    pub reason: String,
}

impl CancelData {
    pub fn full(imp_uid: &str, reason: &str) -> Self {
        Self { imp_uid: imp_uid.to_string(), amount: None, reason: reason.to_string() }
    }

    pub fn partial(imp_uid: &str, amount: Won, reason: &str) -> Self {
        Self { imp_uid: imp_uid.to_string(), amount: Some(amount), reason: reason.to_string() }
    }
}

/// Body of `POST /payments/prepare`. The gateway will refuse to charge `merchant_uid` any other amount.
#[derive(Debug, Clone, Serialize)]
pub struct PrepareData {
    pub merchant_uid: String,
    pub amount: Won,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreparedPayment {
    pub merchant_uid: String,
    #[serde(deserialize_with = "deserialize_won")]
    pub amount: Won,
}
