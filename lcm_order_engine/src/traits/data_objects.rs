use std::fmt::Display;

use lcm_common::Won;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayPaymentStatus {
    Ready,
    Paid,
    Cancelled,
    Failed,
    Unknown,
}

impl Display for GatewayPaymentStatus {
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

/// A transaction as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTransaction {
    pub external_transaction_id: String,
    /// The order reference the transaction was opened with (`merchant_uid`).
    pub order_reference: String,
    pub status: GatewayPaymentStatus,
    pub amount: Won,
    pub method: Option<String>,
    pub approval_number: Option<String>,
    pub card_name: Option<String>,
    pub bank_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCancelRequest {
    pub external_transaction_id: String,
    /// `None` refunds the whole transaction.
    pub amount: Option<Won>,
    pub reason: String,
}

impl GatewayCancelRequest {
    pub fn full<S: Into<String>>(external_transaction_id: &str, reason: S) -> Self {
        Self { external_transaction_id: external_transaction_id.to_string(), amount: None, reason: reason.into() }
    }

    pub fn partial<S: Into<String>>(external_transaction_id: &str, amount: Won, reason: S) -> Self {
        Self { external_transaction_id: external_transaction_id.to_string(), amount: Some(amount), reason: reason.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCancelReceipt {
    /// The gateway's reference for the refund, if it issues one.
    pub cancel_id: Option<String>,
    pub message: Option<String>,
}
