use lcm_common::Won;
use thiserror::Error;

use crate::traits::data_objects::{GatewayCancelReceipt, GatewayCancelRequest, GatewayTransaction};

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The gateway could not be reached, or did not answer in time. The call can be retried.
    #[error("Payment gateway is unavailable: {0}")]
    Unavailable(String),
    #[error("Transaction {0} is unknown to the payment gateway")]
    TransactionNotFound(String),
    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),
    #[error("Payment gateway is not configured correctly: {0}")]
    Misconfigured(String),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Unavailable(_))
    }
}

/// The external payment processor. Only the calls the consistency engine needs are modelled.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Tells the gateway what `order_reference` will cost, so that it refuses to charge any other amount.
    async fn prepare_transaction(&self, order_reference: &str, amount: Won) -> Result<(), GatewayError>;

    /// Fetches the gateway's authoritative record of a transaction.
    async fn query_transaction(&self, external_transaction_id: &str) -> Result<GatewayTransaction, GatewayError>;

    /// Refunds a transaction, fully when `request.amount` is `None`.
    async fn cancel_transaction(&self, request: GatewayCancelRequest) -> Result<GatewayCancelReceipt, GatewayError>;
}
