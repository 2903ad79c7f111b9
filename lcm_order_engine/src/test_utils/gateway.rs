//! An in-memory payment gateway with scripted behaviour, for exercising the engine without a real processor.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use lcm_common::Won;

use crate::traits::{
    GatewayCancelReceipt,
    GatewayCancelRequest,
    GatewayError,
    GatewayPaymentStatus,
    GatewayTransaction,
    PaymentGateway,
};

#[derive(Default)]
struct GatewayState {
    transactions: HashMap<String, GatewayTransaction>,
    refunded: HashMap<String, Won>,
    prepared: HashMap<String, Won>,
    query_log: Vec<String>,
    cancel_log: Vec<GatewayCancelRequest>,
    query_failure: Option<GatewayError>,
    cancel_failure: Option<GatewayError>,
    prepare_failure: Option<GatewayError>,
}

#[derive(Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a `paid` card transaction for the given order reference.
    pub fn with_paid(self, external_id: &str, order_reference: &str, amount: i64) -> Self {
        self.add_transaction(external_id, order_reference, amount, GatewayPaymentStatus::Paid);
        self
    }

    pub fn add_transaction(&self, external_id: &str, order_reference: &str, amount: i64, status: GatewayPaymentStatus) {
        let tx = GatewayTransaction {
            external_transaction_id: external_id.to_string(),
            order_reference: order_reference.to_string(),
            status,
            amount: Won::from(amount),
            method: Some("card".to_string()),
            approval_number: Some(format!("APPROVAL-{external_id}")),
            card_name: Some("Test Card".to_string()),
            bank_name: None,
        };
        self.state.lock().unwrap().transactions.insert(external_id.to_string(), tx);
    }

    pub fn fail_prepares(&self, err: Option<GatewayError>) {
        self.state.lock().unwrap().prepare_failure = err;
    }

    /// The amount registered for the order reference at checkout, if any.
    pub fn prepared_amount(&self, order_reference: &str) -> Option<Won> {
        self.state.lock().unwrap().prepared.get(order_reference).copied()
    }

    /// Every query fails with `err` until cleared with `None`.
    pub fn fail_queries(&self, err: Option<GatewayError>) {
        self.state.lock().unwrap().query_failure = err;
    }

    /// Every cancellation fails with `err` until cleared with `None`.
    pub fn fail_cancels(&self, err: Option<GatewayError>) {
        self.state.lock().unwrap().cancel_failure = err;
    }

    pub fn query_count(&self, external_id: &str) -> usize {
        self.state.lock().unwrap().query_log.iter().filter(|id| *id == external_id).count()
    }

    pub fn cancel_requests(&self) -> Vec<GatewayCancelRequest> {
        self.state.lock().unwrap().cancel_log.clone()
    }

    pub fn status_of(&self, external_id: &str) -> Option<GatewayPaymentStatus> {
        self.state.lock().unwrap().transactions.get(external_id).map(|t| t.status)
    }

    pub fn refunded_amount(&self, external_id: &str) -> Won {
        self.state.lock().unwrap().refunded.get(external_id).copied().unwrap_or_default()
    }
}

impl PaymentGateway for ScriptedGateway {
    async fn prepare_transaction(&self, order_reference: &str, amount: Won) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.prepare_failure.clone() {
            return Err(e);
        }
        state.prepared.insert(order_reference.to_string(), amount);
        Ok(())
    }

    async fn query_transaction(&self, external_transaction_id: &str) -> Result<GatewayTransaction, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.query_log.push(external_transaction_id.to_string());
        if let Some(e) = state.query_failure.clone() {
            return Err(e);
        }
        state
            .transactions
            .get(external_transaction_id)
            .cloned()
            .ok_or_else(|| GatewayError::TransactionNotFound(external_transaction_id.to_string()))
    }

    async fn cancel_transaction(&self, request: GatewayCancelRequest) -> Result<GatewayCancelReceipt, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.cancel_log.push(request.clone());
        if let Some(e) = state.cancel_failure.clone() {
            return Err(e);
        }
        let id = request.external_transaction_id.clone();
        let already_refunded = state.refunded.get(&id).copied().unwrap_or_default();
        let tx = state.transactions.get_mut(&id).ok_or_else(|| GatewayError::TransactionNotFound(id.clone()))?;
        if tx.status != GatewayPaymentStatus::Paid {
            return Err(GatewayError::Rejected(format!("Transaction {id} is {}", tx.status)));
        }
        let remaining = tx.amount - already_refunded;
        let amount = request.amount.unwrap_or(remaining);
        if amount > remaining {
            return Err(GatewayError::Rejected(format!("Cannot refund {amount}. Only {remaining} remains")));
        }
        if amount == remaining {
            tx.status = GatewayPaymentStatus::Cancelled;
        }
        let refunds = state.cancel_log.len();
        state.refunded.insert(id.clone(), already_refunded + amount);
        Ok(GatewayCancelReceipt { cancel_id: Some(format!("CANCEL-{id}-{refunds}")), message: None })
    }
}
