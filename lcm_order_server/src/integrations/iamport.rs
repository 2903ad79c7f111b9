//! Binds the engine's [`PaymentGateway`] contract to the Iamport REST client.
use lcm_order_engine::traits::{
    GatewayCancelReceipt,
    GatewayCancelRequest,
    GatewayError,
    GatewayPaymentStatus,
    GatewayTransaction,
    PaymentGateway,
};
use lcm_common::Won;
use log::*;
use pg_tools::{CancelData, IamportApi, IamportApiError, IamportConfig, IamportPayment, PaymentStatus, PrepareData};

#[derive(Clone)]
pub struct IamportGateway {
    api: IamportApi,
}

impl IamportGateway {
    pub fn new(config: IamportConfig) -> Result<Self, IamportApiError> {
        let api = IamportApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentGateway for IamportGateway {
    async fn prepare_transaction(&self, order_reference: &str, amount: Won) -> Result<(), GatewayError> {
        let data = PrepareData { merchant_uid: order_reference.to_string(), amount };
        let prepared = self.api.prepare_payment(data).await.map_err(gateway_error)?;
        if prepared.amount != amount {
            return Err(GatewayError::Rejected(format!(
                "Gateway registered {} for {order_reference} instead of {amount}",
                prepared.amount
            )));
        }
        Ok(())
    }

    async fn query_transaction(&self, external_transaction_id: &str) -> Result<GatewayTransaction, GatewayError> {
        let payment = self.api.payment_by_imp_uid(external_transaction_id).await.map_err(|e| match e {
            IamportApiError::Rejected { message, .. } => {
                debug!("💳️ Iamport does not know transaction {external_transaction_id}. {message}");
                GatewayError::TransactionNotFound(external_transaction_id.to_string())
            },
            IamportApiError::QueryError { status: 404, .. } => {
                GatewayError::TransactionNotFound(external_transaction_id.to_string())
            },
            e => gateway_error(e),
        })?;
        Ok(to_transaction(payment))
    }

    async fn cancel_transaction(&self, request: GatewayCancelRequest) -> Result<GatewayCancelReceipt, GatewayError> {
        let data = match request.amount {
            Some(amount) => CancelData::partial(&request.external_transaction_id, amount, &request.reason),
            None => CancelData::full(&request.external_transaction_id, &request.reason),
        };
        let payment = self.api.cancel_payment(data).await.map_err(gateway_error)?;
        let cancel_id = payment.latest_cancel_id().map(String::from);
        Ok(GatewayCancelReceipt { cancel_id, message: Some(format!("Transaction is {}", payment.status)) })
    }
}

fn gateway_error(e: IamportApiError) -> GatewayError {
    if e.is_retryable() {
        return GatewayError::Unavailable(e.to_string());
    }
    match e {
        IamportApiError::Initialization(s) | IamportApiError::Unauthorized(s) => GatewayError::Misconfigured(s),
        e => GatewayError::Rejected(e.to_string()),
    }
}

fn to_transaction(payment: IamportPayment) -> GatewayTransaction {
    let status = match payment.status {
        PaymentStatus::Ready => GatewayPaymentStatus::Ready,
        PaymentStatus::Paid => GatewayPaymentStatus::Paid,
        PaymentStatus::Cancelled => GatewayPaymentStatus::Cancelled,
        PaymentStatus::Failed => GatewayPaymentStatus::Failed,
        PaymentStatus::Unknown => GatewayPaymentStatus::Unknown,
    };
    GatewayTransaction {
        external_transaction_id: payment.imp_uid,
        order_reference: payment.merchant_uid,
        status,
        amount: payment.amount,
        method: payment.pay_method,
        approval_number: payment.apply_num,
        card_name: payment.card_name,
        bank_name: payment.bank_name,
    }
}
