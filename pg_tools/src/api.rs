use std::sync::Arc;

use chrono::Utc;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::{
    config::IamportConfig,
    data_objects::{AccessToken, CancelData, IamportPayment, IamportResponse, PrepareData, PreparedPayment},
    IamportApiError,
};

/// Tokens are refreshed this many seconds before the gateway says they expire.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
pub struct IamportApi {
    config: IamportConfig,
    client: Arc<Client>,
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl IamportApi {
    pub fn new(config: IamportConfig) -> Result<Self, IamportApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| IamportApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token: Arc::new(RwLock::new(None)) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Sends a request and unwraps the gateway's `{code, message, response}` envelope.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
        token: Option<&str>,
    ) -> Result<T, IamportApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(token) = token {
            req = req.header("Authorization", token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            trace!("REST query successful. {status}");
            let envelope = response.json::<IamportResponse<T>>().await?;
            if envelope.code != 0 {
                let message = envelope.message.unwrap_or_default();
                return Err(IamportApiError::Rejected { code: envelope.code, message });
            }
            envelope.response.ok_or(IamportApiError::EmptyResponse)
        } else {
            let status = status.as_u16();
            let message = response.text().await?;
            match serde_json::from_str::<IamportResponse<Value>>(&message) {
                Ok(envelope) if status < 500 => Err(IamportApiError::Rejected {
                    code: envelope.code,
                    message: envelope.message.unwrap_or_default(),
                }),
                _ => Err(IamportApiError::QueryError { status, message }),
            }
        }
    }

    /// Returns a valid access token, exchanging the API credentials for a new one when the cached token is missing or
    /// about to expire.
    pub async fn access_token(&self) -> Result<String, IamportApiError> {
        let now = Utc::now().timestamp();
        if let Some(token) = self.token.read().await.as_ref() {
            if token.expired_at - TOKEN_EXPIRY_MARGIN_SECS > now {
                return Ok(token.access_token.clone());
            }
        }
        let mut cache = self.token.write().await;
        // Another task may have refreshed the token while we waited for the lock
        if let Some(token) = cache.as_ref() {
            if token.expired_at - TOKEN_EXPIRY_MARGIN_SECS > now {
                return Ok(token.access_token.clone());
            }
        }
        if self.config.api_key.is_blank() || self.config.api_secret.is_blank() {
            return Err(IamportApiError::Unauthorized("API credentials are not configured".to_string()));
        }
        let body = json!({
            "imp_key": self.config.api_key.reveal(),
            "imp_secret": self.config.api_secret.reveal(),
        });
        debug!("Requesting a new gateway access token");
        let token = self
            .rest_query::<AccessToken, Value>(Method::POST, "/users/getToken", Some(body), None)
            .await
            .map_err(|e| match e {
                IamportApiError::Rejected { message, .. } => IamportApiError::Unauthorized(message),
                e => e,
            })?;
        let result = token.access_token.clone();
        *cache = Some(token);
        Ok(result)
    }

    /// Registers the amount the gateway should expect for `merchant_uid`. A payment for any other amount is refused by
    /// the gateway itself.
    pub async fn prepare_payment(&self, data: PrepareData) -> Result<PreparedPayment, IamportApiError> {
        let token = self.access_token().await?;
        debug!("Registering {} for {}", data.amount, data.merchant_uid);
        let prepared = self
            .rest_query::<PreparedPayment, PrepareData>(Method::POST, "/payments/prepare", Some(data), Some(&token))
            .await?;
        info!("Registered {} as the expected amount for {}", prepared.amount, prepared.merchant_uid);
        Ok(prepared)
    }

    pub async fn payment_by_imp_uid(&self, imp_uid: &str) -> Result<IamportPayment, IamportApiError> {
        let token = self.access_token().await?;
        let path = format!("/payments/{imp_uid}");
        debug!("Fetching payment {imp_uid}");
        let payment = self.rest_query::<IamportPayment, ()>(Method::GET, &path, None, Some(&token)).await?;
        info!("Fetched payment {imp_uid}. Status: {}, amount: {}", payment.status, payment.amount);
        Ok(payment)
    }

    pub async fn cancel_payment(&self, data: CancelData) -> Result<IamportPayment, IamportApiError> {
        let token = self.access_token().await?;
        let imp_uid = data.imp_uid.clone();
        debug!("Cancelling payment {imp_uid}. Amount: {:?}", data.amount);
        let payment =
            self.rest_query::<IamportPayment, CancelData>(Method::POST, "/payments/cancel", Some(data), Some(&token)).await?;
        info!("Cancelled payment {imp_uid}. Status is now {}", payment.status);
        Ok(payment)
    }
}
