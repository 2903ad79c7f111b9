use thiserror::Error;

#[derive(Debug, Error)]
pub enum IamportApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Could not reach the gateway: {0}")]
    Transport(String),
    #[error("The gateway did not answer in time: {0}")]
    Timeout(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The gateway rejected the request (code {code}). {message}")]
    Rejected { code: i64, message: String },
    #[error("The gateway returned an empty response")]
    EmptyResponse,
    #[error("Could not obtain an access token: {0}")]
    Unauthorized(String),
    #[error("Invalid currency amount: {0}")]
    InvalidCurrencyAmount(String),
}

impl IamportApiError {
    /// Transport level failures are worth retrying. Anything the gateway answered deliberately is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::QueryError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for IamportApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_decode() {
            Self::JsonError(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
