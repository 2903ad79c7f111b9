use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use lcm_order_engine::OrderFlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("A signed-in user is required for this request.")]
    MissingUserId,
    #[error("Requests from this address are not accepted.")]
    ForbiddenPeer,
    #[error("The user id in the request does not match the signed-in user.")]
    UserMismatch,
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::MissingUserId => StatusCode::UNAUTHORIZED,
            Self::ForbiddenPeer => StatusCode::FORBIDDEN,
            Self::UserMismatch => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::OrderFlow(e) => order_flow_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

fn order_flow_status(e: &OrderFlowError) -> StatusCode {
    use OrderFlowError::*;
    match e {
        ValidationError(_) | PaymentNotCompleted(_) | AmountMismatch { .. } => StatusCode::BAD_REQUEST,
        Unauthorized(_) => StatusCode::FORBIDDEN,
        OrderNotFound(_) | PaymentNotFound(_) | CancelNotFound(_) => StatusCode::NOT_FOUND,
        DuplicatePayment(_)
        | OrderNotPayable(..)
        | OrderAlreadyPaid(_)
        | AlreadyCancelled(_)
        | NotCancellable(..)
        | ForbiddenTransition { .. }
        | ConcurrentModification(_) => StatusCode::CONFLICT,
        GatewayRejected(_) | RefundFailed(_) => StatusCode::BAD_GATEWAY,
        GatewayUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
