//! # Iamport gateway client
//!
//! A thin REST client for the Iamport (PortOne v1) payment gateway. It covers exactly the calls the order engine
//! needs: exchanging API credentials for an access token, registering the expected amount of an order before it is
//! paid, looking up a payment by its `imp_uid`, and cancelling (fully or partially) a payment.
//!
//! The client knows nothing about orders. Interpreting a payment record is the job of the caller.
mod api;
mod config;
mod error;

mod data_objects;
pub mod helpers;

pub use api::IamportApi;
pub use config::IamportConfig;
pub use data_objects::{
    AccessToken,
    CancelData,
    CancelHistoryEntry,
    IamportPayment,
    IamportResponse,
    PaymentStatus,
    PrepareData,
    PreparedPayment,
};
pub use error::IamportApiError;
