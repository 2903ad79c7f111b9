//! Live Commerce Order Engine
//!
//! The order engine keeps orders and payments consistent across the marketplace's own database and an external
//! payment gateway. The gateway and the database cannot share a transaction, so the engine relies on two things:
//! the uniqueness of the gateway's transaction id in storage, which makes verification idempotent, and compensating
//! gateway calls whose outcome, failure included, is always persisted.
//!
//! The library is divided into these sections:
//! 1. Storage contracts ([`mod@traits`]) and the SQLite backend that implements them ([`SqliteDatabase`]). The data
//!    types stored in the database are defined in [`mod@db_types`].
//! 2. The public API ([`mod@lcm_api`]): checkout, payment verification, the cancellation saga and order
//!    administration. The HTTP server is a thin layer over these.
pub mod db_types;
pub mod helpers;
mod lcm_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use lcm_api::{
    cancellation_api::{CancellationApi, WITHDRAWAL_REASON},
    checkout_api::CheckoutApi,
    errors::OrderFlowError,
    order_admin_api::OrderAdminApi,
    order_objects,
    payment_flow_api::PaymentFlowApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, DEFAULT_DELIVERY_COMPANY};
