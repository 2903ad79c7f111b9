//! # Live Commerce order server
//! The HTTP face of the order engine. It is responsible for:
//! * Creating orders from the storefront's cart snapshots.
//! * Verifying payments, both when the storefront reports them and when the payment gateway notifies us.
//! * Cancelling orders, refunding any payment at the gateway.
//! * A handful of administrative paths: fulfilment status updates, member withdrawal and refund reconciliation.
//!
//! Authentication happens upstream. The API gateway in front of this server forwards the signed-in user in the
//! `X-User-Id` header.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/payments/webhook`: The payment gateway's notification route. It can be restricted to an IP whitelist.
//! * `/api/...`: Everything else. See [routes](routes/index.html).
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;

pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;
