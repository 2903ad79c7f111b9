//! # Order engine public API
//!
//! The `lcm_api` module exposes the programmatic API of the order engine. Each API is created by supplying a storage
//! backend (and, where money moves, a payment gateway) that implements the traits it needs.
//!
//! * [`checkout_api`] prices cart snapshots and creates orders.
//! * [`payment_flow_api`] verifies gateway transactions against orders, idempotently.
//! * [`cancellation_api`] runs the cancellation saga, the member withdrawal batch and refund reconciliation.
//! * [`order_admin_api`] provides order queries and administrative status changes.
//!
//! ```rust,ignore
//! use lcm_order_engine::{PaymentFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = PaymentFlowApi::new(db, my_gateway);
//! let result = api.verify("imp_123", "ORD_20240301120000_0a1b2c3d", "user-1").await?;
//! ```
pub mod cancellation_api;
pub mod checkout_api;
pub mod errors;
pub mod order_admin_api;
pub mod order_objects;
pub mod payment_flow_api;
