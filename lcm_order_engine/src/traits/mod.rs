//! # Storage and gateway contracts
//!
//! The engine APIs are written against these traits rather than a concrete database or gateway, so that the HTTP
//! server can be tested with mocks and the engine can be tested with a scripted gateway.
//!
//! * [`OrderManagement`] stores orders and their items, and owns the conditional status updates that keep concurrent
//!   writers from resurrecting a cancelled order.
//! * [`PaymentStore`] stores verified payments keyed by the gateway's transaction id. Its uniqueness constraint is the
//!   idempotency guard. It also holds the payment audit trail.
//! * [`CancellationManagement`] records cancellation outcomes and supports manual refund reconciliation.
//! * [`PaymentGateway`] queries and refunds transactions at the external processor.
mod cancellation_management;
mod data_objects;
mod order_management;
mod payment_gateway;
mod payment_store;

pub use cancellation_management::CancellationManagement;
pub use data_objects::{GatewayCancelReceipt, GatewayCancelRequest, GatewayPaymentStatus, GatewayTransaction};
pub use order_management::{OrderManagement, OrderStoreError};
pub use payment_gateway::{GatewayError, PaymentGateway};
pub use payment_store::PaymentStore;
