//! Identifier generation for orders and payments.
//!
//! Order ids are handed to the gateway as the `merchant_uid`, so they must be unique and stable strings. Both formats
//! embed a timestamp for human readability and eight random hex digits to avoid collisions within the same tick.
use chrono::{DateTime, Utc};
use rand::Rng;

use crate::db_types::OrderId;

/// `ORD_<yyyymmddHHMMSS>_<8 hex>`
pub fn new_order_id(now: DateTime<Utc>) -> OrderId {
    let suffix: u32 = rand::thread_rng().gen();
    OrderId(format!("ORD_{}_{suffix:08x}", now.format("%Y%m%d%H%M%S")))
}

/// `PAY_<epoch millis>_<8 hex>`
pub fn new_payment_id(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("PAY_{}_{suffix:08x}", now.timestamp_millis())
}
