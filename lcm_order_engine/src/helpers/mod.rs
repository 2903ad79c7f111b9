mod ids;
mod pricing;

pub use ids::{new_order_id, new_payment_id};
pub use pricing::{delivery_fee_for, price_order, PriceBreakdown, PricingError, DELIVERY_FEE, FREE_DELIVERY_THRESHOLD};
