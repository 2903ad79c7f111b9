use lcm_common::Won;
use thiserror::Error;

use crate::db_types::NewOrderItem;

/// Orders whose items total at least this much ship for free.
pub const FREE_DELIVERY_THRESHOLD: Won = Won::new(40_000);
pub const DELIVERY_FEE: Won = Won::new(3_000);
/// Points accrued on the amount actually paid.
pub const POINT_ACCRUAL_PERCENT: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub items_total: Won,
    pub delivery_fee: Won,
    pub used_point: Won,
    pub total_price: Won,
    pub saved_point: Won,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    #[error("An order must contain at least one item")]
    NoItems,
    #[error("Item {0} must have a positive quantity")]
    InvalidQuantity(String),
    #[error("Item {0} has a negative price")]
    NegativePrice(String),
    #[error("Cannot use {used} of points. Allowed range is ₩0 to {max}")]
    InvalidPoints { used: Won, max: Won },
    #[error("The order total is too large to be charged")]
    Overflow,
}

pub fn delivery_fee_for(items_total: Won) -> Won {
    if items_total >= FREE_DELIVERY_THRESHOLD {
        Won::zero()
    } else {
        DELIVERY_FEE
    }
}

/// Prices a cart snapshot. The result is what the order will be charged, and is never recomputed afterwards.
pub fn price_order(items: &[NewOrderItem], used_point: Won) -> Result<PriceBreakdown, PricingError> {
    if items.is_empty() {
        return Err(PricingError::NoItems);
    }
    for item in items {
        if item.quantity <= 0 {
            return Err(PricingError::InvalidQuantity(item.product_id.clone()));
        }
        if item.total_price.is_negative() {
            return Err(PricingError::NegativePrice(item.product_id.clone()));
        }
    }
    let items_total = items
        .iter()
        .try_fold(Won::zero(), |total, i| total.checked_add(i.total_price))
        .ok_or(PricingError::Overflow)?;
    let delivery_fee = delivery_fee_for(items_total);
    let max_points = items_total.checked_add(delivery_fee).ok_or(PricingError::Overflow)?;
    if used_point.is_negative() || used_point > max_points {
        return Err(PricingError::InvalidPoints { used: used_point, max: max_points });
    }
    let total_price = max_points - used_point;
    let saved_point = total_price.checked_percent(POINT_ACCRUAL_PERCENT).ok_or(PricingError::Overflow)?;
    Ok(PriceBreakdown { items_total, delivery_fee, used_point, total_price, saved_point })
}
