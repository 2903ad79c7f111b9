use std::fmt::Debug;

use chrono::{Duration, Utc};
use lcm_common::{helpers::is_guest_id, Won};
use log::*;

use crate::{
    db_types::{NewOrder, OrderWithItems},
    helpers::{new_order_id, price_order},
    lcm_api::{errors::OrderFlowError, order_objects::CheckoutRequest},
    traits::{OrderManagement, PaymentGateway},
};

/// Builds priced orders from cart snapshots. This is the only place an order's `total_price` is ever computed.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: OrderManagement,
    G: PaymentGateway,
{
    /// Prices the cart and stores the order in `Pending` status, with every item `Preparing`.
    ///
    /// * Delivery is free from ₩40,000 of items, and ₩3,000 otherwise.
    /// * Points may pay for any part of the items and delivery, but not more.
    /// * 1% of the amount charged is accrued as points.
    ///
    /// The total is then registered with the gateway, so that it refuses to charge the order any other amount. This is
    /// best effort: if the gateway cannot be reached, the order stands and verification still checks the amount.
    pub async fn checkout(&self, user_id: &str, request: CheckoutRequest) -> Result<OrderWithItems, OrderFlowError> {
        if is_guest_id(user_id) {
            return Err(OrderFlowError::ValidationError("A signed-in user is required to check out".into()));
        }
        if request.payment_method.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("A payment method is required".into()));
        }
        if let Some(item) = request.items.iter().find(|i| i.product_id.trim().is_empty()) {
            return Err(OrderFlowError::ValidationError(format!("Item '{}' has no product id", item.product_name)));
        }
        let pricing = price_order(&request.items, request.used_point)?;
        let now = Utc::now();
        let order = NewOrder {
            order_id: new_order_id(now),
            user_id: user_id.to_string(),
            total_price: pricing.total_price,
            delivery_fee: pricing.delivery_fee,
            discount_amount: Won::zero(),
            used_point: pricing.used_point,
            saved_point: pricing.saved_point,
            payment_method: request.payment_method,
            payment_method_name: request.payment_method_name,
            contact: request.contact,
            estimated_date: Some(now + Duration::days(1)),
            items: request.items,
            created_at: now,
        };
        let order_id = order.order_id.clone();
        let result = self.db.insert_order(order).await?;
        info!(
            "📦️ Order {order_id} created for user {user_id}. Items: {}, delivery: {}, points used: {}, total: {}",
            pricing.items_total, pricing.delivery_fee, pricing.used_point, pricing.total_price
        );
        match self.gateway.prepare_transaction(order_id.as_str(), pricing.total_price).await {
            Ok(()) => debug!("📦️ {} registered with the gateway for order {order_id}", pricing.total_price),
            Err(e) => warn!("📦️ Could not register the amount of order {order_id} with the gateway. {e}"),
        }
        Ok(result)
    }
}
