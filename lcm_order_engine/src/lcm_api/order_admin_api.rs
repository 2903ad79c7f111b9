use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderId, OrderStatusType, OrderWithItems},
    lcm_api::errors::OrderFlowError,
    traits::OrderManagement,
};

/// Read access to orders, and the administrative status changes that sit outside the payment and cancellation flows.
pub struct OrderAdminApi<B> {
    db: B,
}

impl<B> Debug for OrderAdminApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderAdminApi")
    }
}

impl<B> OrderAdminApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> OrderAdminApi<B>
where B: OrderManagement
{
    /// Fetches an order and its items. Only the owner of the order may see it.
    pub async fn order_for_user(&self, order_id: &OrderId, user_id: &str) -> Result<OrderWithItems, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        if order.user_id != user_id {
            return Err(OrderFlowError::Unauthorized(order_id.clone()));
        }
        let items = self.db.fetch_order_items(order_id).await?;
        Ok(OrderWithItems { order, items })
    }

    /// All the user's orders with their items, newest first.
    pub async fn orders_for_user(&self, user_id: &str) -> Result<Vec<OrderWithItems>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.db.fetch_order_items(&order.order_id).await?;
            result.push(OrderWithItems { order, items });
        }
        Ok(result)
    }

    /// Moves an order forward along the state machine. Cancellation statuses are refused here. Orders are only ever
    /// cancelled through the cancellation saga.
    pub async fn update_status(&self, order_id: &OrderId, status: OrderStatusType) -> Result<Order, OrderFlowError> {
        if status.is_cancellation() {
            let order =
                self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
            warn!("📦️ Refusing to set order {order_id} to {status} outside the cancellation flow");
            return Err(OrderFlowError::ForbiddenTransition {
                order_id: order_id.clone(),
                from: order.order_status,
                to: status,
            });
        }
        let order = self.db.update_order_status(order_id, status).await?;
        Ok(order)
    }
}
