#![allow(dead_code)]
use lcm_common::Won;
use lcm_order_engine::{
    db_types::{ContactDetails, NewOrderItem, OrderId, OrderStatusType, OrderWithItems},
    order_objects::CheckoutRequest,
    traits::OrderManagement,
    test_utils::{
        gateway::ScriptedGateway,
        prepare_env::fresh_order_store,
    },
    CancellationApi,
    CheckoutApi,
    OrderAdminApi,
    PaymentFlowApi,
    SqliteDatabase,
};

pub struct TestSystem {
    pub db: SqliteDatabase,
    pub gateway: ScriptedGateway,
    pub checkout: CheckoutApi<SqliteDatabase, ScriptedGateway>,
    pub payments: PaymentFlowApi<SqliteDatabase, ScriptedGateway>,
    pub cancels: CancellationApi<SqliteDatabase, ScriptedGateway>,
    pub admin: OrderAdminApi<SqliteDatabase>,
}

pub async fn setup() -> TestSystem {
    let db = fresh_order_store().await;
    let gateway = ScriptedGateway::new();
    TestSystem {
        checkout: CheckoutApi::new(db.clone(), gateway.clone()),
        payments: PaymentFlowApi::new(db.clone(), gateway.clone()),
        cancels: CancellationApi::new(db.clone(), gateway.clone()),
        admin: OrderAdminApi::new(db.clone()),
        db,
        gateway,
    }
}

pub fn cart(prices: &[i64]) -> CheckoutRequest {
    let items = prices
        .iter()
        .enumerate()
        .map(|(i, p)| NewOrderItem {
            product_id: format!("P{i:03}"),
            product_name: format!("Product {i}"),
            quantity: 1,
            total_price: Won::from(*p),
            image_url: None,
        })
        .collect();
    CheckoutRequest {
        items,
        used_point: Won::zero(),
        payment_method: "card".into(),
        payment_method_name: Some("Credit card".into()),
        contact: ContactDetails { recipient_name: Some("Kim Minsu".into()), ..Default::default() },
    }
}

/// Checks out a two item cart worth ₩40,000, which ships for free.
pub async fn order_of_40000(system: &TestSystem, user_id: &str) -> OrderWithItems {
    system.checkout.checkout(user_id, cart(&[25_000, 15_000])).await.expect("Checkout failed")
}

pub async fn status_of(db: &SqliteDatabase, order_id: &OrderId) -> OrderStatusType {
    db.fetch_order(order_id).await.unwrap().expect("Order not found").order_status
}
