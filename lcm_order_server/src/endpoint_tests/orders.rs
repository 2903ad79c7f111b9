use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use lcm_common::Won;
use lcm_order_engine::{
    db_types::{OrderStatusType, OrderWithItems},
    traits::GatewayError,
    CheckoutApi,
    OrderAdminApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{item, order, send_request},
    mocks::{MockGateway, MockOrderStore},
};
use crate::routes::{health, CheckoutRoute, MyOrdersRoute, OrderByIdRoute, UpdateOrderStatusRoute};

#[actix_web::test]
async fn health_endpoint() {
    let (status, body) = send_request(TestRequest::get().uri("/health"), None, |cfg| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn fetch_my_orders_requires_a_user() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/orders"), None, configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"A signed-in user is required for this request."}"#);
    let (status, _) = send_request(TestRequest::get().uri("/orders"), Some("guest_1718000000000"), configure).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send_request(TestRequest::get().uri("/orders"), Some("user-1"), configure).await;
    assert_eq!(status, StatusCode::OK);
    let orders: Vec<OrderWithItems> = serde_json::from_str(&body).unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].order.order_id.as_str(), "ORD_2");
    assert_eq!(orders[0].items.len(), 1);
    assert_eq!(orders[1].order.order_status, OrderStatusType::PaymentCompleted);
    // Flattened order fields, camelCase
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw[0]["orderId"], "ORD_2");
    assert_eq!(raw[0]["totalPrice"], 43_000);
    assert_eq!(raw[0]["orderStatus"], "PENDING");
    assert_eq!(raw[0]["items"][0]["productId"], "P-100");
}

#[actix_web::test]
async fn fetch_someone_elses_orders() {
    let _ = env_logger::try_init().ok();
    let (status, _) = send_request(TestRequest::get().uri("/orders?userId=user-1"), Some("user-1"), configure).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send_request(TestRequest::get().uri("/orders?userId=user-2"), Some("user-1"), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send_request(TestRequest::get().uri("/orders/ORD_9"), Some("user-1"), configure).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Not authorized to access order ORD_9"}"#);
}

#[actix_web::test]
async fn fetch_single_order() {
    let (status, body) = send_request(TestRequest::get().uri("/orders/ORD_1"), Some("user-1"), configure).await;
    assert_eq!(status, StatusCode::OK);
    let order: OrderWithItems = serde_json::from_str(&body).unwrap();
    assert_eq!(order.order.total_price, Won::from(40_000));
    let (status, _) = send_request(TestRequest::get().uri("/orders/ORD_404"), Some("user-1"), configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn checkout() {
    let _ = env_logger::try_init().ok();
    let body = json!({
        "items": [
            {"productId": "P-100", "productName": "Live deal tumbler", "quantity": 2, "totalPrice": 30000},
            {"productId": "P-200", "productName": "Sticker pack", "quantity": 1, "totalPrice": 10000}
        ],
        "paymentMethod": "card",
        "recipientName": "홍길동"
    });
    let req = TestRequest::post().uri("/orders/checkout").set_json(&body);
    let (status, _) = send_request(req, None, configure_checkout).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::post().uri("/orders/checkout").set_json(&body);
    let (status, body) = send_request(req, Some("user-1"), configure_checkout).await;
    assert_eq!(status, StatusCode::CREATED);
    let order: OrderWithItems = serde_json::from_str(&body).unwrap();
    assert_eq!(order.order.total_price, Won::from(40_000));
    assert_eq!(order.order.delivery_fee, Won::zero());
    assert_eq!(order.order.saved_point, Won::from(400));
    assert_eq!(order.order.order_status, OrderStatusType::Pending);
    assert_eq!(order.items.len(), 2);
    assert!(order.items.iter().all(|i| i.status == OrderStatusType::Preparing));
}

#[actix_web::test]
async fn checkout_validation() {
    let body = json!({ "items": [], "paymentMethod": "card" });
    let req = TestRequest::post().uri("/orders/checkout").set_json(&body);
    let (status, body) = send_request(req, Some("user-1"), configure_checkout).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("error"));
}

#[actix_web::test]
async fn admin_status_updates() {
    let req = TestRequest::put().uri("/admin/orders/ORD_1/status").set_json(json!({"status": "SHIPPING"}));
    let (status, body) = send_request(req, None, configure).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["orderStatus"], "SHIPPING");

    let req = TestRequest::put().uri("/admin/orders/ORD_1/status").set_json(json!({"status": "CANCELLED"}));
    let (status, body) = send_request(req, None, configure).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Order ORD_1 cannot move from PAYMENT_COMPLETED to CANCELLED"}"#);
}

fn configure(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_fetch_orders_for_user().returning(|user| {
        Ok(vec![
            order("ORD_2", user, OrderStatusType::Pending, 43_000),
            order("ORD_1", user, OrderStatusType::PaymentCompleted, 40_000),
        ])
    });
    store.expect_fetch_order().returning(|id| {
        Ok(match id.as_str() {
            "ORD_1" => Some(order("ORD_1", "user-1", OrderStatusType::PaymentCompleted, 40_000)),
            "ORD_9" => Some(order("ORD_9", "user-2", OrderStatusType::Pending, 10_000)),
            _ => None,
        })
    });
    store.expect_fetch_order_items().returning(|id| Ok(vec![item(id.as_str(), OrderStatusType::Preparing, 40_000)]));
    store.expect_update_order_status().returning(|id, status| {
        let mut order = order(id.as_str(), "user-1", status, 40_000);
        order.tracking_number = Some("TRK1717243200000".to_string());
        Ok(order)
    });
    cfg.service(MyOrdersRoute::<MockOrderStore>::new())
        .service(OrderByIdRoute::<MockOrderStore>::new())
        .service(UpdateOrderStatusRoute::<MockOrderStore>::new())
        .app_data(web::Data::new(OrderAdminApi::new(store)));
}

fn configure_checkout(cfg: &mut ServiceConfig) {
    let mut store = MockOrderStore::new();
    store.expect_insert_order().times(..=1).returning(|new_order| {
        let mut o = order(new_order.order_id.as_str(), &new_order.user_id, OrderStatusType::Pending, 0);
        o.total_price = new_order.total_price;
        o.delivery_fee = new_order.delivery_fee;
        o.saved_point = new_order.saved_point;
        let items = new_order
            .items
            .iter()
            .map(|i| {
                let mut it = item(new_order.order_id.as_str(), OrderStatusType::Preparing, 0);
                it.product_id = i.product_id.clone();
                it.total_price = i.total_price;
                it
            })
            .collect();
        Ok(OrderWithItems { order: o, items })
    });
    // The gateway cannot register the amount. Checkout goes ahead regardless.
    let mut gateway = MockGateway::new();
    gateway.expect_prepare_transaction().times(..=1).returning(|order_id, amount| {
        assert!(order_id.starts_with("ORD_"));
        assert_eq!(amount, Won::from(40_000));
        Err(GatewayError::Unavailable("connection refused".to_string()))
    });
    cfg.service(CheckoutRoute::<MockOrderStore, MockGateway>::new())
        .app_data(web::Data::new(CheckoutApi::new(store, gateway)));
}
