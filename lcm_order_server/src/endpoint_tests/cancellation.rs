use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use lcm_common::Won;
use lcm_order_engine::{
    db_types::{OrderStatusType, RefundStatus},
    order_objects::WithdrawalSummary,
    traits::{GatewayCancelReceipt, GatewayError},
    CancellationApi,
    WITHDRAWAL_REASON,
};
use serde_json::{json, Value};

use super::{
    helpers::{cancel, order, payment, send_request},
    mocks::{MockGateway, MockOrderStore},
};
use crate::{
    data_objects::CancelOrderResponse,
    routes::{
        CancelOrderRoute,
        CancelRecordRoute,
        CancelableRoute,
        CancelledOrdersRoute,
        FailedRefundsRoute,
        MemberWithdrawalRoute,
        ReconcileRefundRoute,
    },
};

fn app(store: MockOrderStore, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(CancelledOrdersRoute::<MockOrderStore, MockGateway>::new())
            .service(CancelOrderRoute::<MockOrderStore, MockGateway>::new())
            .service(CancelRecordRoute::<MockOrderStore, MockGateway>::new())
            .service(CancelableRoute::<MockOrderStore, MockGateway>::new())
            .service(MemberWithdrawalRoute::<MockOrderStore, MockGateway>::new())
            .service(FailedRefundsRoute::<MockOrderStore, MockGateway>::new())
            .service(ReconcileRefundRoute::<MockOrderStore, MockGateway>::new())
            .app_data(web::Data::new(CancellationApi::new(store, gateway)));
    }
}

/// ORD_1 is paid (IMP1, 40,000), ORD_2 is pending and ORD_3 has shipped. All belong to user-1 and none were cancelled.
fn store() -> MockOrderStore {
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|id| {
        let status = match id.as_str() {
            "ORD_1" => OrderStatusType::PaymentCompleted,
            "ORD_2" => OrderStatusType::Pending,
            "ORD_3" => OrderStatusType::Shipping,
            _ => return Ok(None),
        };
        Ok(Some(order(id.as_str(), "user-1", status, 40_000)))
    });
    store.expect_fetch_cancel_for_order().returning(|_| Ok(None));
    store.expect_fetch_completed_payment_for_order().returning(|id| {
        Ok((id.as_str() == "ORD_1").then(|| payment("PAY_1", "ORD_1", "IMP1", 40_000)))
    });
    store
}

fn expect_commit(store: &mut MockOrderStore) {
    store.expect_commit_cancellation().times(1).returning(|c, terminal| {
        let mut record = cancel(c.order_id.as_str(), &c.user_id, c.refund_amount.value(), c.refund_status);
        record.payment_id = c.payment_id;
        record.external_cancel_id = c.external_cancel_id;
        record.reason = c.reason;
        Ok((record, order(c.order_id.as_str(), &c.user_id, terminal, 40_000)))
    });
}

fn cancel_request(order_id: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(&format!("/orders/{order_id}/cancel")).set_json(body)
}

#[actix_web::test]
async fn cancel_unpaid_order() {
    let _ = env_logger::try_init().ok();
    let mut store = store();
    expect_commit(&mut store);
    let mut gateway = MockGateway::new();
    gateway.expect_cancel_transaction().never();
    let req = cancel_request("ORD_2", json!({ "reason": "Changed my mind" }));
    let (status, body) = send_request(req, Some("user-1"), app(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let res: CancelOrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(res.order_status, OrderStatusType::Cancelled);
    assert_eq!(res.refund_status, RefundStatus::Completed);
    assert_eq!(res.refund_amount, Won::zero());
}

#[actix_web::test]
async fn cancel_paid_order_refunds_in_full() {
    let _ = env_logger::try_init().ok();
    let mut store = store();
    expect_commit(&mut store);
    let mut gateway = MockGateway::new();
    gateway.expect_cancel_transaction().times(1).returning(|req| {
        assert_eq!(req.external_transaction_id, "IMP1");
        assert!(req.amount.is_none());
        Ok(GatewayCancelReceipt { cancel_id: Some("T-1".to_string()), message: None })
    });
    let req = cancel_request("ORD_1", json!({ "userId": "user-1", "reason": "Changed my mind" }));
    let (status, body) = send_request(req, Some("user-1"), app(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["orderId"], "ORD_1");
    assert_eq!(raw["refundStatus"], "COMPLETED");
    assert_eq!(raw["refundAmount"], 40_000);
    assert_eq!(raw["externalCancelId"], "T-1");
    assert!(raw["cancelDate"].is_string());
}

#[actix_web::test]
async fn failed_refund_still_cancels() {
    let _ = env_logger::try_init().ok();
    let mut store = store();
    expect_commit(&mut store);
    let mut gateway = MockGateway::new();
    gateway.expect_cancel_transaction().returning(|_| Err(GatewayError::Unavailable("timed out".to_string())));
    let req = cancel_request("ORD_1", json!({ "reason": "Changed my mind", "refundAmount": 10000 }));
    let (status, body) = send_request(req, Some("user-1"), app(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let res: CancelOrderResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(res.refund_status, RefundStatus::Failed);
    assert_eq!(res.refund_amount, Won::from(10_000));
    assert_eq!(res.order_status, OrderStatusType::Cancelled);
}

#[actix_web::test]
async fn cancel_preconditions() {
    let _ = env_logger::try_init().ok();
    // Shipped orders cannot be cancelled
    let mut shipped_store = store();
    shipped_store.expect_commit_cancellation().never();
    let req = cancel_request("ORD_3", json!({ "reason": "Too slow" }));
    let (status, body) = send_request(req, Some("user-1"), app(shipped_store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Order ORD_3 cannot be cancelled while it is SHIPPING"}"#);

    // Someone else's order
    let req = cancel_request("ORD_2", json!({ "reason": "Mischief" }));
    let (status, _) = send_request(req, Some("user-2"), app(store(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The body names a different user than the signed-in one. The store is never consulted.
    let req = cancel_request("ORD_2", json!({ "userId": "user-1", "reason": "Mischief" }));
    let (status, _) = send_request(req, Some("user-2"), app(MockOrderStore::new(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Guests cannot cancel anything
    let req = cancel_request("ORD_2", json!({ "reason": "Anonymous" }));
    let (status, _) = send_request(req, Some("guest_1718000000000"), app(MockOrderStore::new(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Already cancelled
    let mut store = MockOrderStore::new();
    store.expect_fetch_order().returning(|id| Ok(Some(order(id.as_str(), "user-1", OrderStatusType::Cancelled, 40_000))));
    store.expect_fetch_cancel_for_order().returning(|id| Ok(Some(cancel(id.as_str(), "user-1", 0, RefundStatus::Completed))));
    let req = cancel_request("ORD_4", json!({ "reason": "Again" }));
    let (status, body) = send_request(req, Some("user-1"), app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Order ORD_4 has already been cancelled"}"#);
}

#[actix_web::test]
async fn cancelable_checks() {
    let check = |order_id: &str| TestRequest::get().uri(&format!("/orders/{order_id}/cancelable?userId=user-1"));
    let (status, body) = send_request(check("ORD_1"), Some("user-1"), app(store(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"orderId":"ORD_1","cancelable":true}"#);
    let (status, body) = send_request(check("ORD_3"), Some("user-1"), app(store(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"orderId":"ORD_3","cancelable":false}"#);
    let (status, _) = send_request(check("ORD_404"), Some("user-1"), app(store(), MockGateway::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn cancellation_records() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_cancel_for_order().returning(|id| Ok(Some(cancel(id.as_str(), "user-1", 40_000, RefundStatus::Completed))));
    store.expect_fetch_cancels_for_user().returning(|user| Ok(vec![cancel("ORD_1", user, 40_000, RefundStatus::Completed)]));
    let (status, body) =
        send_request(TestRequest::get().uri("/orders/ORD_1/cancel"), Some("user-1"), app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["refundStatus"], "COMPLETED");

    let mut store = MockOrderStore::new();
    store.expect_fetch_cancel_for_order().returning(|id| Ok(Some(cancel(id.as_str(), "user-1", 0, RefundStatus::Completed))));
    let (status, _) =
        send_request(TestRequest::get().uri("/orders/ORD_1/cancel"), Some("user-2"), app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let mut store = MockOrderStore::new();
    store.expect_fetch_cancels_for_user().returning(|user| Ok(vec![cancel("ORD_1", user, 40_000, RefundStatus::Completed)]));
    let req = TestRequest::get().uri("/orders/cancelled?userId=user-1");
    let (status, body) = send_request(req, Some("user-1"), app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw.as_array().map(|a| a.len()), Some(1));
}

#[actix_web::test]
async fn member_withdrawal() {
    let _ = env_logger::try_init().ok();
    let mut store = store();
    store.expect_fetch_orders_for_user().returning(|user| {
        Ok(vec![
            order("ORD_1", user, OrderStatusType::PaymentCompleted, 40_000),
            order("ORD_3", user, OrderStatusType::Shipping, 40_000),
        ])
    });
    store.expect_commit_cancellation().times(1).returning(|c, terminal| {
        assert_eq!(terminal, OrderStatusType::CancelledByWithdrawal);
        assert_eq!(c.reason, WITHDRAWAL_REASON);
        let record = cancel(c.order_id.as_str(), &c.user_id, c.refund_amount.value(), c.refund_status);
        Ok((record, order(c.order_id.as_str(), &c.user_id, terminal, 40_000)))
    });
    store.expect_transition_order_status().times(1).returning(|id, from, to| {
        assert_eq!(from, &[OrderStatusType::Shipping]);
        Ok(Some(order(id.as_str(), "user-1", to, 40_000)))
    });
    let mut gateway = MockGateway::new();
    gateway
        .expect_cancel_transaction()
        .times(1)
        .returning(|_| Ok(GatewayCancelReceipt { cancel_id: Some("T-9".to_string()), message: None }));

    let req = TestRequest::post().uri("/admin/users/user-1/withdrawal");
    let (status, body) = send_request(req, None, app(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let summary: WithdrawalSummary = serde_json::from_str(&body).unwrap();
    assert_eq!(summary.failures(), 0);
    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.outcomes[0].new_status, Some(OrderStatusType::CancelledByWithdrawal));
    assert_eq!(summary.outcomes[0].refund_status, Some(RefundStatus::Completed));
    assert_eq!(summary.outcomes[1].new_status, Some(OrderStatusType::ShippingMemberWithdrawn));
}

#[actix_web::test]
async fn refund_reconciliation() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_failed_refunds().returning(|| Ok(vec![cancel("ORD_1", "user-1", 40_000, RefundStatus::Failed)]));
    let (status, body) =
        send_request(TestRequest::get().uri("/admin/refunds/failed"), None, app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw[0]["refundStatus"], "FAILED");

    // Only FAILED -> COMPLETED is a valid correction
    let mut store = MockOrderStore::new();
    store.expect_reconcile_refund().never();
    let req = TestRequest::put().uri("/admin/refunds/ORD_1").set_json(json!({ "refundStatus": "FAILED" }));
    let (status, _) = send_request(req, None, app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut store = MockOrderStore::new();
    store.expect_reconcile_refund().times(1).returning(|id, external_id, note| {
        assert_eq!(external_id.as_deref(), Some("T-77"));
        assert!(!note.is_empty());
        let mut record = cancel(id.as_str(), "user-1", 40_000, RefundStatus::Completed);
        record.external_cancel_id = external_id;
        Ok(record)
    });
    let req = TestRequest::put()
        .uri("/admin/refunds/ORD_1")
        .set_json(json!({ "refundStatus": "COMPLETED", "externalCancelId": "T-77" }));
    let (status, body) = send_request(req, None, app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["refundStatus"], "COMPLETED");
    assert_eq!(raw["externalCancelId"], "T-77");
}
