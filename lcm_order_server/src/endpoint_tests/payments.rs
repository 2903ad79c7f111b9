use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use lcm_common::Won;
use lcm_order_engine::{
    db_types::{AuditKind, OrderStatusType, PaymentAudit},
    traits::{GatewayCancelReceipt, GatewayError, GatewayPaymentStatus, GatewayTransaction, OrderStoreError},
    PaymentFlowApi,
};
use serde_json::{json, Value};

use super::{
    helpers::{order, payment, send_request},
    mocks::{MockGateway, MockOrderStore},
};
use crate::{
    data_objects::PaymentVerificationResponse,
    routes::{OrderAuditRoute, PaymentByIdRoute, PaymentWebhookRoute, VerifyPaymentRoute},
};

fn transaction(imp_uid: &str, order_id: &str, amount: i64, status: GatewayPaymentStatus) -> GatewayTransaction {
    GatewayTransaction {
        external_transaction_id: imp_uid.to_string(),
        order_reference: order_id.to_string(),
        status,
        amount: Won::from(amount),
        method: Some("card".to_string()),
        approval_number: Some("30012345".to_string()),
        card_name: Some("KB".to_string()),
        bank_name: None,
    }
}

fn app(store: MockOrderStore, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(VerifyPaymentRoute::<MockOrderStore, MockGateway>::new())
            .service(PaymentByIdRoute::<MockOrderStore, MockGateway>::new())
            .service(OrderAuditRoute::<MockOrderStore, MockGateway>::new())
            .service(web::scope("/webhook").service(PaymentWebhookRoute::<MockOrderStore, MockGateway>::new()))
            .app_data(web::Data::new(PaymentFlowApi::new(store, gateway)));
    }
}

/// A store that has never seen a payment for ORD_1, a pending order of 40,000.
fn fresh_store() -> MockOrderStore {
    let mut store = MockOrderStore::new();
    store.expect_fetch_payment_by_external_id().returning(|_| Ok(None));
    store.expect_fetch_order().returning(|id| Ok(Some(order(id.as_str(), "user-1", OrderStatusType::Pending, 40_000))));
    store
}

fn verify_request(imp_uid: &str, order_id: &str) -> TestRequest {
    TestRequest::post().uri("/payments/verify").set_json(json!({ "impUid": imp_uid, "merchantUid": order_id }))
}

#[actix_web::test]
async fn verify_new_payment() {
    let _ = env_logger::try_init().ok();
    let mut store = fresh_store();
    store.expect_insert_payment().times(1).returning(|p| {
        let mut stored = payment(&p.payment_id, p.order_id.as_str(), &p.external_transaction_id, 0);
        stored.amount = p.amount;
        Ok(stored)
    });
    store.expect_transition_order_status().times(1).returning(|id, from, to| {
        assert!(from.contains(&OrderStatusType::Pending));
        Ok(Some(order(id.as_str(), "user-1", to, 40_000)))
    });
    let mut gateway = MockGateway::new();
    gateway
        .expect_query_transaction()
        .times(1)
        .returning(|id| Ok(transaction(id, "ORD_1", 40_000, GatewayPaymentStatus::Paid)));

    let (status, body) = send_request(verify_request("IMP1", "ORD_1"), Some("user-1"), app(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let res: PaymentVerificationResponse = serde_json::from_str(&body).unwrap();
    assert!(res.success);
    assert!(!res.already_processed);
    assert!(res.payment_id.starts_with("PAY_"));
    assert_eq!(res.order_id.as_str(), "ORD_1");
    assert_eq!(res.amount, Won::from(40_000));
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["status"], "COMPLETED");
}

#[actix_web::test]
async fn verified_transactions_are_not_queried_again() {
    let _ = env_logger::try_init().ok();
    let mut store = MockOrderStore::new();
    store.expect_fetch_payment_by_external_id().returning(|id| Ok(Some(payment("PAY_1", "ORD_1", id, 40_000))));
    store
        .expect_fetch_order()
        .returning(|id| Ok(Some(order(id.as_str(), "user-1", OrderStatusType::PaymentCompleted, 40_000))));
    store.expect_insert_payment().never();
    let mut gateway = MockGateway::new();
    gateway.expect_query_transaction().never();

    let (status, body) = send_request(verify_request("IMP1", "ORD_1"), None, app(store, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let res: PaymentVerificationResponse = serde_json::from_str(&body).unwrap();
    assert!(res.already_processed);
    assert_eq!(res.payment_id, "PAY_1");
}

#[actix_web::test]
async fn amount_mismatch_is_refunded() {
    let _ = env_logger::try_init().ok();
    let mut store = fresh_store();
    store.expect_insert_payment().never();
    store.expect_record_audit().times(1).returning(|e| {
        assert_eq!(e.kind, AuditKind::AmountMismatch);
        assert_eq!(e.expected_amount, Some(Won::from(40_000)));
        assert_eq!(e.actual_amount, Some(Won::from(35_000)));
        Ok(PaymentAudit {
            id: 1,
            external_transaction_id: e.external_transaction_id,
            order_id: e.order_id,
            kind: e.kind,
            expected_amount: e.expected_amount,
            actual_amount: e.actual_amount,
            detail: e.detail,
            created_at: Utc::now(),
        })
    });
    let mut gateway = MockGateway::new();
    gateway
        .expect_query_transaction()
        .returning(|id| Ok(transaction(id, "ORD_2", 35_000, GatewayPaymentStatus::Paid)));
    gateway.expect_cancel_transaction().times(1).returning(|req| {
        assert!(req.amount.is_none());
        Ok(GatewayCancelReceipt { cancel_id: Some("T-1".to_string()), message: None })
    });

    let (status, body) = send_request(verify_request("IMP2", "ORD_2"), Some("user-1"), app(store, gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Payment amount ₩35000 does not match the order total of ₩40000"}"#);
}

#[actix_web::test]
async fn verify_rejects_blank_ids() {
    let store = MockOrderStore::new();
    let gateway = MockGateway::new();
    let (status, _) = send_request(verify_request(" ", "ORD_1"), Some("user-1"), app(store, gateway)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_answers() {
    let _ = env_logger::try_init().ok();
    let webhook = |imp_uid: &str| {
        TestRequest::post().uri("/webhook").set_json(json!({ "imp_uid": imp_uid, "merchant_uid": "ORD_1", "status": "paid" }))
    };

    // The gateway is down: ask for a redelivery
    let mut gateway = MockGateway::new();
    gateway.expect_query_transaction().returning(|_| Err(GatewayError::Unavailable("timed out".to_string())));
    let (status, body) = send_request(webhook("IMP1"), None, app(fresh_store(), gateway)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["success"], false);

    // A business failure is acknowledged, so that the gateway stops retrying
    let mut gateway = MockGateway::new();
    gateway
        .expect_query_transaction()
        .returning(|id| Ok(transaction(id, "ORD_1", 40_000, GatewayPaymentStatus::Ready)));
    let (status, body) = send_request(webhook("IMP1"), None, app(fresh_store(), gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["success"], false);
    assert_eq!(raw["message"], "The payment has not been completed. Gateway status is ready");

    // Already verified by the client
    let mut store = MockOrderStore::new();
    store.expect_fetch_payment_by_external_id().returning(|id| Ok(Some(payment("PAY_1", "ORD_1", id, 40_000))));
    store
        .expect_fetch_order()
        .returning(|id| Ok(Some(order(id.as_str(), "user-1", OrderStatusType::PaymentCompleted, 40_000))));
    let (status, body) = send_request(webhook("IMP1"), None, app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"success":true,"message":"PAY_1"}"#);
}

#[actix_web::test]
async fn webhook_ignores_unpaid_notifications() {
    let _ = env_logger::try_init().ok();
    for reported in ["ready", "cancelled", "FAILED"] {
        let mut gateway = MockGateway::new();
        gateway.expect_query_transaction().never();
        let mut store = MockOrderStore::new();
        store.expect_fetch_payment_by_external_id().never();
        store.expect_insert_payment().never();
        let req = TestRequest::post()
            .uri("/webhook")
            .set_json(json!({ "imp_uid": "IMP1", "merchant_uid": "ORD_1", "status": reported }));
        let (status, body) = send_request(req, None, app(store, gateway)).await;
        assert_eq!(status, StatusCode::OK);
        let raw: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(raw["success"], true);
        assert_eq!(raw["message"], format!("Notification for a {reported} transaction ignored"));
    }
}

#[actix_web::test]
async fn payment_for_an_order_that_moved_on_is_refunded() {
    let _ = env_logger::try_init().ok();
    let mut store = fresh_store();
    store.expect_insert_payment().times(1).returning(|p| Err(OrderStoreError::OrderAlreadyPaid(p.order_id)));
    store.expect_transition_order_status().never();
    store.expect_record_audit().times(1).returning(|e| {
        assert_eq!(e.kind, AuditKind::AutoCancelled);
        assert_eq!(e.external_transaction_id.as_deref(), Some("IMP3"));
        Ok(PaymentAudit {
            id: 1,
            external_transaction_id: e.external_transaction_id,
            order_id: e.order_id,
            kind: e.kind,
            expected_amount: e.expected_amount,
            actual_amount: e.actual_amount,
            detail: e.detail,
            created_at: Utc::now(),
        })
    });
    let mut gateway = MockGateway::new();
    gateway
        .expect_query_transaction()
        .returning(|id| Ok(transaction(id, "ORD_1", 40_000, GatewayPaymentStatus::Paid)));
    gateway.expect_cancel_transaction().times(1).returning(|req| {
        assert_eq!(req.external_transaction_id, "IMP3");
        assert!(req.amount.is_none());
        Ok(GatewayCancelReceipt { cancel_id: Some("T-2".to_string()), message: None })
    });

    let (status, body) = send_request(verify_request("IMP3", "ORD_1"), Some("user-1"), app(store, gateway)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"Order ORD_1 has already been paid by another transaction"}"#);
}

#[actix_web::test]
async fn payment_lookup() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_payment().returning(|id| Ok((id == "PAY_1").then(|| payment("PAY_1", "ORD_1", "IMP1", 40_000))));
    let (status, body) =
        send_request(TestRequest::get().uri("/payments/PAY_1"), Some("user-1"), app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw["externalTransactionId"], "IMP1");

    let mut store = MockOrderStore::new();
    store.expect_fetch_payment().returning(|_| Ok(None));
    let (status, _) =
        send_request(TestRequest::get().uri("/payments/PAY_9"), Some("user-1"), app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn order_audit_trail() {
    let mut store = MockOrderStore::new();
    store.expect_fetch_audit_for_order().times(1).returning(|id| {
        assert_eq!(id.as_str(), "ORD_1");
        Ok(vec![PaymentAudit {
            id: 7,
            external_transaction_id: Some("IMP_LATE".to_string()),
            order_id: Some(id.clone()),
            kind: AuditKind::AutoCancelled,
            expected_amount: Some(Won::from(40_000)),
            actual_amount: Some(Won::from(40_000)),
            detail: "Order ORD_1 cannot accept a payment while it is CANCELLED".to_string(),
            created_at: Utc::now(),
        }])
    });
    let req = TestRequest::get().uri("/admin/orders/ORD_1/audit");
    let (status, body) = send_request(req, Some("admin"), app(store, MockGateway::new())).await;
    assert_eq!(status, StatusCode::OK);
    let raw: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(raw.as_array().map(|a| a.len()), Some(1));
    assert_eq!(raw[0]["kind"], "AUTO_CANCELLED");
    assert_eq!(raw[0]["externalTransactionId"], "IMP_LATE");
}
