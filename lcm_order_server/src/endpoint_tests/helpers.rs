use actix_web::{http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use lcm_common::Won;
use lcm_order_engine::db_types::{
    Order,
    OrderCancel,
    OrderId,
    OrderItem,
    OrderStatusType,
    Payment,
    PaymentStatus,
    RefundStatus,
};
use log::debug;

use crate::helpers::USER_ID_HEADER;

/// Sends `req`, signed in as `user` if given, to an app set up by `configure`.
pub async fn send_request<F>(req: TestRequest, user: Option<&str>, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let req = match user {
        Some(user) => req.insert_header((USER_ID_HEADER, user)),
        None => req,
    };
    let app = test::init_service(App::new().configure(configure)).await;
    debug!("Making request");
    let res = test::call_service(&app, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn order(order_id: &str, user_id: &str, status: OrderStatusType, total: i64) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Order {
        order_id: OrderId::from(order_id),
        user_id: user_id.to_string(),
        order_status: status,
        total_price: Won::from(total),
        delivery_fee: Won::zero(),
        discount_amount: Won::zero(),
        used_point: Won::zero(),
        saved_point: Won::from(total).percent(1),
        payment_method: "card".to_string(),
        payment_method_name: Some("신용카드".to_string()),
        phone: None,
        email: None,
        recipient_name: Some("홍길동".to_string()),
        recipient_phone: None,
        zipcode: None,
        address_detail: None,
        delivery_memo: None,
        estimated_date: None,
        shipping_date: None,
        tracking_number: None,
        delivery_company: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn item(order_id: &str, status: OrderStatusType, total: i64) -> OrderItem {
    OrderItem {
        order_item_id: 1,
        order_id: OrderId::from(order_id),
        product_id: "P-100".to_string(),
        product_name: "Live deal tumbler".to_string(),
        quantity: 2,
        total_price: Won::from(total),
        status,
        image_url: None,
    }
}

pub fn payment(payment_id: &str, order_id: &str, imp_uid: &str, amount: i64) -> Payment {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 5, 0).unwrap();
    Payment {
        payment_id: payment_id.to_string(),
        order_id: OrderId::from(order_id),
        external_transaction_id: imp_uid.to_string(),
        amount: Won::from(amount),
        status: PaymentStatus::Completed,
        method: Some("card".to_string()),
        approval_number: Some("30012345".to_string()),
        card_name: Some("KB".to_string()),
        bank_name: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn cancel(order_id: &str, user_id: &str, refund: i64, status: RefundStatus) -> OrderCancel {
    let cancel_date = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap();
    OrderCancel {
        id: 1,
        order_id: OrderId::from(order_id),
        user_id: user_id.to_string(),
        reason: "Changed my mind".to_string(),
        refund_amount: Won::from(refund),
        refund_status: status,
        payment_id: None,
        external_cancel_id: None,
        cancel_date,
        updated_at: cancel_date,
    }
}
