use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, OrderId, Payment, PaymentStatus},
    traits::OrderStoreError,
};

/// Inserts the payment. A second payment with the same `external_transaction_id` is reported as
/// [`OrderStoreError::DuplicatePayment`]. A second completed payment for the same order is reported as
/// [`OrderStoreError::OrderAlreadyPaid`].
pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, OrderStoreError> {
    let external_id = payment.external_transaction_id.clone();
    let order_id = payment.order_id.clone();
    let now = Utc::now();
    let payment = sqlx::query_as(
        r#"
            INSERT INTO payments (
                payment_id,
                order_id,
                external_transaction_id,
                amount,
                status,
                method,
                approval_number,
                card_name,
                bank_name,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *;
        "#,
    )
    .bind(payment.payment_id)
    .bind(payment.order_id.as_str())
    .bind(payment.external_transaction_id)
    .bind(payment.amount)
    .bind(payment.status)
    .bind(payment.method)
    .bind(payment.approval_number)
    .bind(payment.card_name)
    .bind(payment.bank_name)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            if err.message().contains("external_transaction_id") {
                OrderStoreError::DuplicatePayment(external_id)
            } else {
                OrderStoreError::OrderAlreadyPaid(order_id)
            }
        },
        _ => OrderStoreError::from(e),
    })?;
    Ok(payment)
}

pub async fn fetch_payment(payment_id: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE payment_id = $1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_payment_by_external_id(
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE external_transaction_id = $1")
        .bind(external_id)
        .fetch_optional(conn)
        .await?;
    Ok(payment)
}

pub async fn fetch_completed_payment_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as(
        "SELECT * FROM payments WHERE order_id = $1 AND status = $2 ORDER BY created_at DESC, payment_id DESC LIMIT 1",
    )
    .bind(order_id.as_str())
    .bind(PaymentStatus::Completed)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

pub async fn fetch_completed_payment_ids(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<String>, sqlx::Error> {
    let ids = sqlx::query_scalar("SELECT payment_id FROM payments WHERE order_id = $1 AND status = $2")
        .bind(order_id.as_str())
        .bind(PaymentStatus::Completed)
        .fetch_all(conn)
        .await?;
    Ok(ids)
}

pub async fn update_payment_status(
    payment_id: &str,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Payment, OrderStoreError> {
    let payment = sqlx::query_as("UPDATE payments SET status = $1, updated_at = $2 WHERE payment_id = $3 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(payment_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| OrderStoreError::PaymentNotFound(payment_id.to_string()))?;
    Ok(payment)
}
