use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrderCancel, OrderCancel, OrderId, RefundStatus},
    traits::OrderStoreError,
};

/// Inserts the cancellation record. The `order_id` column is unique, so a second cancellation of the same order is
/// reported as [`OrderStoreError::AlreadyCancelled`].
pub async fn insert_cancel(cancel: NewOrderCancel, conn: &mut SqliteConnection) -> Result<OrderCancel, OrderStoreError> {
    let order_id = cancel.order_id.clone();
    let now = Utc::now();
    let result = sqlx::query_as(
        r#"
            INSERT INTO order_cancel (
                order_id,
                user_id,
                reason,
                refund_amount,
                refund_status,
                payment_id,
                external_cancel_id,
                cancel_date,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *;
        "#,
    )
    .bind(cancel.order_id.as_str())
    .bind(cancel.user_id)
    .bind(cancel.reason)
    .bind(cancel.refund_amount)
    .bind(cancel.refund_status)
    .bind(cancel.payment_id)
    .bind(cancel.external_cancel_id)
    .bind(now)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => OrderStoreError::AlreadyCancelled(order_id),
        _ => OrderStoreError::from(e),
    })?;
    Ok(result)
}

pub async fn fetch_cancel_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderCancel>, sqlx::Error> {
    let cancel = sqlx::query_as("SELECT * FROM order_cancel WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(cancel)
}

pub async fn fetch_cancels_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<OrderCancel>, sqlx::Error> {
    let cancels = sqlx::query_as("SELECT * FROM order_cancel WHERE user_id = $1 ORDER BY cancel_date DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(cancels)
}

pub async fn fetch_cancels_with_refund_status(
    status: RefundStatus,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderCancel>, sqlx::Error> {
    let cancels = sqlx::query_as("SELECT * FROM order_cancel WHERE refund_status = $1 ORDER BY id")
        .bind(status)
        .fetch_all(conn)
        .await?;
    Ok(cancels)
}

pub async fn update_refund_status(
    order_id: &OrderId,
    status: RefundStatus,
    external_cancel_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<OrderCancel, OrderStoreError> {
    let cancel = sqlx::query_as(
        r#"
            UPDATE order_cancel
            SET refund_status = $1, external_cancel_id = COALESCE($2, external_cancel_id), updated_at = $3
            WHERE order_id = $4
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(external_cancel_id)
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| OrderStoreError::CancelNotFound(order_id.clone()))?;
    Ok(cancel)
}
