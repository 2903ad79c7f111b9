use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewAuditEntry, OrderId, PaymentAudit};

pub async fn insert_entry(entry: NewAuditEntry, conn: &mut SqliteConnection) -> Result<PaymentAudit, sqlx::Error> {
    let audit = sqlx::query_as(
        r#"
            INSERT INTO payment_audit (
                external_transaction_id,
                order_id,
                kind,
                expected_amount,
                actual_amount,
                detail,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(entry.external_transaction_id)
    .bind(entry.order_id)
    .bind(entry.kind)
    .bind(entry.expected_amount)
    .bind(entry.actual_amount)
    .bind(entry.detail)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(audit)
}

pub async fn fetch_entries_for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<PaymentAudit>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM payment_audit WHERE order_id = $1 ORDER BY id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
