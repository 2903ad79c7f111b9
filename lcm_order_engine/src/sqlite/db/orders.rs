use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderStatusType},
    traits::OrderStoreError,
};

/// Inserts a new order header using the given connection. This is not atomic. Embed this call in a transaction
/// together with [`insert_item`] so that an order never exists without its items.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderStoreError> {
    let contact = &order.contact;
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                user_id,
                status,
                total_price,
                delivery_fee,
                discount_amount,
                used_point,
                saved_point,
                payment_method,
                payment_method_name,
                phone,
                email,
                recipient_name,
                recipient_phone,
                zipcode,
                address_detail,
                delivery_memo,
                estimated_date,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $19)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.user_id)
    .bind(OrderStatusType::Pending)
    .bind(order.total_price)
    .bind(order.delivery_fee)
    .bind(order.discount_amount)
    .bind(order.used_point)
    .bind(order.saved_point)
    .bind(&order.payment_method)
    .bind(&order.payment_method_name)
    .bind(&contact.phone)
    .bind(&contact.email)
    .bind(&contact.recipient_name)
    .bind(&contact.recipient_phone)
    .bind(&contact.zipcode)
    .bind(&contact.address_detail)
    .bind(&contact.delivery_memo)
    .bind(order.estimated_date)
    .bind(order.created_at)
    .fetch_one(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_unique_violation() => {
            OrderStoreError::OrderAlreadyExists(order.order_id.clone())
        },
        _ => OrderStoreError::from(e),
    })?;
    Ok(result)
}

pub async fn insert_item(
    order_id: &OrderId,
    item: NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, product_id, product_name, quantity, total_price, status, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order_id.as_str())
    .bind(item.product_id)
    .bind(item.product_name)
    .bind(item.quantity)
    .bind(item.total_price)
    .bind(OrderStatusType::Preparing)
    .bind(item.image_url)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    let items = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY order_item_id")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(items)
}

/// Orders for the user, newest first
pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, order_id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Sets the order status to `status` if, and only if, the current status is one of `allowed_from`. The check is part
/// of the `UPDATE` statement itself.
///
/// Returns the updated order, or `None` if no row matched.
pub async fn transition_status(
    order_id: &OrderId,
    allowed_from: &[OrderStatusType],
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    if allowed_from.is_empty() {
        return Ok(None);
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET status = ");
    builder.push_bind(status);
    builder.push(", updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE order_id = ");
    builder.push_bind(order_id.as_str());
    builder.push(" AND status IN (");
    let mut statuses = builder.separated(", ");
    for s in allowed_from {
        statuses.push_bind(*s);
    }
    statuses.push_unseparated(") RETURNING *");
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    match &order {
        Some(_) => trace!("📦️ Order {order_id} moved to {status}"),
        None => debug!("📦️ Order {order_id} was not in any of {allowed_from:?}. It was not moved to {status}"),
    }
    Ok(order)
}

/// Mirrors the order status onto every item of the order. Returns the number of items updated.
pub async fn update_items_status(
    order_id: &OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE order_items SET status = $1 WHERE order_id = $2")
        .bind(status)
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_shipping_details(
    order_id: &OrderId,
    shipping_date: DateTime<Utc>,
    tracking_number: &str,
    delivery_company: &str,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET shipping_date = $1, tracking_number = $2, delivery_company = $3, updated_at = $4
            WHERE order_id = $5
            RETURNING *;
        "#,
    )
    .bind(shipping_date)
    .bind(tracking_number)
    .bind(delivery_company)
    .bind(Utc::now())
    .bind(order_id.as_str())
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Takes SQLite's write lock for the enclosing transaction before any reads are made. Returns `false` if the order
/// does not exist.
pub async fn lock_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET order_id = order_id WHERE order_id = $1")
        .bind(order_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
