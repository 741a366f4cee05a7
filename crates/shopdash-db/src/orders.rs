//! Database operations for `orders` and `order_items`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopdash_core::NormalizedOrder;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub shopify_id: String,
    pub customer_id: Option<i64>,
    pub order_number: String,
    pub total_price: Decimal,
    pub currency: Option<String>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub order_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item ready for insertion, with its product already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    /// `None` when the product is unknown to this tenant.
    pub product_id: Option<i64>,
    pub shopify_line_item_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub price: Decimal,
}

// ---------------------------------------------------------------------------
// orders operations
// ---------------------------------------------------------------------------

/// Upserts an order keyed by `(shopify_id, tenant_id)`.
///
/// A `None` `customer_id` never clears a customer link that an earlier sync
/// established.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_order(
    pool: &PgPool,
    tenant_id: Uuid,
    customer_id: Option<i64>,
    order: &NormalizedOrder,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO orders \
             (tenant_id, shopify_id, customer_id, order_number, total_price, currency, \
              financial_status, fulfillment_status, order_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (shopify_id, tenant_id) DO UPDATE SET \
             customer_id        = COALESCE(EXCLUDED.customer_id, orders.customer_id), \
             order_number       = EXCLUDED.order_number, \
             total_price        = EXCLUDED.total_price, \
             currency           = EXCLUDED.currency, \
             financial_status   = EXCLUDED.financial_status, \
             fulfillment_status = EXCLUDED.fulfillment_status, \
             order_date         = EXCLUDED.order_date, \
             updated_at         = NOW() \
         RETURNING id",
    )
    .bind(tenant_id)
    .bind(&order.shopify_id)
    .bind(customer_id)
    .bind(&order.order_number)
    .bind(order.total_price)
    .bind(&order.currency)
    .bind(&order.financial_status)
    .bind(&order.fulfillment_status)
    .bind(order.order_date)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns a single order by its Shopify id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_order_by_shopify_id(
    pool: &PgPool,
    tenant_id: Uuid,
    shopify_id: &str,
) -> Result<Option<OrderRow>, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, tenant_id, shopify_id, customer_id, order_number, total_price, currency, \
                financial_status, fulfillment_status, order_date, created_at, updated_at \
         FROM orders \
         WHERE tenant_id = $1 AND shopify_id = $2",
    )
    .bind(tenant_id)
    .bind(shopify_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Number of orders stored for a tenant.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_orders(pool: &PgPool, tenant_id: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE tenant_id = $1")
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

// ---------------------------------------------------------------------------
// order_items operations
// ---------------------------------------------------------------------------

/// Appends line items to an order without touching existing ones.
///
/// Calling this again for the same order duplicates its items.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; items already inserted in
/// the same call are rolled back.
pub async fn insert_order_items(
    pool: &PgPool,
    order_id: i64,
    items: &[NewOrderItem],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let inserted = insert_items_tx(&mut tx, order_id, items).await?;
    tx.commit().await?;
    Ok(inserted)
}

/// Replaces every line item of an order with `items` in one transaction.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete or any insert fails; the order's
/// previous items are then left untouched.
pub async fn replace_order_items(
    pool: &PgPool,
    order_id: i64,
    items: &[NewOrderItem],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

    let inserted = insert_items_tx(&mut tx, order_id, items).await?;
    tx.commit().await?;
    Ok(inserted)
}

async fn insert_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: i64,
    items: &[NewOrderItem],
) -> Result<u64, DbError> {
    let mut inserted = 0u64;
    for item in items {
        let result = sqlx::query(
            "INSERT INTO order_items \
                 (order_id, product_id, shopify_line_item_id, title, quantity, price) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(&item.shopify_line_item_id)
        .bind(&item.title)
        .bind(item.quantity)
        .bind(item.price)
        .execute(&mut **tx)
        .await?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

/// Number of line items across all of a tenant's orders.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_order_items(pool: &PgPool, tenant_id: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) \
         FROM order_items oi \
         JOIN orders o ON o.id = oi.order_id \
         WHERE o.tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
