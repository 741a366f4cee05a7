//! Database operations for the `customers` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopdash_core::NormalizedCustomer;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `customers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub shopify_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub orders_count: i32,
    pub total_spent: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upserts a customer keyed by `(shopify_id, tenant_id)`.
///
/// On conflict every descriptive column and both Shopify aggregates are
/// overwritten; `created_at` keeps the first-seen time.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_customer(
    pool: &PgPool,
    tenant_id: Uuid,
    customer: &NormalizedCustomer,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO customers \
             (tenant_id, shopify_id, email, first_name, last_name, orders_count, total_spent) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (shopify_id, tenant_id) DO UPDATE SET \
             email        = EXCLUDED.email, \
             first_name   = EXCLUDED.first_name, \
             last_name    = EXCLUDED.last_name, \
             orders_count = EXCLUDED.orders_count, \
             total_spent  = EXCLUDED.total_spent, \
             updated_at   = NOW() \
         RETURNING id",
    )
    .bind(tenant_id)
    .bind(&customer.shopify_id)
    .bind(&customer.email)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(customer.orders_count)
    .bind(customer.total_spent)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Resolves a Shopify customer id to the tenant's internal id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_customer_id(
    pool: &PgPool,
    tenant_id: Uuid,
    shopify_id: &str,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM customers WHERE tenant_id = $1 AND shopify_id = $2",
    )
    .bind(tenant_id)
    .bind(shopify_id)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Returns a single customer by its Shopify id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_customer_by_shopify_id(
    pool: &PgPool,
    tenant_id: Uuid,
    shopify_id: &str,
) -> Result<Option<CustomerRow>, DbError> {
    let row = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, tenant_id, shopify_id, email, first_name, last_name, orders_count, \
                total_spent, created_at, updated_at \
         FROM customers \
         WHERE tenant_id = $1 AND shopify_id = $2",
    )
    .bind(tenant_id)
    .bind(shopify_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Number of customers stored for a tenant.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_customers(pool: &PgPool, tenant_id: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM customers WHERE tenant_id = $1")
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
