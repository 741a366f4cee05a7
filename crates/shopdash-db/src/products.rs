//! Database operations for the `products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopdash_core::NormalizedProduct;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub tenant_id: Uuid,
    pub shopify_id: String,
    pub title: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    /// Price of the first variant at last sync; `NULL` when it had none.
    pub price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upserts a product keyed by `(shopify_id, tenant_id)`.
///
/// Returns the internal `id` of the upserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_product(
    pool: &PgPool,
    tenant_id: Uuid,
    product: &NormalizedProduct,
) -> Result<i64, DbError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products (tenant_id, shopify_id, title, vendor, product_type, price) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (shopify_id, tenant_id) DO UPDATE SET \
             title        = EXCLUDED.title, \
             vendor       = EXCLUDED.vendor, \
             product_type = EXCLUDED.product_type, \
             price        = EXCLUDED.price, \
             updated_at   = NOW() \
         RETURNING id",
    )
    .bind(tenant_id)
    .bind(&product.shopify_id)
    .bind(&product.title)
    .bind(&product.vendor)
    .bind(&product.product_type)
    .bind(product.price)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Resolves a Shopify product id to the tenant's internal id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_product_id(
    pool: &PgPool,
    tenant_id: Uuid,
    shopify_id: &str,
) -> Result<Option<i64>, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM products WHERE tenant_id = $1 AND shopify_id = $2",
    )
    .bind(tenant_id)
    .bind(shopify_id)
    .fetch_optional(pool)
    .await?;

    Ok(id)
}

/// Returns a single product by its Shopify id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_by_shopify_id(
    pool: &PgPool,
    tenant_id: Uuid,
    shopify_id: &str,
) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT id, tenant_id, shopify_id, title, vendor, product_type, price, \
                created_at, updated_at \
         FROM products \
         WHERE tenant_id = $1 AND shopify_id = $2",
    )
    .bind(tenant_id)
    .bind(shopify_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Number of products stored for a tenant.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products(pool: &PgPool, tenant_id: Uuid) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE tenant_id = $1")
        .bind(tenant_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
