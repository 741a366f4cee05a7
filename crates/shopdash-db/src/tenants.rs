//! Database operations for the `tenants` table.

use chrono::{DateTime, Utc};
use shopdash_core::Tenant;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const UNIQUE_VIOLATION: &str = "23505";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `tenants` table.
#[derive(Clone, sqlx::FromRow)]
pub struct TenantRow {
    pub id: Uuid,
    pub name: String,
    pub shopify_domain: String,
    pub shopify_access_token: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for TenantRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRow")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shopify_domain", &self.shopify_domain)
            .field(
                "shopify_access_token",
                &self.shopify_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            name: row.name,
            shopify_domain: row.shopify_domain,
            shopify_access_token: row.shopify_access_token,
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

/// Input for [`create_tenant`].
#[derive(Debug, Clone)]
pub struct NewTenant<'a> {
    pub name: &'a str,
    pub shopify_domain: &'a str,
    pub shopify_access_token: Option<&'a str>,
    pub user_id: Uuid,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Inserts a tenant with a fresh id and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::DuplicateShopDomain`] if another tenant already owns the
/// domain, or [`DbError::Sqlx`] for any other failure.
pub async fn create_tenant(pool: &PgPool, tenant: &NewTenant<'_>) -> Result<TenantRow, DbError> {
    let result = sqlx::query_as::<_, TenantRow>(
        "INSERT INTO tenants (id, name, shopify_domain, shopify_access_token, user_id) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, name, shopify_domain, shopify_access_token, user_id, created_at, updated_at",
    )
    .bind(Uuid::new_v4())
    .bind(tenant.name)
    .bind(tenant.shopify_domain)
    .bind(tenant.shopify_access_token)
    .bind(tenant.user_id)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Err(DbError::DuplicateShopDomain(tenant.shopify_domain.to_string()))
        }
        Err(e) => Err(DbError::from(e)),
    }
}

/// Returns every tenant owned by `user_id`, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_tenants_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<TenantRow>, DbError> {
    let rows = sqlx::query_as::<_, TenantRow>(
        "SELECT id, name, shopify_domain, shopify_access_token, user_id, created_at, updated_at \
         FROM tenants \
         WHERE user_id = $1 \
         ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a tenant by id regardless of owner, or `None`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Option<TenantRow>, DbError> {
    let row = sqlx::query_as::<_, TenantRow>(
        "SELECT id, name, shopify_domain, shopify_access_token, user_id, created_at, updated_at \
         FROM tenants \
         WHERE id = $1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns the tenant only if `user_id` owns it.
///
/// A tenant owned by someone else is indistinguishable from a missing one.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_tenant_for_user(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<Option<TenantRow>, DbError> {
    let row = sqlx::query_as::<_, TenantRow>(
        "SELECT id, name, shopify_domain, shopify_access_token, user_id, created_at, updated_at \
         FROM tenants \
         WHERE id = $1 AND user_id = $2",
    )
    .bind(tenant_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every tenant holding a non-blank access token, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_credentialed_tenants(pool: &PgPool) -> Result<Vec<TenantRow>, DbError> {
    let rows = sqlx::query_as::<_, TenantRow>(
        "SELECT id, name, shopify_domain, shopify_access_token, user_id, created_at, updated_at \
         FROM tenants \
         WHERE shopify_access_token IS NOT NULL AND btrim(shopify_access_token) <> '' \
         ORDER BY created_at, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Stores (or clears, with `None`) the access token of a tenant owned by
/// `user_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no such tenant belongs to the user, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn set_tenant_access_token(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Uuid,
    access_token: Option<&str>,
) -> Result<TenantRow, DbError> {
    let row = sqlx::query_as::<_, TenantRow>(
        "UPDATE tenants \
         SET shopify_access_token = $3, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 \
         RETURNING id, name, shopify_domain, shopify_access_token, user_id, created_at, updated_at",
    )
    .bind(tenant_id)
    .bind(user_id)
    .bind(access_token)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}
