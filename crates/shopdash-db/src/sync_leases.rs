//! Per-tenant sync exclusion backed by the `sync_leases` table.
//!
//! A lease is a row keyed by tenant. It can be taken when absent or expired,
//! so a crashed holder blocks its tenant for at most one TTL.

use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Tries to take the sync lease for `tenant_id` on behalf of `holder`.
///
/// Returns `true` when the lease was acquired, `false` when another holder
/// owns an unexpired lease.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn acquire_sync_lease(
    pool: &PgPool,
    tenant_id: Uuid,
    holder: Uuid,
    ttl_secs: u64,
) -> Result<bool, DbError> {
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);

    let acquired = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO sync_leases (tenant_id, holder, acquired_at, expires_at) \
         VALUES ($1, $2, NOW(), NOW() + ($3::BIGINT * INTERVAL '1 second')) \
         ON CONFLICT (tenant_id) DO UPDATE SET \
             holder      = EXCLUDED.holder, \
             acquired_at = EXCLUDED.acquired_at, \
             expires_at  = EXCLUDED.expires_at \
         WHERE sync_leases.expires_at <= NOW() \
         RETURNING holder",
    )
    .bind(tenant_id)
    .bind(holder)
    .bind(ttl)
    .fetch_optional(pool)
    .await?;

    Ok(acquired.is_some())
}

/// Releases the lease if `holder` still owns it.
///
/// Returns `false` when the lease was already gone or taken over.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn release_sync_lease(
    pool: &PgPool,
    tenant_id: Uuid,
    holder: Uuid,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM sync_leases WHERE tenant_id = $1 AND holder = $2")
        .bind(tenant_id)
        .bind(holder)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
