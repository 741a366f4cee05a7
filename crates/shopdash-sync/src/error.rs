use shopdash_db::DbError;
use shopdash_shopify::ShopifyError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Shopify access token not configured for tenant {0}")]
    MissingCredential(Uuid),

    #[error("tenant {tenant_id} has an unusable Shopify configuration: {source}")]
    InvalidCredential {
        tenant_id: Uuid,
        #[source]
        source: ShopifyError,
    },

    #[error("tenant {0} not found")]
    NotFound(Uuid),

    #[error("a sync is already running for tenant {0}")]
    AlreadyRunning(Uuid),

    #[error("Shopify request failed: {0}")]
    External(#[source] ShopifyError),

    #[error("Shopify returned malformed data: {0}")]
    Parse(#[source] ShopifyError),

    #[error("sync task for tenant {tenant_id} aborted: {reason}")]
    Aborted { tenant_id: Uuid, reason: String },

    #[error("database error: {0}")]
    Database(#[from] DbError),
}

impl From<ShopifyError> for SyncError {
    fn from(err: ShopifyError) -> Self {
        if err.is_malformed_record() {
            SyncError::Parse(err)
        } else {
            SyncError::External(err)
        }
    }
}

impl SyncError {
    /// `true` when the tenant's own setup, not the remote API or the
    /// database, prevented the sync.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::MissingCredential(_) | SyncError::InvalidCredential { .. }
        )
    }
}
