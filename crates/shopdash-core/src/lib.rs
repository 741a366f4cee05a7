pub mod app_config;
pub mod config;
pub mod demo_stores;
pub mod insights;
pub mod resources;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use app_config::{AppConfig, Environment, LineItemMode};
pub use config::{load_app_config, load_app_config_from_env};
pub use demo_stores::{load_demo_stores, DemoCustomer, DemoProduct, DemoStore, DemoStoresFile};
pub use insights::{
    percent_change, repeat_customer_rate, segment_customers, CustomerSpend, GrowthPolicy,
    GrowthRate, Segment, SegmentSummary, ZeroBaseline, AVG_DAYS_BETWEEN_ORDERS,
};
pub use resources::{NormalizedCustomer, NormalizedLineItem, NormalizedOrder, NormalizedProduct};

/// One connected Shopify store.
///
/// `shopify_access_token` is `None` until the owner supplies one; tenants
/// without a token are never synced.
#[derive(Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub shopify_domain: String,
    #[serde(skip_serializing)]
    pub shopify_access_token: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Returns `true` when the tenant can be synced.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.shopify_access_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shopify_domain", &self.shopify_domain)
            .field(
                "shopify_access_token",
                &self.shopify_access_token.as_ref().map(|_| "[redacted]"),
            )
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read demo stores file {path}: {source}")]
    DemoStoresIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse demo stores file: {0}")]
    DemoStoresParse(#[from] serde_yaml::Error),

    #[error("demo stores validation failed: {0}")]
    Validation(String),
}
