use std::net::SocketAddr;
use std::path::PathBuf;

use crate::insights::GrowthPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// How order line items are materialized when an order is re-synced.
///
/// `Append` inserts a fresh row for every line item on every pass, so
/// re-syncing an unchanged order accumulates duplicate items. `Replace`
/// deletes the order's existing items first, inside the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineItemMode {
    #[default]
    Append,
    Replace,
}

impl std::fmt::Display for LineItemMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineItemMode::Append => write!(f, "append"),
            LineItemMode::Replace => write!(f, "replace"),
        }
    }
}

impl std::str::FromStr for LineItemMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "append" => Ok(Self::Append),
            "replace" => Ok(Self::Replace),
            other => Err(format!(
                "unknown line item mode \"{other}\"; expected append or replace"
            )),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub api_key_hash_salt: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub shopify_api_version: String,
    pub shopify_request_timeout_secs: u64,
    pub shopify_page_limit: u32,
    pub shopify_inter_request_delay_ms: u64,
    pub sync_cron: String,
    pub sync_lease_ttl_secs: u64,
    pub sync_line_items: LineItemMode,
    pub growth_policy: GrowthPolicy,
    pub cors_origins: Vec<String>,
    pub demo_stores_path: PathBuf,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("api_key_hash_salt", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("shopify_api_version", &self.shopify_api_version)
            .field(
                "shopify_request_timeout_secs",
                &self.shopify_request_timeout_secs,
            )
            .field("shopify_page_limit", &self.shopify_page_limit)
            .field(
                "shopify_inter_request_delay_ms",
                &self.shopify_inter_request_delay_ms,
            )
            .field("sync_cron", &self.sync_cron)
            .field("sync_lease_ttl_secs", &self.sync_lease_ttl_secs)
            .field("sync_line_items", &self.sync_line_items)
            .field("growth_policy", &self.growth_policy)
            .field("cors_origins", &self.cors_origins)
            .field("demo_stores_path", &self.demo_stores_path)
            .finish()
    }
}
