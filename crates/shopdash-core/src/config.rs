use crate::app_config::{AppConfig, Environment, LineItemMode};
use crate::insights::GrowthPolicy;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_as = |var: &str, default: &str| -> Result<String, ConfigError> {
        let raw = or_default(var, default);
        if raw.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "value must not be empty".to_string(),
            });
        }
        Ok(raw)
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let database_url = require("DATABASE_URL")?;
    let api_key_hash_salt = require("SHOPDASH_API_KEY_HASH_SALT")?;

    let env = parse_environment(&or_default("SHOPDASH_ENV", "development"))?;

    let bind_addr = or_default("SHOPDASH_BIND_ADDR", "0.0.0.0:5000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("SHOPDASH_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("SHOPDASH_LOG_LEVEL", "info");

    let db_max_connections = or_default("SHOPDASH_DB_MAX_CONNECTIONS", "10")
        .parse::<u32>()
        .map_err(|e| invalid("SHOPDASH_DB_MAX_CONNECTIONS", e.to_string()))?;
    let db_min_connections = or_default("SHOPDASH_DB_MIN_CONNECTIONS", "1")
        .parse::<u32>()
        .map_err(|e| invalid("SHOPDASH_DB_MIN_CONNECTIONS", e.to_string()))?;
    let db_acquire_timeout_secs = or_default("SHOPDASH_DB_ACQUIRE_TIMEOUT_SECS", "10")
        .parse::<u64>()
        .map_err(|e| invalid("SHOPDASH_DB_ACQUIRE_TIMEOUT_SECS", e.to_string()))?;

    let shopify_api_version = parse_as("SHOPDASH_SHOPIFY_API_VERSION", "2024-01")?;
    let shopify_request_timeout_secs = or_default("SHOPDASH_SHOPIFY_REQUEST_TIMEOUT_SECS", "30")
        .parse::<u64>()
        .map_err(|e| invalid("SHOPDASH_SHOPIFY_REQUEST_TIMEOUT_SECS", e.to_string()))?;
    let shopify_page_limit = or_default("SHOPDASH_SHOPIFY_PAGE_LIMIT", "250")
        .parse::<u32>()
        .map_err(|e| invalid("SHOPDASH_SHOPIFY_PAGE_LIMIT", e.to_string()))?;
    if !(1..=250).contains(&shopify_page_limit) {
        return Err(invalid(
            "SHOPDASH_SHOPIFY_PAGE_LIMIT",
            format!("{shopify_page_limit} is outside the Admin API range 1..=250"),
        ));
    }
    let shopify_inter_request_delay_ms =
        or_default("SHOPDASH_SHOPIFY_INTER_REQUEST_DELAY_MS", "0")
            .parse::<u64>()
            .map_err(|e| invalid("SHOPDASH_SHOPIFY_INTER_REQUEST_DELAY_MS", e.to_string()))?;

    let sync_cron = parse_as("SHOPDASH_SYNC_CRON", "0 0 */6 * * *")?;
    let sync_lease_ttl_secs = or_default("SHOPDASH_SYNC_LEASE_TTL_SECS", "3600")
        .parse::<u64>()
        .map_err(|e| invalid("SHOPDASH_SYNC_LEASE_TTL_SECS", e.to_string()))?;
    if sync_lease_ttl_secs == 0 {
        return Err(invalid(
            "SHOPDASH_SYNC_LEASE_TTL_SECS",
            "lease TTL must be at least one second".to_string(),
        ));
    }
    let sync_line_items = or_default("SHOPDASH_SYNC_LINE_ITEMS", "append")
        .parse::<LineItemMode>()
        .map_err(|e| invalid("SHOPDASH_SYNC_LINE_ITEMS", e))?;
    let growth_policy = or_default("SHOPDASH_GROWTH_POLICY", "legacy")
        .parse::<GrowthPolicy>()
        .map_err(|e| invalid("SHOPDASH_GROWTH_POLICY", e))?;

    let cors_origins = parse_list(&or_default("SHOPDASH_CORS_ORIGINS", ""));
    let demo_stores_path = PathBuf::from(or_default(
        "SHOPDASH_DEMO_STORES_PATH",
        "./config/demo_stores.yaml",
    ));

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        api_key_hash_salt,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        shopify_api_version,
        shopify_request_timeout_secs,
        shopify_page_limit,
        shopify_inter_request_delay_ms,
        sync_cron,
        sync_lease_ttl_secs,
        sync_line_items,
        growth_policy,
        cors_origins,
        demo_stores_path,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SHOPDASH_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
