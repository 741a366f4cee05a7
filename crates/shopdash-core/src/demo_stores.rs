//! Demo store definitions used by the `seed` command.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoProduct {
    pub title: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoStore {
    pub name: String,
    pub shopify_domain: String,
    #[serde(default)]
    pub products: Vec<DemoProduct>,
    #[serde(default)]
    pub customers: Vec<DemoCustomer>,
}

#[derive(Debug, Deserialize)]
pub struct DemoStoresFile {
    pub stores: Vec<DemoStore>,
}

/// Load and validate demo stores from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_demo_stores(path: &Path) -> Result<DemoStoresFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DemoStoresIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_demo_stores(&content)
}

fn parse_demo_stores(content: &str) -> Result<DemoStoresFile, ConfigError> {
    let file: DemoStoresFile = serde_yaml::from_str(content)?;
    validate_demo_stores(&file)?;
    Ok(file)
}

fn validate_demo_stores(file: &DemoStoresFile) -> Result<(), ConfigError> {
    let mut seen_domains = HashSet::new();

    for store in &file.stores {
        if store.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store name must be non-empty".to_string(),
            ));
        }

        let domain = store.shopify_domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(ConfigError::Validation(format!(
                "store '{}' has an empty shopify_domain",
                store.name
            )));
        }
        if !seen_domains.insert(domain) {
            return Err(ConfigError::Validation(format!(
                "duplicate shopify_domain: '{}'",
                store.shopify_domain
            )));
        }

        if let Some(p) = store
            .products
            .iter()
            .find(|p| p.price.is_some_and(|price| price.is_sign_negative()))
        {
            return Err(ConfigError::Validation(format!(
                "product '{}' in store '{}' has a negative price",
                p.title, store.name
            )));
        }
    }

    Ok(())
}
