//! Admin REST API response types for `customers.json`, `products.json`, and
//! `orders.json`.
//!
//! ### Identifiers
//! Ids arrive as JSON numbers (`207119551`) but a few proxies and older API
//! versions send them as strings. [`ShopifyId`] accepts both and renders as
//! a string so 64-bit values never pass through `f64`.
//!
//! ### Money
//! `total_spent`, `total_price`, and variant/line-item `price` are decimal
//! strings (`"199.65"`). [`RawAmount`] also tolerates bare numbers; parsing
//! into `Decimal` happens during normalization, where a bad value becomes a
//! typed error for the record.
//!
//! ### `orders_count`
//! Present on customers in API versions up to 2024-04. Absent means zero.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

/// A Shopify object id, accepted as number or string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ShopifyId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ShopifyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShopifyId::Number(n) => write!(f, "{n}"),
            ShopifyId::Text(s) => f.write_str(s),
        }
    }
}

/// An unparsed money amount.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Text(String),
    Number(serde_json::Number),
}

impl RawAmount {
    /// The amount as written, trimmed.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            RawAmount::Text(s) => s.trim().to_owned(),
            RawAmount::Number(n) => n.to_string(),
        }
    }
}

/// Reads an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One page of a listable Admin API resource.
pub trait ResourcePage: DeserializeOwned {
    type Item;

    /// Resource name used in logs and errors.
    const RESOURCE: &'static str;
    /// Path relative to `/admin/api/{version}/`.
    const ENDPOINT: &'static str;
    /// Filters sent with the first request only; Shopify rejects them
    /// alongside `page_info`.
    const FIRST_PAGE_FILTERS: &'static [(&'static str, &'static str)] = &[];

    fn into_items(self) -> Vec<Self::Item>;
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CustomersPage {
    pub customers: Vec<ShopifyCustomer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCustomer {
    pub id: ShopifyId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub orders_count: Option<i64>,
    #[serde(default)]
    pub total_spent: Option<RawAmount>,
}

impl ResourcePage for CustomersPage {
    type Item = ShopifyCustomer;
    const RESOURCE: &'static str = "customers";
    const ENDPOINT: &'static str = "customers.json";

    fn into_items(self) -> Vec<ShopifyCustomer> {
        self.customers
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ProductsPage {
    pub products: Vec<ShopifyProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyProduct {
    pub id: ShopifyId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    /// Listed in storefront order; the first one carries the product price.
    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<ShopifyVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyVariant {
    #[serde(default)]
    pub id: Option<ShopifyId>,
    #[serde(default)]
    pub price: Option<RawAmount>,
}

impl ResourcePage for ProductsPage {
    type Item = ShopifyProduct;
    const RESOURCE: &'static str = "products";
    const ENDPOINT: &'static str = "products.json";

    fn into_items(self) -> Vec<ShopifyProduct> {
        self.products
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OrdersPage {
    pub orders: Vec<ShopifyOrder>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrder {
    pub id: ShopifyId,
    /// `null` for guest checkouts.
    #[serde(default)]
    pub customer: Option<ShopifyOrderCustomer>,
    #[serde(default)]
    pub order_number: Option<ShopifyId>,
    #[serde(default)]
    pub total_price: Option<RawAmount>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub fulfillment_status: Option<String>,
    /// ISO-8601 with offset, e.g. `"2024-01-15T10:30:00-05:00"`.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub line_items: Vec<ShopifyLineItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyOrderCustomer {
    pub id: ShopifyId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyLineItem {
    #[serde(default)]
    pub id: Option<ShopifyId>,
    /// `null` for custom line items and deleted products.
    #[serde(default)]
    pub product_id: Option<ShopifyId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub price: Option<RawAmount>,
}

impl ResourcePage for OrdersPage {
    type Item = ShopifyOrder;
    const RESOURCE: &'static str = "orders";
    const ENDPOINT: &'static str = "orders.json";
    const FIRST_PAGE_FILTERS: &'static [(&'static str, &'static str)] = &[("status", "any")];

    fn into_items(self) -> Vec<ShopifyOrder> {
        self.orders
    }
}
