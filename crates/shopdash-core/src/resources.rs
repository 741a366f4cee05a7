//! Store-neutral shapes of the three synced resource kinds.
//!
//! These are produced by the Shopify normalizer and consumed by the database
//! upserts. All identifiers from the external system are kept as strings so
//! that 64-bit Shopify ids never lose precision.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A shopper, keyed by `(shopify_id, tenant)`.
///
/// `orders_count` and `total_spent` are Shopify's own running aggregates and
/// overwrite whatever is stored; they are never recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCustomer {
    pub shopify_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub orders_count: i32,
    pub total_spent: Decimal,
}

/// A catalog item, keyed by `(shopify_id, tenant)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProduct {
    pub shopify_id: String,
    pub title: String,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    /// Price of the first listed variant; `None` when the product has none.
    pub price: Option<Decimal>,
}

/// One order with its line items, keyed by `(shopify_id, tenant)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedOrder {
    pub shopify_id: String,
    /// External id of the ordering customer, resolved against the tenant's
    /// synced customers at write time.
    pub customer_shopify_id: Option<String>,
    pub order_number: String,
    pub total_price: Decimal,
    pub currency: Option<String>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub order_date: DateTime<Utc>,
    pub line_items: Vec<NormalizedLineItem>,
}

/// A single line of a [`NormalizedOrder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLineItem {
    pub shopify_line_item_id: Option<String>,
    /// External id of the purchased product; `None` for custom line items.
    pub product_shopify_id: Option<String>,
    pub title: String,
    pub quantity: i32,
    pub price: Decimal,
}

impl NormalizedOrder {
    /// Total units across all line items.
    #[must_use]
    pub fn unit_count(&self) -> i64 {
        self.line_items.iter().map(|i| i64::from(i.quantity)).sum()
    }
}
