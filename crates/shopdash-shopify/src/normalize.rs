//! Conversion from Admin API shapes to the store-neutral records in
//! [`shopdash_core::resources`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shopdash_core::{NormalizedCustomer, NormalizedLineItem, NormalizedOrder, NormalizedProduct};

use crate::error::ShopifyError;
use crate::types::{RawAmount, ShopifyCustomer, ShopifyLineItem, ShopifyOrder, ShopifyProduct};

fn malformed(resource: &'static str, id: &str, reason: impl Into<String>) -> ShopifyError {
    ShopifyError::Normalization {
        resource,
        id: id.to_owned(),
        reason: reason.into(),
    }
}

fn parse_amount(raw: &RawAmount) -> Result<Decimal, String> {
    let text = raw.as_text();
    Decimal::from_str(&text).map_err(|e| format!("\"{text}\" is not a decimal amount: {e}"))
}

/// Normalizes a customer.
///
/// Never fails: a missing `orders_count` becomes 0, and a missing or
/// unparseable `total_spent` becomes 0 with a warning.
#[must_use]
pub fn normalize_customer(customer: ShopifyCustomer) -> NormalizedCustomer {
    let shopify_id = customer.id.to_string();

    let total_spent = match customer.total_spent.as_ref().map(parse_amount) {
        Some(Ok(amount)) => amount,
        Some(Err(reason)) => {
            tracing::warn!(customer = %shopify_id, %reason, "treating total_spent as zero");
            Decimal::ZERO
        }
        None => Decimal::ZERO,
    };

    let orders_count = customer
        .orders_count
        .map_or(0, |n| i32::try_from(n.max(0)).unwrap_or(i32::MAX));

    NormalizedCustomer {
        shopify_id,
        email: customer.email,
        first_name: customer.first_name,
        last_name: customer.last_name,
        orders_count,
        total_spent,
    }
}

/// Normalizes a product, taking its price from the first variant.
///
/// A product without variants, or whose first variant has no (or an empty)
/// price, gets `price: None`.
///
/// # Errors
///
/// Returns [`ShopifyError::Normalization`] if the first variant's price is
/// present but not a decimal.
pub fn normalize_product(product: ShopifyProduct) -> Result<NormalizedProduct, ShopifyError> {
    let shopify_id = product.id.to_string();

    let price = match product.variants.first().and_then(|v| v.price.as_ref()) {
        Some(raw) if raw.as_text().is_empty() => None,
        Some(raw) => Some(parse_amount(raw).map_err(|r| malformed("product", &shopify_id, r))?),
        None => None,
    };

    Ok(NormalizedProduct {
        shopify_id,
        title: product.title,
        vendor: product.vendor,
        product_type: product.product_type,
        price,
    })
}

/// Normalizes an order and all of its line items.
///
/// # Errors
///
/// Returns [`ShopifyError::Normalization`] if `order_number`, `total_price`,
/// or `created_at` is missing or malformed, or if any line item lacks a
/// valid `quantity` or `price`.
pub fn normalize_order(order: ShopifyOrder) -> Result<NormalizedOrder, ShopifyError> {
    let shopify_id = order.id.to_string();

    let order_number = order
        .order_number
        .map(|n| n.to_string())
        .ok_or_else(|| malformed("order", &shopify_id, "missing order_number"))?;

    let total_price = order
        .total_price
        .as_ref()
        .ok_or_else(|| "missing total_price".to_owned())
        .and_then(parse_amount)
        .map_err(|r| malformed("order", &shopify_id, r))?;

    let created_at = order
        .created_at
        .as_deref()
        .ok_or_else(|| malformed("order", &shopify_id, "missing created_at"))?;
    let order_date = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| {
            malformed(
                "order",
                &shopify_id,
                format!("\"{created_at}\" is not an RFC 3339 timestamp: {e}"),
            )
        })?
        .with_timezone(&Utc);

    let line_items = order
        .line_items
        .into_iter()
        .map(|item| normalize_line_item(item, &shopify_id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NormalizedOrder {
        shopify_id,
        customer_shopify_id: order.customer.map(|c| c.id.to_string()),
        order_number,
        total_price,
        currency: order.currency,
        financial_status: order.financial_status,
        fulfillment_status: order.fulfillment_status,
        order_date,
        line_items,
    })
}

fn normalize_line_item(
    item: ShopifyLineItem,
    order_id: &str,
) -> Result<NormalizedLineItem, ShopifyError> {
    let item_label = item
        .id
        .as_ref()
        .map_or_else(|| order_id.to_owned(), |id| format!("{order_id}/{id}"));

    let quantity = item
        .quantity
        .ok_or_else(|| malformed("line item", &item_label, "missing quantity"))
        .and_then(|q| {
            i32::try_from(q).map_err(|_| malformed("line item", &item_label, "quantity out of range"))
        })?;

    let price = item
        .price
        .as_ref()
        .ok_or_else(|| "missing price".to_owned())
        .and_then(parse_amount)
        .map_err(|r| malformed("line item", &item_label, r))?;

    Ok(NormalizedLineItem {
        shopify_line_item_id: item.id.map(|id| id.to_string()),
        product_shopify_id: item.product_id.map(|id| id.to_string()),
        title: item.title,
        quantity,
        price,
    })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
