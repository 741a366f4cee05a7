//! Normalizes fetched Shopify records and writes them, one upsert at a time.

use shopdash_core::{LineItemMode, NormalizedOrder};
use shopdash_db::NewOrderItem;
use shopdash_shopify::{
    normalize_customer, normalize_order, normalize_product, ShopifyCustomer, ShopifyOrder,
    ShopifyProduct,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::SyncError;

/// Rows written by [`ResourceMapper::map_orders`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrdersMapped {
    pub orders: usize,
    pub order_items: u64,
}

/// Writes one tenant's records.
///
/// Customers and products are keyed by `(shopify_id, tenant)`, so mapping the
/// same page twice leaves one row each. Orders resolve their customer and
/// their line items' products against rows already written for this tenant,
/// which is why customers and products must be mapped first.
pub struct ResourceMapper<'a> {
    pool: &'a PgPool,
    tenant_id: Uuid,
    line_items: LineItemMode,
}

impl<'a> ResourceMapper<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool, tenant_id: Uuid, line_items: LineItemMode) -> Self {
        Self {
            pool,
            tenant_id,
            line_items,
        }
    }

    /// Upserts every customer; returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Database`] on the first failed upsert.
    pub async fn map_customers(&self, customers: Vec<ShopifyCustomer>) -> Result<usize, SyncError> {
        let mut written = 0usize;
        for raw in customers {
            let customer = normalize_customer(raw);
            shopdash_db::upsert_customer(self.pool, self.tenant_id, &customer).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Upserts every product; returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Parse`] for a product with a malformed price, or
    /// [`SyncError::Database`] on the first failed upsert. Products before
    /// the failing one stay written.
    pub async fn map_products(&self, products: Vec<ShopifyProduct>) -> Result<usize, SyncError> {
        let mut written = 0usize;
        for raw in products {
            let product = normalize_product(raw)?;
            shopdash_db::upsert_product(self.pool, self.tenant_id, &product).await?;
            written += 1;
        }
        Ok(written)
    }

    /// Upserts every order and writes its line items.
    ///
    /// Line items are appended or replaced according to the mapper's
    /// [`LineItemMode`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Parse`] for an order with a missing or malformed
    /// total, timestamp, or line item, or [`SyncError::Database`] on the
    /// first failed write.
    pub async fn map_orders(&self, orders: Vec<ShopifyOrder>) -> Result<OrdersMapped, SyncError> {
        let mut mapped = OrdersMapped::default();
        for raw in orders {
            let order = normalize_order(raw)?;
            mapped.order_items += self.write_order(&order).await?;
            mapped.orders += 1;
        }
        Ok(mapped)
    }

    async fn write_order(&self, order: &NormalizedOrder) -> Result<u64, SyncError> {
        let customer_id = match order.customer_shopify_id.as_deref() {
            Some(shopify_id) => {
                shopdash_db::find_customer_id(self.pool, self.tenant_id, shopify_id).await?
            }
            None => None,
        };

        let order_id =
            shopdash_db::upsert_order(self.pool, self.tenant_id, customer_id, order).await?;

        let mut items = Vec::with_capacity(order.line_items.len());
        for item in &order.line_items {
            let product_id = match item.product_shopify_id.as_deref() {
                Some(shopify_id) => {
                    shopdash_db::find_product_id(self.pool, self.tenant_id, shopify_id).await?
                }
                None => None,
            };
            items.push(NewOrderItem {
                product_id,
                shopify_line_item_id: item.shopify_line_item_id.clone(),
                title: item.title.clone(),
                quantity: item.quantity,
                price: item.price,
            });
        }

        let written = match self.line_items {
            LineItemMode::Append => {
                shopdash_db::insert_order_items(self.pool, order_id, &items).await?
            }
            LineItemMode::Replace => {
                shopdash_db::replace_order_items(self.pool, order_id, &items).await?
            }
        };

        tracing::debug!(
            tenant_id = %self.tenant_id,
            order = %order.shopify_id,
            units = order.unit_count(),
            items = written,
            "order written"
        );
        Ok(written)
    }
}
