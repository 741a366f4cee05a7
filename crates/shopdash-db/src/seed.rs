//! Demo data for local development.
//!
//! Random choices are made up front by [`plan_demo_store`] so the plan can be
//! checked without a database; [`seed_demo_stores`] then writes each store in
//! its own transaction.

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use rust_decimal::Decimal;
use shopdash_core::DemoStore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const FINANCIAL_STATUSES: [&str; 3] = ["paid", "pending", "refunded"];
const FULFILLMENT_STATUSES: [&str; 3] = ["fulfilled", "unfulfilled", "partial"];
const FIRST_ORDER_NUMBER: usize = 1000;
const ORDER_WINDOW_DAYS: i64 = 90;
const FALLBACK_ITEM_PRICE: i64 = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub product_index: usize,
    pub quantity: i32,
    /// Unit price; the product's price or 50 when it has none.
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOrder {
    pub customer_index: usize,
    pub order_number: String,
    pub financial_status: &'static str,
    pub fulfillment_status: &'static str,
    pub order_date: DateTime<Utc>,
    pub items: Vec<PlannedItem>,
}

impl PlannedOrder {
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum()
    }
}

/// Counts reported after seeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub stores: usize,
    /// Stores whose domain was already registered and were left alone.
    pub skipped: usize,
    pub products: usize,
    pub customers: usize,
    pub orders: usize,
}

/// Draw random orders for one store: 1 to 5 per customer, each with 1 to 3
/// items of quantity 1 or 2, dated within the 90 days before `now`.
///
/// A store without products gets no orders.
pub fn plan_demo_store<R: Rng + ?Sized>(
    store: &DemoStore,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<PlannedOrder> {
    if store.products.is_empty() {
        return Vec::new();
    }

    let mut orders = Vec::new();
    for customer_index in 0..store.customers.len() {
        let order_count = rng.random_range(1..=5);
        for _ in 0..order_count {
            let item_count = rng.random_range(1..=3);
            let items = (0..item_count)
                .map(|_| {
                    let product_index = rng.random_range(0..store.products.len());
                    PlannedItem {
                        product_index,
                        quantity: rng.random_range(1..=2),
                        price: store.products[product_index]
                            .price
                            .unwrap_or_else(|| Decimal::from(FALLBACK_ITEM_PRICE)),
                    }
                })
                .collect();

            orders.push(PlannedOrder {
                customer_index,
                order_number: (FIRST_ORDER_NUMBER + orders.len()).to_string(),
                financial_status: FINANCIAL_STATUSES.choose(rng).copied().unwrap_or("paid"),
                fulfillment_status: FULFILLMENT_STATUSES
                    .choose(rng)
                    .copied()
                    .unwrap_or("unfulfilled"),
                order_date: now - Duration::days(rng.random_range(0..ORDER_WINDOW_DAYS)),
                items,
            });
        }
    }
    orders
}

fn demo_shopify_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

/// Create a tenant per demo store for `user_id`, with products, customers,
/// and random orders.
///
/// Stores whose domain already exists are skipped, so re-running is safe.
/// Each store is written in a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails; the failing
/// store is rolled back and earlier stores stay committed.
pub async fn seed_demo_stores(
    pool: &PgPool,
    stores: &[DemoStore],
    user_id: Uuid,
) -> Result<SeedSummary, DbError> {
    let mut summary = SeedSummary::default();

    for store in stores {
        let plan = plan_demo_store(store, Utc::now(), &mut rand::rng());
        let mut tx = pool.begin().await?;

        let tenant_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO tenants (id, name, shopify_domain, user_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (shopify_domain) DO NOTHING \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(&store.name)
        .bind(&store.shopify_domain)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(tenant_id) = tenant_id else {
            tracing::info!(domain = %store.shopify_domain, "demo store already present; skipping");
            tx.rollback().await?;
            summary.skipped += 1;
            continue;
        };

        let mut product_ids = Vec::with_capacity(store.products.len());
        for product in &store.products {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO products (tenant_id, shopify_id, title, vendor, product_type, price) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 RETURNING id",
            )
            .bind(tenant_id)
            .bind(demo_shopify_id("prod"))
            .bind(&product.title)
            .bind(&product.vendor)
            .bind(&product.product_type)
            .bind(product.price)
            .fetch_one(&mut *tx)
            .await?;
            product_ids.push(id);
        }

        let mut customer_ids = Vec::with_capacity(store.customers.len());
        for customer in &store.customers {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO customers \
                     (tenant_id, shopify_id, email, first_name, last_name, orders_count, total_spent) \
                 VALUES ($1, $2, $3, $4, $5, 0, 0) \
                 RETURNING id",
            )
            .bind(tenant_id)
            .bind(demo_shopify_id("cust"))
            .bind(&customer.email)
            .bind(&customer.first_name)
            .bind(&customer.last_name)
            .fetch_one(&mut *tx)
            .await?;
            customer_ids.push(id);
        }

        for order in &plan {
            let total = order.total();
            let customer_id = customer_ids[order.customer_index];

            let order_id: i64 = sqlx::query_scalar(
                "INSERT INTO orders \
                     (tenant_id, shopify_id, customer_id, order_number, total_price, currency, \
                      financial_status, fulfillment_status, order_date) \
                 VALUES ($1, $2, $3, $4, $5, 'USD', $6, $7, $8) \
                 RETURNING id",
            )
            .bind(tenant_id)
            .bind(demo_shopify_id("order"))
            .bind(customer_id)
            .bind(&order.order_number)
            .bind(total)
            .bind(order.financial_status)
            .bind(order.fulfillment_status)
            .bind(order.order_date)
            .fetch_one(&mut *tx)
            .await?;

            for item in &order.items {
                sqlx::query(
                    "INSERT INTO order_items (order_id, product_id, title, quantity, price) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(order_id)
                .bind(product_ids[item.product_index])
                .bind(&store.products[item.product_index].title)
                .bind(item.quantity)
                .bind(item.price)
                .execute(&mut *tx)
                .await?;
            }

            sqlx::query(
                "UPDATE customers \
                 SET orders_count = orders_count + 1, \
                     total_spent  = total_spent + $2, \
                     updated_at   = NOW() \
                 WHERE id = $1",
            )
            .bind(customer_id)
            .bind(total)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            store = %store.name,
            products = product_ids.len(),
            customers = customer_ids.len(),
            orders = plan.len(),
            "seeded demo store"
        );
        summary.stores += 1;
        summary.products += product_ids.len();
        summary.customers += customer_ids.len();
        summary.orders += plan.len();
    }

    Ok(summary)
}
