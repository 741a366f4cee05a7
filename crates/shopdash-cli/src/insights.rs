//! `insights` command: the dashboard metrics for one tenant.

use chrono::{NaiveDate, Utc};
use serde_json::json;
use shopdash_core::{AppConfig, GrowthRate};
use uuid::Uuid;

/// Optional inclusive UTC date filter for the orders-by-date table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

fn fmt_growth(rate: GrowthRate) -> String {
    match rate {
        GrowthRate::Percent(p) => format!("{p:.2}%"),
        GrowthRate::Infinite => "\u{221e}".to_string(),
        GrowthRate::Undefined => "n/a".to_string(),
    }
}

fn display_name(first: Option<&str>, last: Option<&str>, email: Option<&str>) -> String {
    let name = [first, last]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if name.trim().is_empty() {
        email.unwrap_or("\u{2014}").to_string()
    } else {
        name
    }
}

/// Print overview, orders by date, top customers, and the advanced bundle.
///
/// # Errors
///
/// Returns an error if the tenant does not exist or any query fails.
pub(crate) async fn run_insights(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    tenant_id: Uuid,
    range: DateRange,
    as_json: bool,
) -> anyhow::Result<()> {
    let tenant = shopdash_db::get_tenant(pool, tenant_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("tenant {tenant_id} not found"))?;

    let overview = shopdash_db::load_overview(pool, tenant_id).await?;
    let by_date = shopdash_db::orders_by_date(pool, tenant_id, range.start, range.end).await?;
    let top = shopdash_db::top_customers(pool, tenant_id).await?;
    let advanced =
        shopdash_db::load_advanced_insights(pool, tenant_id, Utc::now(), config.growth_policy)
            .await?;

    if as_json {
        let value = json!({
            "tenant": {"id": tenant.id, "name": tenant.name},
            "overview": {
                "total_customers": overview.total_customers,
                "total_orders": overview.total_orders,
                "total_revenue": overview.total_revenue,
            },
            "orders_by_date": by_date.iter().map(|r| json!({
                "order_date": r.order_date,
                "total_price": r.total_price,
                "order_count": r.order_count,
            })).collect::<Vec<_>>(),
            "top_customers": top.iter().map(|c| json!({
                "id": c.id,
                "email": c.email,
                "total_spent": c.total_spent,
                "orders_count": c.orders_count,
            })).collect::<Vec<_>>(),
            "advanced": {
                "new_customers_this_month": advanced.new_customers_this_month,
                "revenue_this_month": advanced.revenue_this_month,
                "revenue_growth": advanced.revenue_growth,
                "customer_growth": advanced.customer_growth,
                "customer_segments": advanced.customer_segments,
                "repeat_customer_rate": advanced.repeat_customer_rate,
                "avg_days_between_orders": advanced.avg_days_between_orders,
            },
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} ({})", tenant.name, tenant.shopify_domain);
    println!(
        "customers: {}  orders: {}  revenue: {}",
        overview.total_customers, overview.total_orders, overview.total_revenue
    );
    println!();

    println!("{:<12}{:>8}{:>14}", "DATE", "ORDERS", "REVENUE");
    for row in &by_date {
        println!(
            "{:<12}{:>8}{:>14}",
            row.order_date.format("%Y-%m-%d").to_string(),
            row.order_count,
            row.total_price
        );
    }
    if by_date.is_empty() {
        println!("(no orders in range)");
    }
    println!();

    println!("{:<32}{:>8}{:>14}", "TOP CUSTOMER", "ORDERS", "SPENT");
    for customer in &top {
        let name = display_name(
            customer.first_name.as_deref(),
            customer.last_name.as_deref(),
            customer.email.as_deref(),
        );
        println!(
            "{name:<32}{:>8}{:>14}",
            customer.orders_count, customer.total_spent
        );
    }
    println!();

    println!(
        "this month: {} new customers, revenue {}",
        advanced.new_customers_this_month, advanced.revenue_this_month
    );
    println!(
        "growth: revenue {}, customers {} ({} policy)",
        fmt_growth(advanced.revenue_growth),
        fmt_growth(advanced.customer_growth),
        config.growth_policy
    );
    for segment in &advanced.customer_segments {
        println!(
            "  {:<20}{:>6}  avg {}  ({})",
            segment.name, segment.count, segment.avg_spend, segment.description
        );
    }
    for status in &advanced.order_status_distribution {
        println!("  status {:<16}{:>6}", status.name, status.value);
    }
    for product in &advanced.top_products {
        println!("  product {:<24}{:>14}", product.title, product.revenue);
    }
    println!(
        "repeat customers: {:.1}%  avg days between orders: {}",
        advanced.repeat_customer_rate, advanced.avg_days_between_orders
    );

    Ok(())
}
