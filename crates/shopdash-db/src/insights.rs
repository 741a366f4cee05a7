//! Read-model queries behind the tenant insight endpoints.
//!
//! Every query is scoped to one tenant and recomputed on each call.

use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use shopdash_core::{
    percent_change, repeat_customer_rate, segment_customers, CustomerSpend, GrowthPolicy,
    GrowthRate, SegmentSummary, AVG_DAYS_BETWEEN_ORDERS,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const TOP_CUSTOMERS_LIMIT: i64 = 5;
const TOP_PRODUCTS_LIMIT: i64 = 5;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OverviewRow {
    pub total_customers: i64,
    pub total_orders: i64,
    /// Zero when the tenant has no orders.
    pub total_revenue: Decimal,
}

/// One calendar day (UTC) of order activity.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct OrdersByDateRow {
    pub order_date: NaiveDate,
    pub total_price: Decimal,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TopCustomerRow {
    pub id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub total_spent: Decimal,
    pub orders_count: i32,
}

/// Order count for one financial status; `NULL` statuses are labelled
/// `"Unknown"`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StatusCountRow {
    pub name: String,
    pub value: i64,
}

/// Summed line-item price for one product; unresolvable titles are
/// labelled `"Unknown"`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProductRevenueRow {
    pub title: String,
    pub revenue: Decimal,
}

/// Start of the current and previous calendar month, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindows {
    pub this_month_start: DateTime<Utc>,
    pub last_month_start: DateTime<Utc>,
}

/// Everything reported by the advanced insights endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedInsights {
    pub new_customers_this_month: i64,
    pub revenue_this_month: Decimal,
    pub revenue_growth: GrowthRate,
    pub customer_growth: GrowthRate,
    pub order_status_distribution: Vec<StatusCountRow>,
    pub top_products: Vec<ProductRevenueRow>,
    pub customer_segments: Vec<SegmentSummary>,
    pub repeat_customer_rate: f64,
    pub avg_days_between_orders: u32,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Customer count, order count, and revenue for a tenant.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_overview(pool: &PgPool, tenant_id: Uuid) -> Result<OverviewRow, DbError> {
    let row = sqlx::query_as::<_, OverviewRow>(
        "SELECT \
             (SELECT COUNT(*) FROM customers WHERE tenant_id = $1) AS total_customers, \
             (SELECT COUNT(*) FROM orders WHERE tenant_id = $1) AS total_orders, \
             (SELECT COALESCE(SUM(total_price), 0) FROM orders WHERE tenant_id = $1) \
                 AS total_revenue",
    )
    .bind(tenant_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Orders grouped by UTC calendar day, ascending.
///
/// `start` and `end` are inclusive and apply independently. Days without
/// orders are absent rather than zero-filled.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn orders_by_date(
    pool: &PgPool,
    tenant_id: Uuid,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<OrdersByDateRow>, DbError> {
    let rows = sqlx::query_as::<_, OrdersByDateRow>(
        "SELECT (order_date AT TIME ZONE 'UTC')::date AS order_date, \
                SUM(total_price) AS total_price, \
                COUNT(*) AS order_count \
         FROM orders \
         WHERE tenant_id = $1 \
           AND ($2::date IS NULL OR (order_date AT TIME ZONE 'UTC')::date >= $2) \
           AND ($3::date IS NULL OR (order_date AT TIME ZONE 'UTC')::date <= $3) \
         GROUP BY 1 \
         ORDER BY 1",
    )
    .bind(tenant_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The five highest-spending customers; ties resolve by ascending id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn top_customers(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<TopCustomerRow>, DbError> {
    let rows = sqlx::query_as::<_, TopCustomerRow>(
        "SELECT id, email, first_name, last_name, total_spent, orders_count \
         FROM customers \
         WHERE tenant_id = $1 \
         ORDER BY total_spent DESC, id ASC \
         LIMIT $2",
    )
    .bind(tenant_id)
    .bind(TOP_CUSTOMERS_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Month boundaries for the calendar month containing `now`.
#[must_use]
pub fn month_windows(now: DateTime<Utc>) -> MonthWindows {
    let first_of_month = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .unwrap_or_else(|| now.date_naive());
    let first_of_last_month = first_of_month
        .checked_sub_months(Months::new(1))
        .unwrap_or(first_of_month);

    MonthWindows {
        this_month_start: Utc.from_utc_datetime(&first_of_month.and_time(chrono::NaiveTime::MIN)),
        last_month_start: Utc
            .from_utc_datetime(&first_of_last_month.and_time(chrono::NaiveTime::MIN)),
    }
}

/// Assemble the advanced bundle as of `now`.
///
/// Revenue "this month" is every order dated at or after the first of the
/// current month; "last month" is the half-open previous calendar month.
/// Customer growth compares the full customer count against the count that
/// existed before this month began.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any underlying query fails.
pub async fn load_advanced_insights(
    pool: &PgPool,
    tenant_id: Uuid,
    now: DateTime<Utc>,
    policy: GrowthPolicy,
) -> Result<AdvancedInsights, DbError> {
    let windows = month_windows(now);

    let new_customers_this_month = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM customers WHERE tenant_id = $1 AND created_at >= $2",
    )
    .bind(tenant_id)
    .bind(windows.this_month_start)
    .fetch_one(pool)
    .await?;

    let revenue_this_month = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(total_price), 0) FROM orders \
         WHERE tenant_id = $1 AND order_date >= $2",
    )
    .bind(tenant_id)
    .bind(windows.this_month_start)
    .fetch_one(pool)
    .await?;

    let revenue_last_month = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(total_price), 0) FROM orders \
         WHERE tenant_id = $1 AND order_date >= $2 AND order_date < $3",
    )
    .bind(tenant_id)
    .bind(windows.last_month_start)
    .bind(windows.this_month_start)
    .fetch_one(pool)
    .await?;

    let customers_before_this_month = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM customers WHERE tenant_id = $1 AND created_at < $2",
    )
    .bind(tenant_id)
    .bind(windows.this_month_start)
    .fetch_one(pool)
    .await?;

    let order_status_distribution = sqlx::query_as::<_, StatusCountRow>(
        "SELECT COALESCE(financial_status, 'Unknown') AS name, COUNT(*) AS value \
         FROM orders \
         WHERE tenant_id = $1 \
         GROUP BY financial_status \
         ORDER BY value DESC, name",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?;

    let top_products = sqlx::query_as::<_, ProductRevenueRow>(
        "SELECT COALESCE(p.title, 'Unknown') AS title, agg.revenue \
         FROM ( \
             SELECT oi.product_id, SUM(oi.price) AS revenue \
             FROM order_items oi \
             JOIN orders o ON o.id = oi.order_id \
             WHERE o.tenant_id = $1 AND oi.product_id IS NOT NULL \
             GROUP BY oi.product_id \
             ORDER BY revenue DESC, oi.product_id \
             LIMIT $2 \
         ) agg \
         LEFT JOIN products p ON p.id = agg.product_id \
         ORDER BY agg.revenue DESC, agg.product_id",
    )
    .bind(tenant_id)
    .bind(TOP_PRODUCTS_LIMIT)
    .fetch_all(pool)
    .await?;

    let spends = sqlx::query_as::<_, (Decimal, i32)>(
        "SELECT total_spent, orders_count FROM customers WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(total_spent, orders_count)| CustomerSpend {
        total_spent,
        orders_count,
    })
    .collect::<Vec<_>>();

    let total_customers = i64::try_from(spends.len()).unwrap_or(i64::MAX);

    Ok(AdvancedInsights {
        new_customers_this_month,
        revenue_this_month,
        revenue_growth: percent_change(
            revenue_this_month,
            revenue_last_month,
            policy.revenue_baseline(),
        ),
        customer_growth: percent_change(
            Decimal::from(total_customers),
            Decimal::from(customers_before_this_month),
            policy.customer_baseline(),
        ),
        order_status_distribution,
        top_products,
        customer_segments: segment_customers(&spends),
        repeat_customer_rate: repeat_customer_rate(&spends),
        avg_days_between_orders: AVG_DAYS_BETWEEN_ORDERS,
    })
}
