//! Read-only dashboard metrics for one tenant.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shopdash_core::{GrowthRate, SegmentSummary};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{map_db_error, require_owned_tenant, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct OrdersByDateQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct OverviewItem {
    pub total_customers: i64,
    pub total_orders: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct OrdersByDateItem {
    pub order_date: NaiveDate,
    pub total_price: Decimal,
    pub order_count: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct TopCustomerItem {
    pub id: i64,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub total_spent: Decimal,
    pub orders_count: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct NameValue<T: Serialize> {
    pub name: String,
    pub value: T,
}

#[derive(Debug, Serialize)]
pub(super) struct AdvancedItem {
    pub new_customers_this_month: i64,
    pub revenue_this_month: Decimal,
    pub revenue_growth: GrowthRate,
    pub customer_growth: GrowthRate,
    pub order_status_distribution: Vec<NameValue<i64>>,
    pub top_products: Vec<NameValue<Decimal>>,
    pub customer_segments: Vec<SegmentSummary>,
    pub repeat_customer_rate: f64,
    pub avg_days_between_orders: u32,
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (reduced to its UTC date).
fn parse_date_param(
    req_id: &str,
    field: &str,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, ApiError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(ts.with_timezone(&Utc).date_naive()))
        .map_err(|_| {
            ApiError::new(
                req_id,
                "validation_error",
                format!("{field} must be a date (YYYY-MM-DD) or RFC 3339 timestamp"),
            )
        })
}

pub(super) async fn overview(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<OverviewItem>>, ApiError> {
    require_owned_tenant(&state, &req_id, user, tenant_id).await?;

    let row = shopdash_db::load_overview(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: OverviewItem {
            total_customers: row.total_customers,
            total_orders: row.total_orders,
            total_revenue: row.total_revenue,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn orders_by_date(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<Uuid>,
    Query(params): Query<OrdersByDateQuery>,
) -> Result<Json<ApiResponse<Vec<OrdersByDateItem>>>, ApiError> {
    let start = parse_date_param(&req_id.0, "start_date", params.start_date.as_deref())?;
    let end = parse_date_param(&req_id.0, "end_date", params.end_date.as_deref())?;
    require_owned_tenant(&state, &req_id, user, tenant_id).await?;

    let rows = shopdash_db::orders_by_date(&state.pool, tenant_id, start, end)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|r| OrdersByDateItem {
            order_date: r.order_date,
            total_price: r.total_price,
            order_count: r.order_count,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn top_customers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TopCustomerItem>>>, ApiError> {
    require_owned_tenant(&state, &req_id, user, tenant_id).await?;

    let rows = shopdash_db::top_customers(&state.pool, tenant_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|r| TopCustomerItem {
            id: r.id,
            email: r.email,
            first_name: r.first_name,
            last_name: r.last_name,
            total_spent: r.total_spent,
            orders_count: r.orders_count,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn advanced(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AdvancedItem>>, ApiError> {
    require_owned_tenant(&state, &req_id, user, tenant_id).await?;

    let insights = shopdash_db::load_advanced_insights(
        &state.pool,
        tenant_id,
        Utc::now(),
        state.growth_policy,
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = AdvancedItem {
        new_customers_this_month: insights.new_customers_this_month,
        revenue_this_month: insights.revenue_this_month,
        revenue_growth: insights.revenue_growth,
        customer_growth: insights.customer_growth,
        order_status_distribution: insights
            .order_status_distribution
            .into_iter()
            .map(|s| NameValue {
                name: s.name,
                value: s.value,
            })
            .collect(),
        top_products: insights
            .top_products
            .into_iter()
            .map(|p| NameValue {
                name: p.title,
                value: p.revenue,
            })
            .collect(),
        customer_segments: insights.customer_segments,
        repeat_customer_rate: insights.repeat_customer_rate,
        avg_days_between_orders: insights.avg_days_between_orders,
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_params_accept_plain_dates_and_timestamps() {
        assert_eq!(parse_date_param("r", "start_date", None).unwrap(), None);
        assert_eq!(parse_date_param("r", "start_date", Some(" ")).unwrap(), None);
        assert_eq!(
            parse_date_param("r", "start_date", Some("2024-01-03")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );
        assert_eq!(
            parse_date_param("r", "end_date", Some("2024-01-03T23:30:00-05:00")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 4)
        );
    }

    #[test]
    fn malformed_date_param_is_a_validation_error() {
        let err = parse_date_param("r", "end_date", Some("yesterday")).unwrap_err();
        assert_eq!(err.error.code, "validation_error");
        assert!(err.error.message.contains("end_date"));
    }
}
