//! On-demand sync and the webhook receiver.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::Serialize;
use shopdash_core::Tenant;
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{map_sync_error, require_owned_tenant, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct SyncResponse {
    pub message: &'static str,
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
    pub order_items: u64,
}

/// Runs a full sync for one of the caller's tenants and waits for it.
pub(super) async fn sync_tenant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<ApiResponse<SyncResponse>>, ApiError> {
    let tenant = require_owned_tenant(&state, &req_id, user, tenant_id).await?;

    let report = state
        .sync
        .sync_tenant(&Tenant::from(tenant))
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: SyncResponse {
            message: "Sync completed successfully",
            customers: report.customers,
            products: report.products,
            orders: report.orders,
            order_items: report.order_items,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Acknowledges a Shopify webhook delivery. Payloads are not processed.
pub(super) async fn webhook(headers: HeaderMap) -> (StatusCode, &'static str) {
    let topic = header_text(&headers, "x-shopify-topic");
    let shop_domain = header_text(&headers, "x-shopify-shop-domain");
    tracing::info!(%topic, %shop_domain, "received Shopify webhook");
    (StatusCode::OK, "Webhook received")
}
