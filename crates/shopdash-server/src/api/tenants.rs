//! Tenant registration, listing, and access-token management.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopdash_db::{DbError, NewTenant, TenantRow};
use uuid::Uuid;

use crate::middleware::{AuthUser, RequestId};

use super::{map_db_error, tenant_not_found, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreateTenantRequest {
    pub name: String,
    pub shopify_domain: String,
    pub shopify_access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SetCredentialRequest {
    /// `null` clears the token, which stops the tenant from being synced.
    pub shopify_access_token: Option<String>,
}

/// A tenant as returned to its owner. The access token itself is never sent
/// back.
#[derive(Debug, Serialize)]
pub(super) struct TenantItem {
    pub id: Uuid,
    pub name: String,
    pub shopify_domain: String,
    pub has_access_token: bool,
    pub created_at: DateTime<Utc>,
}

impl From<TenantRow> for TenantItem {
    fn from(row: TenantRow) -> Self {
        let has_access_token = row
            .shopify_access_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        Self {
            id: row.id,
            name: row.name,
            shopify_domain: row.shopify_domain,
            has_access_token,
            created_at: row.created_at,
        }
    }
}

fn required(req_id: &str, field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must not be empty"),
        ))
    } else {
        Ok(())
    }
}

/// Empty strings are treated as "no token".
fn token_or_none(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|t| !t.is_empty())
}

pub(super) async fn create_tenant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TenantItem>>), ApiError> {
    required(&req_id.0, "name", &body.name)?;
    required(&req_id.0, "shopify_domain", &body.shopify_domain)?;

    let new_tenant = NewTenant {
        name: body.name.trim(),
        shopify_domain: body.shopify_domain.trim(),
        shopify_access_token: token_or_none(body.shopify_access_token.as_deref()),
        user_id: user.0,
    };

    let row = shopdash_db::create_tenant(&state.pool, &new_tenant)
        .await
        .map_err(|e| match e {
            DbError::DuplicateShopDomain(domain) => ApiError::new(
                req_id.0.clone(),
                "conflict",
                format!("a tenant for {domain} already exists"),
            ),
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    tracing::info!(tenant_id = %row.id, domain = %row.shopify_domain, "tenant created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: TenantItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

pub(super) async fn list_tenants(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<TenantItem>>>, ApiError> {
    let rows = shopdash_db::list_tenants_for_user(&state.pool, user.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(TenantItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn set_credential(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<Uuid>,
    Json(body): Json<SetCredentialRequest>,
) -> Result<Json<ApiResponse<TenantItem>>, ApiError> {
    let token = token_or_none(body.shopify_access_token.as_deref());

    let row = shopdash_db::set_tenant_access_token(&state.pool, tenant_id, user.0, token)
        .await
        .map_err(|e| match e {
            DbError::NotFound => tenant_not_found(req_id.0.clone()),
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    tracing::info!(
        tenant_id = %row.id,
        has_access_token = token.is_some(),
        "tenant access token updated"
    );

    Ok(Json(ApiResponse {
        data: TenantItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}
