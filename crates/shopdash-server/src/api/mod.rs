mod events;
mod insights;
mod shopify;
mod tenants;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shopdash_core::GrowthPolicy;
use shopdash_db::TenantRow;
use shopdash_sync::{SyncError, SyncOrchestrator};
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, AuthUser, RateLimitState,
    RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sync: SyncOrchestrator,
    pub growth_policy: GrowthPolicy,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" | "missing_credential" => StatusCode::BAD_REQUEST,
            "conflict" | "sync_in_progress" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &shopdash_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Maps a sync failure to an error envelope, keeping the underlying message.
pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    let code = match error {
        SyncError::NotFound(_) => return tenant_not_found(request_id),
        SyncError::AlreadyRunning(_) => "sync_in_progress",
        SyncError::MissingCredential(_) | SyncError::InvalidCredential { .. } => {
            "missing_credential"
        }
        SyncError::External(_)
        | SyncError::Parse(_)
        | SyncError::Database(_)
        | SyncError::Aborted { .. } => "sync_failed",
    };
    tracing::warn!(error = %error, code, "on-demand sync failed");
    ApiError::new(request_id, code, error.to_string())
}

pub(super) fn tenant_not_found(request_id: String) -> ApiError {
    ApiError::new(request_id, "not_found", "Tenant not found")
}

/// Loads a tenant owned by `user`; anyone else's tenant is reported as
/// missing.
pub(super) async fn require_owned_tenant(
    state: &AppState,
    req_id: &RequestId,
    user: AuthUser,
    tenant_id: Uuid,
) -> Result<TenantRow, ApiError> {
    shopdash_db::get_tenant_for_user(&state.pool, tenant_id, user.0)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| tenant_not_found(req_id.0.clone()))
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(%origin, error = %e, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/tenants",
            get(tenants::list_tenants).post(tenants::create_tenant),
        )
        .route(
            "/api/v1/tenants/{tenant_id}/credential",
            put(tenants::set_credential),
        )
        .route(
            "/api/v1/tenants/{tenant_id}/events",
            get(events::tenant_events),
        )
        .route(
            "/api/v1/shopify/sync/{tenant_id}",
            post(shopify::sync_tenant),
        )
        .route(
            "/api/v1/insights/{tenant_id}/overview",
            get(insights::overview),
        )
        .route(
            "/api/v1/insights/{tenant_id}/orders-by-date",
            get(insights::orders_by_date),
        )
        .route(
            "/api/v1/insights/{tenant_id}/top-customers",
            get(insights::top_customers),
        )
        .route(
            "/api/v1/insights/{tenant_id}/advanced",
            get(insights::advanced),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(
    state: AppState,
    auth: AuthState,
    rate_limit: RateLimitState,
    cors_origins: &[String],
) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/shopify/webhook", post(shopify::webhook));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors(cors_origins))
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match shopdash_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}
