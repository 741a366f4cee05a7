//! Shared fixtures: a wiremock Admin API and tenants pointed at it.

#![allow(dead_code)]

use serde_json::{json, Value};
use shopdash_core::{LineItemMode, Tenant};
use shopdash_db::{create_tenant, NewTenant};
use shopdash_shopify::AdminClientOptions;
use shopdash_sync::{SyncNotifier, SyncOrchestrator, SyncSettings};
use sqlx::PgPool;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "shpat_test_token";

pub fn settings(line_items: LineItemMode) -> SyncSettings {
    SyncSettings {
        client: AdminClientOptions {
            api_version: "2024-01".to_owned(),
            timeout_secs: 5,
            page_limit: 250,
            inter_request_delay_ms: 0,
        },
        line_items,
        lease_ttl_secs: 60,
    }
}

pub fn orchestrator(pool: &PgPool, line_items: LineItemMode) -> SyncOrchestrator {
    SyncOrchestrator::new(pool.clone(), settings(line_items), SyncNotifier::default())
}

/// Creates a tenant whose domain is the mock server's base URI.
pub async fn tenant_for(pool: &PgPool, server: &MockServer, token: Option<&str>) -> Tenant {
    create_tenant(
        pool,
        &NewTenant {
            name: "Fashion Boutique",
            shopify_domain: &server.uri(),
            shopify_access_token: token,
            user_id: Uuid::new_v4(),
        },
    )
    .await
    .expect("create tenant")
    .into()
}

pub fn customers_body() -> Value {
    json!({
        "customers": [
            {
                "id": 101,
                "email": "emma@example.com",
                "first_name": "Emma",
                "last_name": "Johnson",
                "orders_count": 2,
                "total_spent": "1250.00"
            },
            {
                "id": 102,
                "email": "liam@example.com",
                "first_name": "Liam",
                "last_name": "Smith",
                "orders_count": 1,
                "total_spent": "89.99"
            }
        ]
    })
}

pub fn products_body() -> Value {
    json!({
        "products": [
            {
                "id": 201,
                "title": "Summer Dress",
                "vendor": "StyleCo",
                "product_type": "Dresses",
                "variants": [{"id": 2011, "price": "89.99"}, {"id": 2012, "price": "99.99"}]
            },
            {
                "id": 202,
                "title": "Gift Card",
                "vendor": "StyleCo",
                "product_type": "Gift Cards",
                "variants": []
            }
        ]
    })
}

pub fn orders_body() -> Value {
    json!({
        "orders": [
            {
                "id": 301,
                "customer": {"id": 101},
                "order_number": 1001,
                "total_price": "179.98",
                "currency": "USD",
                "financial_status": "paid",
                "fulfillment_status": "fulfilled",
                "created_at": "2024-01-05T10:00:00-05:00",
                "line_items": [
                    {"id": 3011, "product_id": 201, "title": "Summer Dress", "quantity": 2, "price": "89.99"}
                ]
            },
            {
                "id": 302,
                "customer": {"id": 999},
                "order_number": 1002,
                "total_price": "25.00",
                "currency": "USD",
                "financial_status": "pending",
                "fulfillment_status": null,
                "created_at": "2024-01-06T12:30:00Z",
                "line_items": [
                    {"id": 3021, "product_id": null, "title": "Custom engraving", "quantity": 1, "price": "15.00"},
                    {"id": 3022, "product_id": 202, "title": "Gift Card", "quantity": 1, "price": "10.00"}
                ]
            }
        ]
    })
}

/// Mounts single-page responses for all three resources.
pub async fn mount_store(server: &MockServer) {
    mount_resource(server, "customers", customers_body()).await;
    mount_resource(server, "products", products_body()).await;
    mount_resource(server, "orders", orders_body()).await;
}

pub async fn mount_resource(server: &MockServer, resource: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/admin/api/2024-01/{resource}.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
