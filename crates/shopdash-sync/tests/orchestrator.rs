//! Live tests for `SyncOrchestrator`: a fresh migrated database per test and
//! a wiremock server standing in for the Admin API.

mod common;

use std::time::Duration;

use common::{
    customers_body, mount_resource, mount_store, orchestrator, orders_body, products_body,
    tenant_for, TOKEN,
};
use rust_decimal::Decimal;
use serde_json::json;
use shopdash_core::LineItemMode;
use shopdash_db::{
    acquire_sync_lease, count_customers, count_order_items, count_orders, count_products,
    get_customer_by_shopify_id, get_order_by_shopify_id, get_product_by_shopify_id,
};
use shopdash_sync::{SyncError, SyncEvent, SyncPhase, SyncStatus};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Credential checks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn tenant_without_token_fails_before_any_request(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tenant = tenant_for(&pool, &server, None).await;
    let err = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MissingCredential(id) if id == tenant.id));
    assert!(err.is_configuration());
}

#[sqlx::test(migrations = "../../migrations")]
async fn blank_token_counts_as_missing(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let tenant = tenant_for(&pool, &server, Some("   ")).await;

    let err = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingCredential(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_tenant_id_is_not_found(pool: sqlx::PgPool) {
    let missing = Uuid::new_v4();
    let err = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant_by_id(missing)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::NotFound(id) if id == missing));
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn full_sync_writes_all_three_resources(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_store(&server).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;

    let report = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant_by_id(tenant.id)
        .await
        .expect("sync should succeed");

    assert_eq!(report.tenant_id, tenant.id);
    assert_eq!(report.customers, 2);
    assert_eq!(report.products, 2);
    assert_eq!(report.orders, 2);
    assert_eq!(report.order_items, 3);

    assert_eq!(count_customers(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_products(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_orders(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_order_items(&pool, tenant.id).await.unwrap(), 3);

    let emma = get_customer_by_shopify_id(&pool, tenant.id, "101")
        .await
        .unwrap()
        .expect("customer 101");
    assert_eq!(emma.total_spent, Decimal::new(125_000, 2));
    assert_eq!(emma.orders_count, 2);

    let dress = get_product_by_shopify_id(&pool, tenant.id, "201")
        .await
        .unwrap()
        .expect("product 201");
    assert_eq!(dress.price, Some(Decimal::new(8999, 2)));
    let gift_card = get_product_by_shopify_id(&pool, tenant.id, "202")
        .await
        .unwrap()
        .expect("product 202");
    assert_eq!(gift_card.price, None);

    let linked = get_order_by_shopify_id(&pool, tenant.id, "301")
        .await
        .unwrap()
        .expect("order 301");
    assert_eq!(linked.customer_id, Some(emma.id));
    assert_eq!(linked.order_number, "1001");

    let orphan = get_order_by_shopify_id(&pool, tenant.id, "302")
        .await
        .unwrap()
        .expect("order 302");
    assert_eq!(orphan.customer_id, None, "unsynced customer leaves no link");
}

#[sqlx::test(migrations = "../../migrations")]
async fn line_items_resolve_products_within_the_tenant(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_store(&server).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;

    orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap();

    let (linked, unlinked): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(oi.product_id), COUNT(*) FILTER (WHERE oi.product_id IS NULL) \
         FROM order_items oi JOIN orders o ON o.id = oi.order_id WHERE o.tenant_id = $1",
    )
    .bind(tenant.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(linked, 2);
    assert_eq!(unlinked, 1);
}

// ---------------------------------------------------------------------------
// Re-sync behavior
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn resync_in_append_mode_keeps_rows_but_duplicates_items(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_store(&server).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;
    let sync = orchestrator(&pool, LineItemMode::Append);

    sync.sync_tenant(&tenant).await.unwrap();
    sync.sync_tenant(&tenant).await.unwrap();

    assert_eq!(count_customers(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_products(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_orders(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_order_items(&pool, tenant.id).await.unwrap(), 6);
}

#[sqlx::test(migrations = "../../migrations")]
async fn resync_in_replace_mode_keeps_one_copy_of_items(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_store(&server).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;
    let sync = orchestrator(&pool, LineItemMode::Replace);

    sync.sync_tenant(&tenant).await.unwrap();
    sync.sync_tenant(&tenant).await.unwrap();

    assert_eq!(count_orders(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_order_items(&pool, tenant.id).await.unwrap(), 3);
}

// ---------------------------------------------------------------------------
// Lease
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn held_lease_rejects_a_second_sync(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;

    assert!(acquire_sync_lease(&pool, tenant.id, Uuid::new_v4(), 60)
        .await
        .unwrap());

    let err = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::AlreadyRunning(id) if id == tenant.id));
}

#[sqlx::test(migrations = "../../migrations")]
async fn lease_is_released_after_success(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_store(&server).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;

    orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap();

    assert!(acquire_sync_lease(&pool, tenant.id, Uuid::new_v4(), 60)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn dropped_sync_still_finishes_and_frees_the_lease(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-01/customers.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(customers_body())
                .set_delay(Duration::from_secs(1)),
        )
        .mount(&server)
        .await;
    mount_resource(&server, "products", products_body()).await;
    mount_resource(&server, "orders", orders_body()).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;
    let sync = orchestrator(&pool, LineItemMode::Append);
    let mut rx = sync.notifier().subscribe(tenant.id);

    let first = tokio::time::timeout(Duration::from_millis(200), sync.sync_tenant(&tenant)).await;
    assert!(first.is_err(), "first sync should still be waiting on customers");

    let finished = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(SyncEvent::SyncStatus {
                    status: SyncStatus::Completed | SyncStatus::Failed,
                    ..
                }) => break true,
                Ok(_) => {}
                Err(_) => break false,
            }
        }
    })
    .await
    .unwrap();
    assert!(finished, "dropped sync should run to completion");
    assert_eq!(count_orders(&pool, tenant.id).await.unwrap(), 2);

    let report = sync
        .sync_tenant(&tenant)
        .await
        .expect("lease should be free after the dropped sync finished");
    assert_eq!(report.customers, 2);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn upstream_error_aborts_later_phases_and_releases_lease(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_resource(&server, "customers", common::customers_body()).await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-01/products.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2024-01/orders.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;

    let err = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::External(_)), "got: {err:?}");
    assert!(err.to_string().contains("500"), "message kept: {err}");

    // Customers written before the failure stay written.
    assert_eq!(count_customers(&pool, tenant.id).await.unwrap(), 2);
    assert_eq!(count_orders(&pool, tenant.id).await.unwrap(), 0);

    assert!(acquire_sync_lease(&pool, tenant.id, Uuid::new_v4(), 60)
        .await
        .unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn malformed_order_total_is_a_parse_error(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_resource(&server, "customers", common::customers_body()).await;
    mount_resource(&server, "products", common::products_body()).await;
    mount_resource(
        &server,
        "orders",
        json!({
            "orders": [{
                "id": 301,
                "order_number": 1001,
                "total_price": "twelve fifty",
                "created_at": "2024-01-05T10:00:00Z",
                "line_items": []
            }]
        }),
    )
    .await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;

    let err = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Parse(_)), "got: {err:?}");
    assert_eq!(count_orders(&pool, tenant.id).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_customer_total_defaults_to_zero(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_resource(
        &server,
        "customers",
        json!({"customers": [{"id": 101, "total_spent": "n/a"}, {"id": 102}]}),
    )
    .await;
    mount_resource(&server, "products", json!({"products": []})).await;
    mount_resource(&server, "orders", json!({"orders": []})).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;

    let report = orchestrator(&pool, LineItemMode::Append)
        .sync_tenant(&tenant)
        .await
        .unwrap();
    assert_eq!(report.customers, 2);

    let customer = get_customer_by_shopify_id(&pool, tenant.id, "101")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.total_spent, Decimal::ZERO);
    assert_eq!(customer.orders_count, 0);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

fn drain(rx: &mut tokio::sync::broadcast::Receiver<SyncEvent>) -> Vec<SyncEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[sqlx::test(migrations = "../../migrations")]
async fn successful_sync_publishes_status_and_phase_events(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    mount_store(&server).await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;
    let sync = orchestrator(&pool, LineItemMode::Append);
    let mut rx = sync.notifier().subscribe(tenant.id);

    sync.sync_tenant(&tenant).await.unwrap();

    let events = drain(&mut rx);
    let names: Vec<&str> = events.iter().map(SyncEvent::name).collect();
    assert_eq!(
        names,
        [
            "sync-status",
            "data-update",
            "data-update",
            "data-update",
            "sync-status"
        ]
    );

    assert!(matches!(
        events[0],
        SyncEvent::SyncStatus { status: SyncStatus::Started, .. }
    ));
    assert!(matches!(
        events[1],
        SyncEvent::DataUpdate { phase: SyncPhase::Customers, count: 2, .. }
    ));
    assert!(matches!(
        events[3],
        SyncEvent::DataUpdate { phase: SyncPhase::Orders, count: 2, .. }
    ));
    assert!(matches!(
        events[4],
        SyncEvent::SyncStatus { status: SyncStatus::Completed, .. }
    ));
    assert!(events.iter().all(|e| e.tenant_id() == tenant.id));
}

#[sqlx::test(migrations = "../../migrations")]
async fn failed_sync_publishes_failure_with_message(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let tenant = tenant_for(&pool, &server, Some(TOKEN)).await;
    let sync = orchestrator(&pool, LineItemMode::Append);
    let mut rx = sync.notifier().subscribe(tenant.id);

    assert!(sync.sync_tenant(&tenant).await.is_err());

    let events = drain(&mut rx);
    assert_eq!(events.len(), 2);
    match &events[1] {
        SyncEvent::SyncStatus {
            status: SyncStatus::Failed,
            message: Some(message),
            ..
        } => assert!(!message.is_empty()),
        other => panic!("expected failed status, got {other:?}"),
    }
}
