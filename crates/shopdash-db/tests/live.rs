//! Live integration tests for shopdash-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/shopdash-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use shopdash_core::{
    DemoCustomer, DemoProduct, DemoStore, GrowthPolicy, GrowthRate, NormalizedCustomer,
    NormalizedLineItem, NormalizedOrder, NormalizedProduct,
};
use shopdash_db::{
    acquire_sync_lease, count_customers, count_order_items, count_orders, create_tenant,
    find_customer_id, get_order_by_shopify_id, get_tenant_for_user, insert_order_items,
    list_credentialed_tenants, list_tenants_for_user, load_advanced_insights, load_overview,
    orders_by_date, release_sync_lease, replace_order_items, seed_demo_stores,
    set_tenant_access_token, top_customers, upsert_customer, upsert_order, upsert_product,
    DbError, NewOrderItem, NewTenant,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_test_tenant(pool: &sqlx::PgPool, domain: &str, token: Option<&str>) -> Uuid {
    create_tenant(
        pool,
        &NewTenant {
            name: "Test Store",
            shopify_domain: domain,
            shopify_access_token: token,
            user_id: Uuid::new_v4(),
        },
    )
    .await
    .unwrap_or_else(|e| panic!("create_tenant failed for '{domain}': {e}"))
    .id
}

fn make_customer(shopify_id: &str, total_spent: Decimal, orders_count: i32) -> NormalizedCustomer {
    NormalizedCustomer {
        shopify_id: shopify_id.to_string(),
        email: Some(format!("{shopify_id}@example.com")),
        first_name: Some("Emma".to_string()),
        last_name: Some("Johnson".to_string()),
        orders_count,
        total_spent,
    }
}

fn make_product(shopify_id: &str, title: &str) -> NormalizedProduct {
    NormalizedProduct {
        shopify_id: shopify_id.to_string(),
        title: title.to_string(),
        vendor: Some("StyleCo".to_string()),
        product_type: Some("Dresses".to_string()),
        price: Some(Decimal::new(8999, 2)),
    }
}

fn make_order(
    shopify_id: &str,
    customer_shopify_id: Option<&str>,
    total_price: Decimal,
    financial_status: Option<&str>,
    order_date: chrono::DateTime<Utc>,
) -> NormalizedOrder {
    NormalizedOrder {
        shopify_id: shopify_id.to_string(),
        customer_shopify_id: customer_shopify_id.map(ToString::to_string),
        order_number: format!("#{shopify_id}"),
        total_price,
        currency: Some("USD".to_string()),
        financial_status: financial_status.map(ToString::to_string),
        fulfillment_status: None,
        order_date,
        line_items: vec![NormalizedLineItem {
            shopify_line_item_id: Some(format!("li-{shopify_id}")),
            product_shopify_id: None,
            title: "Summer Dress".to_string(),
            quantity: 1,
            price: total_price,
        }],
    }
}

fn item(product_id: Option<i64>, price: Decimal) -> NewOrderItem {
    NewOrderItem {
        product_id,
        shopify_line_item_id: None,
        title: "Summer Dress".to_string(),
        quantity: 1,
        price,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Tenants
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn tenants_are_scoped_to_their_owner(pool: sqlx::PgPool) {
    let owner = Uuid::new_v4();
    let other = Uuid::new_v4();

    let tenant = create_tenant(
        &pool,
        &NewTenant {
            name: "Fashion Boutique",
            shopify_domain: "fashion-boutique-demo.myshopify.com",
            shopify_access_token: None,
            user_id: owner,
        },
    )
    .await
    .expect("create_tenant failed");

    let mine = list_tenants_for_user(&pool, owner).await.expect("list failed");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, tenant.id);

    assert!(list_tenants_for_user(&pool, other)
        .await
        .expect("list failed")
        .is_empty());
    assert!(get_tenant_for_user(&pool, tenant.id, other)
        .await
        .expect("get failed")
        .is_none());
    assert!(get_tenant_for_user(&pool, tenant.id, owner)
        .await
        .expect("get failed")
        .is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_shop_domain_is_rejected(pool: sqlx::PgPool) {
    insert_test_tenant(&pool, "dup.myshopify.com", None).await;

    let err = create_tenant(
        &pool,
        &NewTenant {
            name: "Copy",
            shopify_domain: "dup.myshopify.com",
            shopify_access_token: None,
            user_id: Uuid::new_v4(),
        },
    )
    .await
    .expect_err("second tenant with same domain should fail");

    assert!(matches!(err, DbError::DuplicateShopDomain(ref d) if d == "dup.myshopify.com"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn credentialed_listing_skips_missing_and_blank_tokens(pool: sqlx::PgPool) {
    let with_token = insert_test_tenant(&pool, "a.myshopify.com", Some("shpat_a")).await;
    insert_test_tenant(&pool, "b.myshopify.com", None).await;
    insert_test_tenant(&pool, "c.myshopify.com", Some("   ")).await;

    let rows = list_credentialed_tenants(&pool).await.expect("list failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, with_token);
}

#[sqlx::test(migrations = "../../migrations")]
async fn set_access_token_requires_ownership(pool: sqlx::PgPool) {
    let owner = Uuid::new_v4();
    let tenant = create_tenant(
        &pool,
        &NewTenant {
            name: "Tech Gadgets Store",
            shopify_domain: "tech-gadgets-demo.myshopify.com",
            shopify_access_token: None,
            user_id: owner,
        },
    )
    .await
    .expect("create_tenant failed");

    let err = set_tenant_access_token(&pool, tenant.id, Uuid::new_v4(), Some("shpat_x"))
        .await
        .expect_err("non-owner update should fail");
    assert!(matches!(err, DbError::NotFound));

    let updated = set_tenant_access_token(&pool, tenant.id, owner, Some("shpat_x"))
        .await
        .expect("owner update failed");
    assert_eq!(updated.shopify_access_token.as_deref(), Some("shpat_x"));
}

// ---------------------------------------------------------------------------
// Section 2: Resource upserts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn customer_upsert_is_idempotent_and_overwrites_aggregates(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;

    let first = upsert_customer(&pool, tenant_id, &make_customer("c1", Decimal::new(1000, 2), 1))
        .await
        .expect("first upsert failed");
    let second = upsert_customer(&pool, tenant_id, &make_customer("c1", Decimal::new(5000, 2), 3))
        .await
        .expect("second upsert failed");

    assert_eq!(first, second);
    assert_eq!(count_customers(&pool, tenant_id).await.unwrap(), 1);

    let spent: Decimal = sqlx::query_scalar("SELECT total_spent FROM customers WHERE id = $1")
        .bind(first)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(spent, Decimal::new(5000, 2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn same_shopify_id_in_two_tenants_creates_two_rows(pool: sqlx::PgPool) {
    let a = insert_test_tenant(&pool, "a.myshopify.com", None).await;
    let b = insert_test_tenant(&pool, "b.myshopify.com", None).await;

    let in_a = upsert_product(&pool, a, &make_product("p1", "Summer Dress")).await.unwrap();
    let in_b = upsert_product(&pool, b, &make_product("p1", "Summer Dress")).await.unwrap();

    assert_ne!(in_a, in_b);
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_upsert_keeps_existing_customer_link(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;
    let customer_id = upsert_customer(&pool, tenant_id, &make_customer("c1", Decimal::ZERO, 0))
        .await
        .unwrap();
    let order = make_order("o1", Some("c1"), Decimal::new(2500, 2), Some("paid"), Utc::now());

    upsert_order(&pool, tenant_id, Some(customer_id), &order).await.unwrap();
    upsert_order(&pool, tenant_id, None, &order).await.unwrap();

    let row = get_order_by_shopify_id(&pool, tenant_id, "o1")
        .await
        .unwrap()
        .expect("order should exist");
    assert_eq!(row.customer_id, Some(customer_id));
    assert_eq!(count_orders(&pool, tenant_id).await.unwrap(), 1);
    assert_eq!(
        find_customer_id(&pool, tenant_id, "c1").await.unwrap(),
        Some(customer_id)
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn appending_items_twice_duplicates_them(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;
    let order = make_order("o1", None, Decimal::new(2500, 2), None, Utc::now());
    let order_id = upsert_order(&pool, tenant_id, None, &order).await.unwrap();
    let items = vec![item(None, Decimal::new(2500, 2))];

    insert_order_items(&pool, order_id, &items).await.unwrap();
    insert_order_items(&pool, order_id, &items).await.unwrap();

    assert_eq!(count_order_items(&pool, tenant_id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn replacing_items_keeps_one_copy(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;
    let order = make_order("o1", None, Decimal::new(2500, 2), None, Utc::now());
    let order_id = upsert_order(&pool, tenant_id, None, &order).await.unwrap();
    let items = vec![
        item(None, Decimal::new(1000, 2)),
        item(None, Decimal::new(1500, 2)),
    ];

    replace_order_items(&pool, order_id, &items).await.unwrap();
    let inserted = replace_order_items(&pool, order_id, &items).await.unwrap();

    assert_eq!(inserted, 2);
    assert_eq!(count_order_items(&pool, tenant_id).await.unwrap(), 2);
}

// ---------------------------------------------------------------------------
// Section 3: Sync leases
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn lease_excludes_second_holder_until_released(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", Some("t")).await;
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    assert!(acquire_sync_lease(&pool, tenant_id, first, 60).await.unwrap());
    assert!(!acquire_sync_lease(&pool, tenant_id, second, 60).await.unwrap());

    assert!(!release_sync_lease(&pool, tenant_id, second).await.unwrap());
    assert!(release_sync_lease(&pool, tenant_id, first).await.unwrap());

    assert!(acquire_sync_lease(&pool, tenant_id, second, 60).await.unwrap());
}

#[sqlx::test(migrations = "../../migrations")]
async fn expired_lease_can_be_taken_over(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", Some("t")).await;
    let stale = Uuid::new_v4();

    assert!(acquire_sync_lease(&pool, tenant_id, stale, 60).await.unwrap());
    sqlx::query("UPDATE sync_leases SET expires_at = NOW() - INTERVAL '1 minute' WHERE tenant_id = $1")
        .bind(tenant_id)
        .execute(&pool)
        .await
        .unwrap();

    let fresh = Uuid::new_v4();
    assert!(acquire_sync_lease(&pool, tenant_id, fresh, 60).await.unwrap());
    assert!(!release_sync_lease(&pool, tenant_id, stale).await.unwrap());
}

// ---------------------------------------------------------------------------
// Section 4: Insights
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn overview_of_empty_tenant_is_all_zero(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;

    let overview = load_overview(&pool, tenant_id).await.unwrap();
    assert_eq!(overview.total_customers, 0);
    assert_eq!(overview.total_orders, 0);
    assert_eq!(overview.total_revenue, Decimal::ZERO);
}

#[sqlx::test(migrations = "../../migrations")]
async fn orders_by_date_groups_without_zero_fill(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;
    let day1 = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
    let day1_late = Utc.with_ymd_and_hms(2024, 1, 1, 22, 30, 0).unwrap();
    let day3 = Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();

    for order in [
        make_order("o1", None, Decimal::from(10), None, day1),
        make_order("o2", None, Decimal::from(20), None, day1_late),
        make_order("o3", None, Decimal::from(5), None, day3),
    ] {
        upsert_order(&pool, tenant_id, None, &order).await.unwrap();
    }

    let start = NaiveDate::from_ymd_opt(2024, 1, 1);
    let end = NaiveDate::from_ymd_opt(2024, 1, 3);
    let rows = orders_by_date(&pool, tenant_id, start, end).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].order_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(rows[0].total_price, Decimal::from(30));
    assert_eq!(rows[0].order_count, 2);
    assert_eq!(rows[1].order_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    assert_eq!(rows[1].total_price, Decimal::from(5));
    assert_eq!(rows[1].order_count, 1);

    let only_day3 = orders_by_date(&pool, tenant_id, NaiveDate::from_ymd_opt(2024, 1, 2), None)
        .await
        .unwrap();
    assert_eq!(only_day3.len(), 1);

    let empty = orders_by_date(
        &pool,
        tenant_id,
        NaiveDate::from_ymd_opt(2025, 1, 1),
        NaiveDate::from_ymd_opt(2025, 1, 31),
    )
    .await
    .unwrap();
    assert!(empty.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn top_customers_returns_five_by_spend(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;
    for (i, spent) in [50, 700, 1200, 10, 300, 900].iter().enumerate() {
        upsert_customer(
            &pool,
            tenant_id,
            &make_customer(&format!("c{i}"), Decimal::from(*spent), 1),
        )
        .await
        .unwrap();
    }

    let rows = top_customers(&pool, tenant_id).await.unwrap();
    let spends: Vec<Decimal> = rows.iter().map(|r| r.total_spent).collect();
    assert_eq!(
        spends,
        vec![
            Decimal::from(1200),
            Decimal::from(900),
            Decimal::from(700),
            Decimal::from(300),
            Decimal::from(50)
        ]
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn advanced_insights_reproduce_zero_baseline_growth(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;
    let now = Utc::now();

    upsert_customer(&pool, tenant_id, &make_customer("c1", Decimal::from(150), 2))
        .await
        .unwrap();
    upsert_order(
        &pool,
        tenant_id,
        None,
        &make_order("o1", None, Decimal::from(150), None, now),
    )
    .await
    .unwrap();

    let advanced = load_advanced_insights(&pool, tenant_id, now, GrowthPolicy::Legacy)
        .await
        .unwrap();

    assert_eq!(advanced.new_customers_this_month, 1);
    assert_eq!(advanced.revenue_this_month, Decimal::from(150));
    assert_eq!(advanced.revenue_growth, GrowthRate::Percent(14_900.0));
    assert_eq!(advanced.customer_growth, GrowthRate::Percent(0.0));
    assert_eq!(advanced.order_status_distribution.len(), 1);
    assert_eq!(advanced.order_status_distribution[0].name, "Unknown");
    assert_eq!(advanced.order_status_distribution[0].value, 1);
    assert!((advanced.repeat_customer_rate - 100.0).abs() < f64::EPSILON);
    assert_eq!(advanced.avg_days_between_orders, 30);
    assert_eq!(advanced.customer_segments[1].count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn advanced_insights_rank_products_by_item_revenue(pool: sqlx::PgPool) {
    let tenant_id = insert_test_tenant(&pool, "s.myshopify.com", None).await;
    let dress = upsert_product(&pool, tenant_id, &make_product("p1", "Summer Dress"))
        .await
        .unwrap();
    let jacket = upsert_product(&pool, tenant_id, &make_product("p2", "Denim Jacket"))
        .await
        .unwrap();
    let order_id = upsert_order(
        &pool,
        tenant_id,
        None,
        &make_order("o1", None, Decimal::from(300), Some("paid"), Utc::now() - Duration::days(1)),
    )
    .await
    .unwrap();
    insert_order_items(
        &pool,
        order_id,
        &[
            item(Some(dress), Decimal::from(50)),
            item(Some(jacket), Decimal::from(120)),
            item(Some(dress), Decimal::from(40)),
            item(None, Decimal::from(999)),
        ],
    )
    .await
    .unwrap();

    let advanced = load_advanced_insights(&pool, tenant_id, Utc::now(), GrowthPolicy::Legacy)
        .await
        .unwrap();

    let ranked: Vec<(&str, Decimal)> = advanced
        .top_products
        .iter()
        .map(|p| (p.title.as_str(), p.revenue))
        .collect();
    assert_eq!(
        ranked,
        vec![("Denim Jacket", Decimal::from(120)), ("Summer Dress", Decimal::from(90))]
    );
}

// ---------------------------------------------------------------------------
// Section 5: Seeding
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seeding_twice_skips_existing_stores(pool: sqlx::PgPool) {
    let stores = vec![DemoStore {
        name: "Home & Living".to_string(),
        shopify_domain: "home-living-demo.myshopify.com".to_string(),
        products: vec![DemoProduct {
            title: "Ceramic Vase".to_string(),
            vendor: Some("HomeDecor".to_string()),
            product_type: Some("Decor".to_string()),
            price: Some(Decimal::new(3499, 2)),
        }],
        customers: vec![DemoCustomer {
            first_name: "Charlotte".to_string(),
            last_name: "White".to_string(),
            email: "charlotte.white@example.com".to_string(),
        }],
    }];
    let user_id = Uuid::new_v4();

    let first = seed_demo_stores(&pool, &stores, user_id).await.unwrap();
    assert_eq!(first.stores, 1);
    assert_eq!(first.products, 1);
    assert_eq!(first.customers, 1);
    assert!((1..=5).contains(&first.orders));

    let second = seed_demo_stores(&pool, &stores, user_id).await.unwrap();
    assert_eq!(second.stores, 0);
    assert_eq!(second.skipped, 1);

    let tenant_id = list_tenants_for_user(&pool, user_id).await.unwrap()[0].id;
    let (orders_count, total_spent): (i32, Decimal) =
        sqlx::query_as("SELECT orders_count, total_spent FROM customers WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    let revenue = load_overview(&pool, tenant_id).await.unwrap().total_revenue;

    assert_eq!(i64::from(orders_count), count_orders(&pool, tenant_id).await.unwrap());
    assert_eq!(total_spent, revenue);
}
