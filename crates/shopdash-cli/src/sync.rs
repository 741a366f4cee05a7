//! `sync` command: one tenant, or a sweep over every credentialed tenant.

use shopdash_core::AppConfig;
use shopdash_sync::{run_sweep, SyncNotifier, SyncOrchestrator, SyncReport, SyncSettings};
use uuid::Uuid;

fn print_report(name: &str, report: &SyncReport) {
    println!(
        "{name}: {} customers, {} products, {} orders, {} line items",
        report.customers, report.products, report.orders, report.order_items
    );
}

/// Run a sync and print what it wrote.
///
/// With `tenant` set only that tenant is synced and its error is returned.
/// Otherwise every credentialed tenant is synced in turn; individual
/// failures are printed and the command fails at the end if any occurred.
///
/// # Errors
///
/// Returns an error if the single-tenant sync fails, the tenant list cannot
/// be loaded, or any tenant in a sweep failed.
pub(crate) async fn run_sync(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    tenant: Option<Uuid>,
) -> anyhow::Result<()> {
    let orchestrator = SyncOrchestrator::new(
        pool.clone(),
        SyncSettings::from_app_config(config),
        SyncNotifier::default(),
    );

    if let Some(tenant_id) = tenant {
        let report = orchestrator.sync_tenant_by_id(tenant_id).await?;
        print_report(&tenant_id.to_string(), &report);
        return Ok(());
    }

    let summary = run_sweep(&orchestrator).await?;
    if summary.outcomes.is_empty() {
        println!("no tenants with a Shopify access token; nothing to sync");
        return Ok(());
    }

    for outcome in &summary.outcomes {
        match &outcome.result {
            Ok(report) => print_report(&outcome.tenant_name, report),
            Err(e) => println!("{}: FAILED: {e}", outcome.tenant_name),
        }
    }

    if summary.failed() > 0 {
        anyhow::bail!(
            "{} of {} tenant sync(s) failed",
            summary.failed(),
            summary.outcomes.len()
        );
    }
    Ok(())
}
