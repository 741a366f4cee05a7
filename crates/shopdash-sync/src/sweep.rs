//! One pass over every credentialed tenant.

use uuid::Uuid;

use crate::error::SyncError;
use crate::orchestrator::{SyncOrchestrator, SyncReport};

/// Result of syncing one tenant during a sweep.
#[derive(Debug)]
pub struct TenantOutcome {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub result: Result<SyncReport, SyncError>,
}

#[derive(Debug, Default)]
pub struct SweepSummary {
    pub outcomes: Vec<TenantOutcome>,
}

impl SweepSummary {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Sync every tenant that has an access token, one after another.
///
/// A tenant's failure is logged and recorded in its outcome; the sweep moves
/// on to the next tenant.
///
/// # Errors
///
/// Returns [`SyncError::Database`] only if the tenant list cannot be read.
pub async fn run_sweep(orchestrator: &SyncOrchestrator) -> Result<SweepSummary, SyncError> {
    let tenants = shopdash_db::list_credentialed_tenants(orchestrator.pool()).await?;
    tracing::info!(count = tenants.len(), "sweep: syncing credentialed tenants");

    let mut summary = SweepSummary::default();
    for row in tenants {
        let tenant = shopdash_core::Tenant::from(row);
        let result = orchestrator.sync_tenant(&tenant).await;
        if let Err(e) = &result {
            tracing::error!(
                tenant = %tenant.name,
                tenant_id = %tenant.id,
                error = %e,
                "sweep: tenant sync failed; continuing"
            );
        }
        summary.outcomes.push(TenantOutcome {
            tenant_id: tenant.id,
            tenant_name: tenant.name,
            result,
        });
    }

    tracing::info!(
        succeeded = summary.succeeded(),
        failed = summary.failed(),
        "sweep: complete"
    );
    Ok(summary)
}
