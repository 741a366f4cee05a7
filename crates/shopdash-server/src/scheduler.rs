//! Background job scheduler.
//!
//! Registers the recurring Shopify sync sweep at server startup.

use std::sync::Arc;

use shopdash_sync::{run_sweep, SyncOrchestrator};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all scheduled jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// `sync_cron` is not a valid six-field expression, or the scheduler fails
/// to start.
pub async fn build_scheduler(
    orchestrator: SyncOrchestrator,
    sync_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_sync_sweep_job(&scheduler, orchestrator, sync_cron).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the sync sweep over every credentialed tenant.
///
/// Fires on wall-clock cron ticks (UTC), not relative to the previous run.
/// Overlap with a still-running sweep or an on-demand sync is settled per
/// tenant by the sync lease.
async fn register_sync_sweep_job(
    scheduler: &JobScheduler,
    orchestrator: SyncOrchestrator,
    sync_cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = sync_sweep_job(orchestrator, sync_cron)?;
    scheduler.add(job).await?;
    tracing::info!(cron = %sync_cron, "scheduler: registered Shopify sync sweep");
    Ok(())
}

fn sync_sweep_job(
    orchestrator: SyncOrchestrator,
    sync_cron: &str,
) -> Result<Job, JobSchedulerError> {
    let orchestrator = Arc::new(orchestrator);

    Job::new_async(sync_cron, move |_uuid, _lock| {
        let orchestrator = Arc::clone(&orchestrator);

        Box::pin(async move {
            tracing::info!("scheduler: starting Shopify sync sweep");
            match run_sweep(&orchestrator).await {
                Ok(summary) => tracing::info!(
                    succeeded = summary.succeeded(),
                    failed = summary.failed(),
                    "scheduler: Shopify sync sweep complete"
                ),
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: failed to load credentialed tenants");
                }
            }
        })
    })
}
