//! Pulls Shopify data into the relational store, one tenant at a time.
//!
//! [`SyncOrchestrator`] runs a single tenant through the customers, products,
//! and orders phases under a per-tenant lease; [`run_sweep`] walks every
//! credentialed tenant in turn; [`SyncNotifier`] fans progress events out to
//! live subscribers.

pub mod error;
pub mod mapper;
pub mod notify;
pub mod orchestrator;
pub mod sweep;

pub use error::SyncError;
pub use mapper::{OrdersMapped, ResourceMapper};
pub use notify::{SyncEvent, SyncNotifier, SyncPhase, SyncStatus};
pub use orchestrator::{SyncOrchestrator, SyncReport, SyncSettings};
pub use sweep::{run_sweep, SweepSummary, TenantOutcome};
