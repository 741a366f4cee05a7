use shopdash_core::{AppConfig, LineItemMode, Tenant};
use shopdash_shopify::{AdminClientOptions, ShopifyAdminClient, ShopifyError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::SyncError;
use crate::mapper::ResourceMapper;
use crate::notify::{SyncEvent, SyncNotifier, SyncPhase, SyncStatus};

/// Deployment-wide sync settings.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub client: AdminClientOptions,
    pub line_items: LineItemMode,
    pub lease_ttl_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            client: AdminClientOptions::default(),
            line_items: LineItemMode::default(),
            lease_ttl_secs: 3600,
        }
    }
}

impl SyncSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            client: AdminClientOptions::from_app_config(config),
            line_items: config.sync_line_items,
            lease_ttl_secs: config.sync_lease_ttl_secs,
        }
    }
}

/// What one successful sync wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub tenant_id: Uuid,
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
    pub order_items: u64,
}

/// Runs full syncs for single tenants.
///
/// Phases run strictly in order (customers, products, orders) and each
/// page is written before the next is fetched. A phase failure aborts the
/// sync; rows written before the failure stay written.
#[derive(Clone)]
pub struct SyncOrchestrator {
    pool: PgPool,
    settings: SyncSettings,
    notifier: SyncNotifier,
}

impl SyncOrchestrator {
    #[must_use]
    pub fn new(pool: PgPool, settings: SyncSettings, notifier: SyncNotifier) -> Self {
        Self {
            pool,
            settings,
            notifier,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn notifier(&self) -> &SyncNotifier {
        &self.notifier
    }

    /// Load a tenant by id and sync it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] for an unknown id, otherwise as
    /// [`Self::sync_tenant`].
    pub async fn sync_tenant_by_id(&self, tenant_id: Uuid) -> Result<SyncReport, SyncError> {
        let tenant = shopdash_db::get_tenant(&self.pool, tenant_id)
            .await?
            .ok_or(SyncError::NotFound(tenant_id))?;
        self.sync_tenant(&Tenant::from(tenant)).await
    }

    /// Pull customers, products, and orders for one tenant.
    ///
    /// A tenant without an access token fails before any network call. A
    /// tenant whose lease is held by another sync fails with
    /// [`SyncError::AlreadyRunning`] and nothing is fetched.
    ///
    /// # Errors
    ///
    /// - [`SyncError::MissingCredential`] / [`SyncError::InvalidCredential`]
    ///   for an unusable token or domain.
    /// - [`SyncError::AlreadyRunning`] if the lease is taken.
    /// - [`SyncError::External`] for transport, status, or pagination
    ///   failures.
    /// - [`SyncError::Parse`] for malformed numeric or timestamp fields.
    /// - [`SyncError::Database`] for storage failures.
    /// - [`SyncError::Aborted`] if the sync task panicked.
    pub async fn sync_tenant(&self, tenant: &Tenant) -> Result<SyncReport, SyncError> {
        let access_token = match tenant.shopify_access_token.as_deref() {
            Some(token) if tenant.has_credential() => token,
            _ => return Err(SyncError::MissingCredential(tenant.id)),
        };

        let client = ShopifyAdminClient::new(
            &tenant.shopify_domain,
            access_token,
            &self.settings.client,
        )
        .map_err(|source| match source {
            ShopifyError::InvalidShopDomain { .. } | ShopifyError::InvalidAccessToken => {
                SyncError::InvalidCredential {
                    tenant_id: tenant.id,
                    source,
                }
            }
            other => SyncError::External(other),
        })?;

        let holder = Uuid::new_v4();
        let acquired = shopdash_db::acquire_sync_lease(
            &self.pool,
            tenant.id,
            holder,
            self.settings.lease_ttl_secs,
        )
        .await?;
        if !acquired {
            tracing::warn!(tenant = %tenant.name, tenant_id = %tenant.id, "sync already running; skipping");
            return Err(SyncError::AlreadyRunning(tenant.id));
        }

        let run = self.clone();
        let owned = tenant.clone();
        let task = tokio::spawn(async move { run.run_leased(client, &owned, holder).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(tenant_id = %tenant.id, error = %e, "sync task aborted");
                if let Err(release) =
                    shopdash_db::release_sync_lease(&self.pool, tenant.id, holder).await
                {
                    tracing::error!(tenant_id = %tenant.id, error = %release, "failed to release sync lease");
                }
                Err(SyncError::Aborted {
                    tenant_id: tenant.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Runs the phases while `holder` owns the tenant's lease, then releases
    /// it and publishes the outcome.
    ///
    /// Runs on its own task so that a caller dropping the sync future does
    /// not strand the lease.
    async fn run_leased(
        &self,
        client: ShopifyAdminClient,
        tenant: &Tenant,
        holder: Uuid,
    ) -> Result<SyncReport, SyncError> {
        tracing::info!(tenant = %tenant.name, tenant_id = %tenant.id, "starting sync");
        self.notifier
            .publish(SyncEvent::status(tenant.id, SyncStatus::Started, None));

        let result = self.run_phases(&client, tenant).await;

        match shopdash_db::release_sync_lease(&self.pool, tenant.id, holder).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                tenant_id = %tenant.id,
                "sync lease expired before release; another sync may have taken over"
            ),
            Err(e) => tracing::error!(tenant_id = %tenant.id, error = %e, "failed to release sync lease"),
        }

        match &result {
            Ok(report) => {
                tracing::info!(
                    tenant = %tenant.name,
                    customers = report.customers,
                    products = report.products,
                    orders = report.orders,
                    order_items = report.order_items,
                    "sync completed"
                );
                self.notifier
                    .publish(SyncEvent::status(tenant.id, SyncStatus::Completed, None));
            }
            Err(e) => {
                tracing::error!(tenant = %tenant.name, error = %e, "sync failed");
                self.notifier.publish(SyncEvent::status(
                    tenant.id,
                    SyncStatus::Failed,
                    Some(e.to_string()),
                ));
            }
        }

        result
    }

    async fn run_phases(
        &self,
        client: &ShopifyAdminClient,
        tenant: &Tenant,
    ) -> Result<SyncReport, SyncError> {
        let mapper = ResourceMapper::new(&self.pool, tenant.id, self.settings.line_items);

        let mut customers = 0usize;
        let mut pages = client.customers();
        while let Some(page) = pages.next_page().await? {
            customers += mapper.map_customers(page).await?;
        }
        self.phase_done(tenant, SyncPhase::Customers, customers);

        let mut products = 0usize;
        let mut pages = client.products();
        while let Some(page) = pages.next_page().await? {
            products += mapper.map_products(page).await?;
        }
        self.phase_done(tenant, SyncPhase::Products, products);

        let mut orders = 0usize;
        let mut order_items = 0u64;
        let mut pages = client.orders();
        while let Some(page) = pages.next_page().await? {
            let mapped = mapper.map_orders(page).await?;
            orders += mapped.orders;
            order_items += mapped.order_items;
        }
        self.phase_done(tenant, SyncPhase::Orders, orders);

        Ok(SyncReport {
            tenant_id: tenant.id,
            customers,
            products,
            orders,
            order_items,
        })
    }

    fn phase_done(&self, tenant: &Tenant, phase: SyncPhase, count: usize) {
        tracing::info!(tenant = %tenant.name, %phase, count, "phase synced");
        self.notifier
            .publish(SyncEvent::data_update(tenant.id, phase, count));
    }
}
