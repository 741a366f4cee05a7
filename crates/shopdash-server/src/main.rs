mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use shopdash_sync::{SyncNotifier, SyncOrchestrator, SyncSettings};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(shopdash_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = shopdash_db::PoolConfig::from_app_config(&config);
    let pool = shopdash_db::connect_pool(&config.database_url, pool_config).await?;
    shopdash_db::run_migrations(&pool).await?;

    let orchestrator = SyncOrchestrator::new(
        pool.clone(),
        SyncSettings::from_app_config(&config),
        SyncNotifier::default(),
    );
    let _scheduler = scheduler::build_scheduler(orchestrator.clone(), &config.sync_cron).await?;

    let auth = AuthState::from_env(
        matches!(config.env, shopdash_core::Environment::Development),
        &config.api_key_hash_salt,
    )?;
    let state = AppState {
        pool,
        sync: orchestrator,
        growth_policy: config.growth_policy,
    };
    let app = build_app(state, auth, default_rate_limit_state(), &config.cors_origins);

    tracing::info!(addr = %config.bind_addr, env = ?config.env, "shopdash-server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
