//! Database maintenance commands: ping, migrate, seed.

use clap::Subcommand;
use shopdash_core::AppConfig;
use uuid::Uuid;

/// Sub-commands available under `db`.
#[derive(Debug, Subcommand)]
pub enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
    /// Create the demo stores with random orders
    Seed {
        /// Owner of the seeded tenants; defaults to the nil user that
        /// unauthenticated development servers act as
        #[arg(long)]
        user: Option<Uuid>,
    },
}

pub(crate) async fn run_db_command(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Ping => {
            shopdash_db::health_check(pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = shopdash_db::run_migrations(pool).await?;
            println!("migrations up to date ({applied} applied)");
        }
        DbCommands::Seed { user } => run_seed(pool, config, user.unwrap_or(Uuid::nil())).await?,
    }
    Ok(())
}

/// Seed the demo stores listed in the configured YAML file.
///
/// Stores whose domain already exists are skipped, so this is safe to rerun.
///
/// # Errors
///
/// Returns an error if the seed file is unreadable or invalid, or a database
/// write fails.
async fn run_seed(pool: &sqlx::PgPool, config: &AppConfig, user_id: Uuid) -> anyhow::Result<()> {
    let file = shopdash_core::load_demo_stores(&config.demo_stores_path)?;
    tracing::info!(
        path = %config.demo_stores_path.display(),
        stores = file.stores.len(),
        "seeding demo stores"
    );

    let summary = shopdash_db::seed_demo_stores(pool, &file.stores, user_id).await?;

    println!(
        "seeded {} store(s), skipped {} existing: {} products, {} customers, {} orders",
        summary.stores, summary.skipped, summary.products, summary.customers, summary.orders
    );
    Ok(())
}
