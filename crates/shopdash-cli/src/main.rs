mod db;
mod insights;
mod sync;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::db::DbCommands;

#[derive(Debug, Parser)]
#[command(name = "shopdash-cli")]
#[command(about = "Shopify analytics dashboard command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Pull customers, products, and orders from Shopify
    Sync {
        /// Sync a single tenant
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        tenant: Option<Uuid>,
        /// Sync every tenant with an access token, one after another
        #[arg(long)]
        all: bool,
    },
    /// Print dashboard metrics for a tenant
    Insights {
        #[arg(long)]
        tenant: Uuid,
        /// First day (inclusive, UTC) of the orders-by-date table
        #[arg(long)]
        start_date: Option<NaiveDate>,
        /// Last day (inclusive, UTC) of the orders-by-date table
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// Emit JSON instead of tables
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("shopdash-cli: run with --help to list commands");
        return Ok(());
    };

    let config = shopdash_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = shopdash_db::PoolConfig::from_app_config(&config);
    let pool = shopdash_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => db::run_db_command(&pool, &config, command).await,
        Commands::Sync { tenant, all: _ } => sync::run_sync(&pool, &config, tenant).await,
        Commands::Insights {
            tenant,
            start_date,
            end_date,
            json,
        } => {
            let range = insights::DateRange {
                start: start_date,
                end: end_date,
            };
            insights::run_insights(&pool, &config, tenant, range, json).await
        }
    }
}
