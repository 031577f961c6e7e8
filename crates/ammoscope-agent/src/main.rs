//! Ammoscope: ammunition catalog enrichment and incremental sync.
//! Entry point for the `ammoscope` binary.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ammoscope_db::{EntityStore, MemoryStore, PgStore};
use ammoscope_ingestion::{
    enrich_batch, load_catalog, ranking_rows, render_table, run_pipeline, RunStatus, SyncMode,
};

use config::{Config, StoreBackend, StoreConfig};

const DEFAULT_LOG_FILTER: &str = "ammoscope=debug,info";

#[derive(Parser, Debug)]
#[command(name = "ammoscope")]
#[command(about = "Score, tier and synchronise an ammunition catalog")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $AMMOSCOPE_CONFIG, then ./ammoscope.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog file, overriding [catalog] path
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich the catalog and write every change to the store
    Sync,
    /// Insert entities the store lacks; never modify existing ones
    Seed,
    /// Enrich the catalog and print the ranking table
    Rank {
        /// Print at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn init_tracing(configured: Option<&str>) {
    let fallback = configured.unwrap_or(DEFAULT_LOG_FILTER);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn EntityStore>> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using the in-memory store; nothing will be persisted");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let url = config
                .url
                .as_ref()
                .context("store.url is not set (or set AMMOSCOPE_DATABASE_URL)")?;
            let store = PgStore::connect_lazy(url.expose_secret(), &config.table, config.max_connections)?;
            // Connection problems are reported by the sync run itself.
            if let Err(e) = store.initialize().await {
                warn!(error = %e, "Could not prepare entity table");
            }
            Ok(Arc::new(store))
        }
    }
}

async fn sync(config: &Config, catalog: PathBuf, mode: SyncMode) -> Result<()> {
    let records = load_catalog(&catalog)
        .with_context(|| format!("failed to load catalog {}", catalog.display()))?;
    let store = open_store(&config.store).await?;

    let result = run_pipeline(records, store, &config.pipeline.options(mode)).await;
    println!("{}", serde_json::to_string_pretty(&result.report)?);

    if result.report.status == RunStatus::Error {
        anyhow::bail!(
            "synchronisation failed: {}",
            result.report.message.unwrap_or_default()
        );
    }
    Ok(())
}

fn rank(config: &Config, catalog: PathBuf, limit: Option<usize>) -> Result<()> {
    let mut records = load_catalog(&catalog)
        .with_context(|| format!("failed to load catalog {}", catalog.display()))?;
    enrich_batch(&mut records, &config.pipeline.options(SyncMode::default()));

    let mut rows = ranking_rows(&records);
    if let Some(limit) = limit {
        rows.truncate(limit);
    }
    print!("{}", render_table(&rows));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            init_tracing(None);
            return Err(e);
        }
    };
    init_tracing(config.logging.filter.as_deref());

    info!("Ammoscope {}", env!("CARGO_PKG_VERSION"));
    let catalog = cli.catalog.unwrap_or_else(|| config.catalog.path.clone());
    info!(
        backend = ?config.store.backend,
        table = %config.store.table,
        catalog = %catalog.display(),
        "Configuration loaded"
    );

    match cli.command {
        Command::Sync => sync(&config, catalog, SyncMode::Upsert).await,
        Command::Seed => sync(&config, catalog, SyncMode::InsertOnly).await,
        Command::Rank { limit } => rank(&config, catalog, limit),
    }
}
