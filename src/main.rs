mod chatguru;
mod cli;
mod config;
mod error;
mod interrupt;
mod reconcile;
mod sheet;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use chatguru::ChatGuruClient;
use cli::{Cli, Command};
use config::AppConfig;
use error::AppError;
use reconcile::{LoopSettings, Reconciler};
use sheet::{FileStore, SheetStore};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // `.env` may set RUST_LOG.
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load().context("failed to load configuration")?;
    debug!(config = ?config.redacted(), "configuration loaded");
    config.validate()?;

    let store = FileStore::for_path(&config.sheet);
    let mut sheet = store.load().map_err(AppError::from)?;
    info!(path = %store.path().display(), rows = sheet.len(), "sheet loaded");

    let client = ChatGuruClient::new(&config).map_err(AppError::from)?;
    let token = CancellationToken::new();
    interrupt::install_ctrl_c(token.clone());

    let reconciler = Reconciler::new(&client, &store, token, LoopSettings::from_config(&config));
    let summary = match cli.command {
        None => reconciler.process_pending(&mut sheet).await,
        Some(Command::Check) => reconciler.poll_pending_rows(&mut sheet).await,
    };

    ui::print_summary(&summary);
    Ok(())
}
