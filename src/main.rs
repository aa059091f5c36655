//! Safari City Dashboard - game analytics over exported CSV tables
//!
//! Loads the dataset once, then serves the interactive dashboard until Ctrl-C.

mod charts;
mod config;
mod data;
mod stats;
mod web;

use anyhow::Context;
use config::DashboardConfig;
use data::Dataset;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use web::AppState;

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = DashboardConfig::load().context("Failed to load dashboard configuration")?;
    let addr = config.socket_addr()?;
    info!(data_dir = %config.data_dir.display(), %addr, "Starting Safari City dashboard");

    let dataset = Dataset::load(&config.data_dir)
        .with_context(|| format!("Failed to load dataset from {}", config.data_dir.display()))?;
    for (table, rows) in dataset.row_counts() {
        info!(table, rows, "Loaded table");
    }

    let state = AppState::new(Arc::new(dataset), config).context("Failed to load templates")?;
    web::serve(Arc::new(state), addr)
        .await
        .with_context(|| format!("Dashboard server failed on {addr}"))?;

    info!("Dashboard stopped");
    Ok(())
}
