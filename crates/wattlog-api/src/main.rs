//! wattlog server binary.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wattlog_api::ApiServer;
use wattlog_config::AppConfig;
use wattlog_source::SheetsClient;
use wattlog_store::Store;
use wattlog_sync::SyncEngine;

#[derive(Debug, Parser)]
#[command(name = "wattlog-server", about = "Spreadsheet-to-store sync service")]
struct Args {
    /// Path to a TOML config file (defaults to ./wattlog.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Run a single sync cycle and exit instead of serving.
    #[arg(long)]
    sync_once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let store = Store::open(&config.store.path)?;
    let source = SheetsClient::new(&config.source)?;
    let engine = Arc::new(SyncEngine::new(store, Arc::new(source), &config));

    if args.sync_once {
        let report = engine.run_cycle().await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    ApiServer::new(&config, engine).run().await
}
