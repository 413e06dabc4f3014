//! `mnemos` binary: load config, wire the hosted backends, serve HTTP.

use anyhow::Context;
use clap::Parser;
use log::info;
use mnemos_rs_config::MnemosConfig;
use mnemos_rs_memory::MemoryOrchestrator;
use mnemos_rs_server::{AppState, create_router};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the memory service.
#[derive(Parser)]
#[command(name = "mnemos", version)]
struct Cli {
    /// Optional path to a mnemos.json5 config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the listen host
    #[arg(long)]
    host: Option<String>,
    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,
}

/// Entry point for the memory service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = env_logger::builder()
        .format_timestamp_millis()
        .parse_default_env()
        .try_init();

    let cli = Cli::parse();
    info!(
        "starting mnemos (config_set={}, host_set={}, port_set={})",
        cli.config.is_some(),
        cli.host.is_some(),
        cli.port.is_some()
    );
    let mut config =
        MnemosConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let orchestrator =
        MemoryOrchestrator::from_config(&config).context("failed to build backends")?;
    let router = create_router(Arc::new(AppState::new(orchestrator)));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening (addr={})", listener.local_addr()?);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
