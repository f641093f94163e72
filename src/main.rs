use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;
use wallets::config::{CliArgs, Config, LoggingConfig};
use axum::{extract::Request, ServiceExt};
use wallets::{app, AppState};
use wallets_contract::Contract;
use wallets_core::WalletStore;
use wallets_memory::InMemoryWalletStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let config = Config::load(&cli);

    init_tracing(&config.logging);

    let contract = Contract::load(config.contract.path.as_deref())
        .context("failed to load OpenAPI contract")?;
    tracing::debug!(?contract, "contract loaded");

    let store = InMemoryWalletStore::with_seed(config.store.seed.clone());
    tracing::info!(seeded = store.len()?, "wallet store ready");

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let app = app(AppState {
        store: Arc::new(store),
        contract: Arc::new(contract),
        metrics: Some(metrics),
    });

    let addr = config.listen_addr().context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, "Wallets API is running");

    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
