//! `derlg-api`: reads the configuration and serves the platform API

use anyhow::Result;
use derlg::app::AppState;
use derlg::config::AppConfig;
use derlg::core::events::log_events;
use derlg::core::module::Module;
use derlg::payments::SimulatedGateway;
use derlg::server::builder::shutdown_signal;
use derlg::server::{PlatformModule, ServerBuilder};
use derlg::storage::Stores;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging.filter);

    let stores = open_stores(&config).await?;
    let addr = config.server.addr();
    let scheduler_enabled = config.scheduler.enabled;
    let state = AppState::new(config, stores, Arc::new(SimulatedGateway::new()));

    tokio::spawn(log_events(state.events.as_ref().clone()));

    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = scheduler_enabled.then(|| Arc::new(state.scheduler()).spawn(stop_rx));

    let module = PlatformModule::new(state.clone());
    tracing::info!(
        module = module.name(),
        version = module.version(),
        entities = ?module.entity_types(),
        "starting DerLg API"
    );

    ServerBuilder::new(state)
        .register_module(module)
        .serve_until(&addr, async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        })
        .await?;

    if let Some(handle) = scheduler {
        handle.await?;
    }
    Ok(())
}

/// `RUST_LOG` wins over the configured filter
fn init_tracing(configured: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(feature = "mysql")]
async fn open_stores(config: &AppConfig) -> Result<Stores> {
    use derlg::storage::mysql::{connect, ensure_schema};

    let Some(url) = &config.database.url else {
        tracing::warn!("no database url configured, using in-memory stores");
        return Ok(Stores::in_memory());
    };
    let pool = connect(url, config.database.max_connections).await?;
    ensure_schema(&pool).await?;
    tracing::info!("connected to MySQL");
    Ok(Stores::mysql(pool))
}

#[cfg(not(feature = "mysql"))]
async fn open_stores(config: &AppConfig) -> Result<Stores> {
    if config.database.url.is_some() {
        tracing::warn!("database url ignored: built without the mysql feature");
    }
    Ok(Stores::in_memory())
}
