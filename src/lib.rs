//! # Tradebook
//!
//! A trading-account ledger: traders hold cash and positions, trade at explicit
//! prices or against live quotes, sell short, trade options, and are saved to
//! and restored from a snapshot store.
//!
//! This crate is the composition root. It turns a loaded `Config` into a
//! running `Engine` and installs tracing; the behavior itself lives in the
//! workspace crates re-exported below.

use anyhow::Context;
use configuration::{
    Config, MarketDataSettings, QuoteProvider, StorageBackend, StorageSettings,
};
use database::{JsonFileStore, PgSnapshotStore, SnapshotStore};
use market_data::{QuoteSource, StaticQuoteSource, YahooQuoteClient};
use std::sync::Arc;

pub mod telemetry;

pub use configuration;
pub use core_types;
pub use database;
pub use engine;
pub use ledger;
pub use market_data;

pub use engine::{Engine, EngineError};
pub use telemetry::{init_tracing, TelemetryGuard};

/// Loads `config.toml` plus `TRADEBOOK__*` environment overrides, reading a
/// `.env` file first when one exists.
pub fn load_settings() -> anyhow::Result<Config> {
    let _ = dotenvy::dotenv();
    configuration::load_config().context("failed to load configuration")
}

/// Builds the quote source selected by `market_data.provider`.
pub fn build_quote_source(settings: &MarketDataSettings) -> anyhow::Result<Arc<dyn QuoteSource>> {
    let source: Arc<dyn QuoteSource> = match settings.provider {
        QuoteProvider::Yahoo => Arc::new(
            YahooQuoteClient::new(settings).context("failed to build the HTTP quote client")?,
        ),
        QuoteProvider::Static => Arc::new(StaticQuoteSource::new()),
    };
    Ok(source)
}

/// Builds the snapshot store selected by `storage.backend`, connecting to
/// PostgreSQL and applying migrations when that backend is chosen.
pub async fn build_store(settings: &StorageSettings) -> anyhow::Result<Arc<dyn SnapshotStore>> {
    let store: Arc<dyn SnapshotStore> = match settings.backend {
        StorageBackend::Json => Arc::new(JsonFileStore::new(settings.snapshot_dir.clone())),
        StorageBackend::Postgres => {
            let pool = database::connect(settings)
                .await
                .context("failed to connect to PostgreSQL")?;
            database::run_migrations(&pool)
                .await
                .context("failed to apply database migrations")?;
            Arc::new(PgSnapshotStore::new(pool))
        }
    };
    Ok(store)
}

/// Wires a ready-to-use `Engine` from configuration.
pub async fn build_engine(config: &Config) -> anyhow::Result<Engine> {
    let quotes = build_quote_source(&config.market_data)?;
    let store = build_store(&config.storage).await?;
    tracing::info!(
        provider = ?config.market_data.provider,
        backend = ?config.storage.backend,
        default_cash = %config.ledger.default_starting_cash,
        "Engine ready."
    );
    Ok(Engine::new(quotes, store, config.ledger.default_starting_cash))
}
