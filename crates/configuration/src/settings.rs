use crate::error::ConfigError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; missing sections fall back to
/// their `Default` implementation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub market_data: MarketDataSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Checks cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.default_starting_cash.is_sign_negative() {
            return Err(ConfigError::ValidationError(
                "ledger.default_starting_cash must not be negative".to_string(),
            ));
        }
        if self.market_data.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "market_data.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.storage.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "storage.max_connections must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters for newly opened trading accounts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Cash credited to an account opened without an explicit amount.
    pub default_starting_cash: Decimal,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            default_starting_cash: dec!(10000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteProvider {
    /// Live quotes over HTTP from a Yahoo-Finance-compatible endpoint.
    Yahoo,
    /// A fixed in-memory quote table, mostly for demos and tests.
    Static,
}

/// Where market quotes come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    pub provider: QuoteProvider,
    pub base_url: String,
    /// Per-request timeout applied by the HTTP client.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            provider: QuoteProvider::Yahoo,
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            user_agent: "tradebook/0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON document per trader in `snapshot_dir`.
    Json,
    /// PostgreSQL, reached through `database_url` or the `DATABASE_URL` variable.
    Postgres,
}

/// Where trader snapshots are saved.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub snapshot_dir: PathBuf,
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            snapshot_dir: PathBuf::from("./snapshots"),
            database_url: None,
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG` when set.
    pub level: String,
    /// When present, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}
