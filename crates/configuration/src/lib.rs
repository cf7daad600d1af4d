use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Config, LedgerSettings, LoggingSettings, MarketDataSettings, QuoteProvider, StorageBackend,
    StorageSettings,
};

/// Prefix for environment overrides, e.g. `TRADEBOOK__STORAGE__BACKEND=postgres`.
pub const ENV_PREFIX: &str = "TRADEBOOK";

/// Loads the application configuration from `config.toml` in the working directory.
///
/// The file is optional: every section has defaults, and environment variables
/// prefixed with `TRADEBOOK__` are layered on top of whatever the file provides.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Loads the application configuration from an explicit file path.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(path = %path.display(), "Configuration loaded.");
    Ok(config)
}

/// Parses configuration from an in-memory TOML document, without consulting
/// the environment.
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.ledger.default_starting_cash, dec!(10000));
        assert_eq!(config.market_data.provider, QuoteProvider::Yahoo);
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = parse_config(
            r#"
            [storage]
            backend = "postgres"
            database_url = "postgres://localhost/tradebook"

            [market_data]
            provider = "static"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(
            config.storage.database_url.as_deref(),
            Some("postgres://localhost/tradebook")
        );
        assert_eq!(config.storage.max_connections, 5);
        assert_eq!(config.market_data.provider, QuoteProvider::Static);
        assert_eq!(config.market_data.timeout_secs, 10);
    }

    #[test]
    fn negative_starting_cash_is_rejected() {
        let err = parse_config("[ledger]\ndefault_starting_cash = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = parse_config("[market_data]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.storage.snapshot_dir, std::path::PathBuf::from("./snapshots"));
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[ledger]\ndefault_starting_cash = \"2500.50\"").unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.ledger.default_starting_cash, dec!(2500.50));
        assert_eq!(config.logging.level, "debug");
    }
}
