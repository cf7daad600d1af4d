//! # Tradebook Engine Crate
//!
//! The application context. It owns the registry of open traders and the two
//! shared services they need, a `QuoteSource` for market orders and a
//! `SnapshotStore` for persistence, and exposes every ledger operation by
//! trader name.
//!
//! Each trader sits behind its own `tokio::sync::Mutex`; operations on one
//! trader are serialized while different traders proceed independently.

use database::{SaveMode, SnapshotStore};
use market_data::QuoteSource;
use rust_decimal::Decimal;
use std::sync::Arc;

pub mod error;
pub mod registry;

pub use core_types::{OptionContract, TraderSnapshot};
pub use error::EngineError;
pub use ledger::{Cover, Fill};
pub use registry::{TraderHandle, TraderRegistry};

/// The central orchestrator: traders, prices and storage wired together.
pub struct Engine {
    registry: TraderRegistry,
    quotes: Arc<dyn QuoteSource>,
    store: Arc<dyn SnapshotStore>,
    default_cash: Decimal,
}

impl Engine {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        store: Arc<dyn SnapshotStore>,
        default_cash: Decimal,
    ) -> Self {
        Self {
            registry: TraderRegistry::new(),
            quotes,
            store,
            default_cash,
        }
    }

    pub fn registry(&self) -> &TraderRegistry {
        &self.registry
    }

    pub fn default_cash(&self) -> Decimal {
        self.default_cash
    }

    // --- Trader lifecycle ---

    /// Opens a new trader with `cash`, or the configured default when `None`.
    pub async fn open_trader(&self, name: &str, cash: Option<Decimal>) -> Result<(), EngineError> {
        let cash = cash.unwrap_or(self.default_cash);
        self.registry.open(name, cash).await?;
        tracing::info!(trader = %name, cash = %cash, "Trader opened.");
        Ok(())
    }

    /// Drops a trader from the session. Saved snapshots are not touched.
    pub async fn close_trader(&self, name: &str) -> Result<(), EngineError> {
        self.registry.remove(name).await?;
        tracing::info!(trader = %name, "Trader closed.");
        Ok(())
    }

    pub async fn trader_names(&self) -> Vec<String> {
        self.registry.names().await
    }

    pub async fn cash(&self, name: &str) -> Result<Decimal, EngineError> {
        let trader = self.registry.get(name).await?;
        let cash = trader.lock().await.cash();
        Ok(cash)
    }

    /// The trader's current state, for display.
    pub async fn snapshot(&self, name: &str) -> Result<TraderSnapshot, EngineError> {
        let trader = self.registry.get(name).await?;
        let snapshot = trader.lock().await.snapshot();
        Ok(snapshot)
    }

    // --- Explicit-price trades ---

    pub async fn buy(&self, name: &str, symbol: &str, quantity: Decimal, price: Decimal) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let fill = trader.lock().await.buy(symbol, quantity, price)?;
        Ok(fill)
    }

    pub async fn sell(&self, name: &str, symbol: &str, quantity: Decimal, price: Decimal) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let fill = trader.lock().await.sell(symbol, quantity, price)?;
        Ok(fill)
    }

    // --- Market orders ---

    pub async fn market_buy(&self, name: &str, symbol: &str, quantity: Decimal) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let mut trader = trader.lock().await;
        Ok(trader.market_buy(self.quotes.as_ref(), symbol, quantity).await?)
    }

    pub async fn market_sell(&self, name: &str, symbol: &str, quantity: Decimal) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let mut trader = trader.lock().await;
        Ok(trader.market_sell(self.quotes.as_ref(), symbol, quantity).await?)
    }

    pub async fn short_sell(&self, name: &str, symbol: &str, quantity: Decimal) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let mut trader = trader.lock().await;
        Ok(trader.short_sell(self.quotes.as_ref(), symbol, quantity).await?)
    }

    pub async fn short_cover(&self, name: &str, symbol: &str, quantity: Decimal) -> Result<Cover, EngineError> {
        let trader = self.registry.get(name).await?;
        let cover = trader.lock().await.short_cover(symbol, quantity)?;
        Ok(cover)
    }

    // --- Options ---

    pub async fn buy_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let fill = trader.lock().await.buy_option(symbol, contract, quantity, premium)?;
        Ok(fill)
    }

    pub async fn sell_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let fill = trader.lock().await.sell_option(symbol, contract, quantity, premium)?;
        Ok(fill)
    }

    pub async fn write_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let fill = trader.lock().await.write_option(symbol, contract, quantity, premium)?;
        Ok(fill)
    }

    pub async fn close_written_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let fill = trader
            .lock()
            .await
            .close_written_option(symbol, contract, quantity, premium)?;
        Ok(fill)
    }

    // Option orders filled against the quote source's premium book.

    pub async fn market_buy_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let mut trader = trader.lock().await;
        Ok(trader.market_buy_option(self.quotes.as_ref(), symbol, contract, quantity).await?)
    }

    pub async fn market_sell_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let mut trader = trader.lock().await;
        Ok(trader.market_sell_option(self.quotes.as_ref(), symbol, contract, quantity).await?)
    }

    pub async fn market_write_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let mut trader = trader.lock().await;
        Ok(trader.market_write_option(self.quotes.as_ref(), symbol, contract, quantity).await?)
    }

    pub async fn market_close_written_option(
        &self,
        name: &str,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, EngineError> {
        let trader = self.registry.get(name).await?;
        let mut trader = trader.lock().await;
        Ok(trader.market_close_written_option(self.quotes.as_ref(), symbol, contract, quantity).await?)
    }

    // --- Persistence ---

    /// Writes the trader's full state to the store under its name.
    ///
    /// With `SaveMode::CreateNew` an existing snapshot is left in place and
    /// `DbError::AlreadyExists` is returned, so the caller can ask before
    /// retrying with `SaveMode::Overwrite`.
    pub async fn save(&self, name: &str, mode: SaveMode) -> Result<(), EngineError> {
        let snapshot = self.snapshot(name).await?;
        self.store.save(&snapshot, mode).await?;
        tracing::info!(
            trader = %name,
            cash = %snapshot.cash,
            positions = snapshot.positions.len(),
            mode = ?mode,
            "Trader saved."
        );
        Ok(())
    }

    /// Restores a saved trader into the session, replacing an open trader of
    /// the same name. Returns whether one was replaced.
    pub async fn load(&self, name: &str) -> Result<bool, EngineError> {
        let snapshot = self.store.load(name).await?;
        let trader = ledger::Trader::from_snapshot(snapshot)?;
        let cash = trader.cash();
        let positions = trader.portfolio().len();
        let replaced = self.registry.insert(trader).await.is_some();
        tracing::info!(trader = %name, cash = %cash, positions, replaced, "Trader loaded.");
        Ok(replaced)
    }

    pub async fn saved_names(&self) -> Result<Vec<String>, EngineError> {
        Ok(self.store.list_names().await?)
    }

    pub async fn delete_saved(&self, name: &str) -> Result<(), EngineError> {
        self.store.delete(name).await?;
        tracing::info!(trader = %name, "Saved trader deleted.");
        Ok(())
    }
}
