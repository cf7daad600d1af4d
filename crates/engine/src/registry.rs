use crate::error::EngineError;
use ledger::Trader;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A shared handle to one trader. Holding the lock makes the caller the only
/// writer for that account.
pub type TraderHandle = Arc<Mutex<Trader>>;

/// The set of traders open in this session, keyed by name.
///
/// The map lock is only held while looking up or swapping a handle; work on a
/// trader happens under that trader's own mutex.
#[derive(Debug, Default)]
pub struct TraderRegistry {
    traders: RwLock<HashMap<String, TraderHandle>>,
}

impl TraderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a fresh account. Fails if the name is already taken.
    pub async fn open(&self, name: &str, cash: Decimal) -> Result<TraderHandle, EngineError> {
        if database::validate_name(name).is_err() {
            return Err(EngineError::InvalidTraderName(name.to_string()));
        }
        let trader = Trader::new(name, cash)?;

        let mut traders = self.traders.write().await;
        if traders.contains_key(name) {
            return Err(EngineError::TraderExists(name.to_string()));
        }
        let handle = Arc::new(Mutex::new(trader));
        traders.insert(name.to_string(), Arc::clone(&handle));
        Ok(handle)
    }

    /// Registers a trader built elsewhere (typically restored from a snapshot),
    /// replacing any open trader of the same name. Returns the replaced handle.
    pub async fn insert(&self, trader: Trader) -> Option<TraderHandle> {
        let name = trader.name().to_string();
        self.traders
            .write()
            .await
            .insert(name, Arc::new(Mutex::new(trader)))
    }

    pub async fn get(&self, name: &str) -> Result<TraderHandle, EngineError> {
        self.traders
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::TraderNotFound(name.to_string()))
    }

    pub async fn remove(&self, name: &str) -> Result<TraderHandle, EngineError> {
        self.traders
            .write()
            .await
            .remove(name)
            .ok_or_else(|| EngineError::TraderNotFound(name.to_string()))
    }

    /// Names of all open traders, sorted.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.traders.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self) -> usize {
        self.traders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.traders.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn open_rejects_duplicate_names() {
        let registry = TraderRegistry::new();
        registry.open("alice", dec!(1000)).await.unwrap();

        let err = registry.open("alice", dec!(5)).await.unwrap_err();
        assert!(matches!(err, EngineError::TraderExists(ref name) if name == "alice"));
        let alice = registry.get("alice").await.unwrap();
        assert_eq!(alice.lock().await.cash(), dec!(1000));
    }

    #[tokio::test]
    async fn open_rejects_negative_cash_and_bad_names() {
        let registry = TraderRegistry::new();

        assert!(matches!(
            registry.open("bob", dec!(-1)).await,
            Err(EngineError::Ledger(ledger::LedgerError::NegativeCash(_)))
        ));
        assert!(matches!(
            registry.open("../bob", dec!(1)).await,
            Err(EngineError::InvalidTraderName(_))
        ));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn insert_replaces_and_remove_forgets() {
        let registry = TraderRegistry::new();
        registry.open("carol", dec!(10)).await.unwrap();

        let replaced = registry.insert(Trader::new("carol", dec!(99)).unwrap()).await;
        assert!(replaced.is_some());
        assert_eq!(registry.get("carol").await.unwrap().lock().await.cash(), dec!(99));

        registry.remove("carol").await.unwrap();
        assert!(matches!(registry.get("carol").await, Err(EngineError::TraderNotFound(_))));
        assert!(matches!(registry.remove("carol").await, Err(EngineError::TraderNotFound(_))));
    }

    #[tokio::test]
    async fn names_are_sorted() {
        let registry = TraderRegistry::new();
        for name in ["zed", "amy", "moe"] {
            registry.open(name, dec!(0)).await.unwrap();
        }
        assert_eq!(registry.names().await, vec!["amy", "moe", "zed"]);
        assert_eq!(registry.len().await, 3);
    }
}
