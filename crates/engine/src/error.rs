use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("A trader named '{0}' is already open.")]
    TraderExists(String),

    #[error("No trader named '{0}' is open.")]
    TraderNotFound(String),

    #[error("'{0}' is not a valid trader name.")]
    InvalidTraderName(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] ledger::LedgerError),

    #[error("Storage error: {0}")]
    Storage(#[from] database::DbError),
}
