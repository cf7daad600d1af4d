//! # Tradebook Ledger Crate
//!
//! This crate holds the state of a trading account and the rules for changing it.
//! A `Trader` owns a cash balance and a `Portfolio` of `Position`s, and exposes the
//! order-execution operations (buy, sell, market orders, short sales, short covers
//! and option trades) that move cash and holdings together.
//!
//! ## Architectural Principles
//!
//! - **All-or-nothing operations:** every precondition is checked before the first
//!   mutation. A failed operation leaves cash and positions untouched.
//! - **Explicit position kinds:** long versus short is a `Direction`, and option
//!   terms are an optional `OptionContract` on the position key. Nothing branches
//!   on concrete types.
//! - **Injected market data:** market orders take a `&dyn QuoteSource`, so the
//!   ledger never knows whether prices come from a live feed or a fixed table.
//!
//! ## Public API
//!
//! - `Trader`: the account and its order-execution operations.
//! - `Portfolio`: the ordered, de-duplicated collection of holdings.
//! - `Position` / `PositionKey`: a single holding and its identity.
//! - `LedgerError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod portfolio;
pub mod position;
pub mod trader;

// Re-export the key components to provide a clean, public-facing API.
pub use error::LedgerError;
pub use portfolio::Portfolio;
pub use position::{Position, PositionKey, PositionStatus};
pub use trader::{Cover, Fill, Trader};
