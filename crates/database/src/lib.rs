//! # Tradebook Database Crate
//!
//! This crate persists complete trader snapshots so an account can be saved and
//! restored across sessions. It is the system's "permanent archive."
//!
//! ## Architectural Principles
//!
//! - **One seam, two backends:** everything above this crate talks to the
//!   `SnapshotStore` trait. `JsonFileStore` keeps a JSON document per trader on
//!   disk; `PgSnapshotStore` keeps rows in PostgreSQL.
//! - **Whole-object replacement:** a save writes the entire snapshot atomically
//!   (temp-file rename, or a single transaction). There are no partial updates.
//! - **Explicit overwrite:** saving over an existing name fails unless the caller
//!   passes `SaveMode::Overwrite`.
//!
//! ## Public API
//!
//! - `SnapshotStore` / `SaveMode`: the storage contract.
//! - `JsonFileStore`, `PgSnapshotStore`: the two implementations.
//! - `connect`, `run_migrations`: PostgreSQL pool setup and schema migrations.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod json_store;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use json_store::JsonFileStore;
pub use repository::PgSnapshotStore;
pub use store::{validate_name, SaveMode, SnapshotStore};
