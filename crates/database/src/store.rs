use crate::error::DbError;
use async_trait::async_trait;
use core_types::TraderSnapshot;

/// What to do when a snapshot with the same name is already stored.
///
/// Overwriting is never implicit: the caller decides, typically after asking
/// the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Fail with `DbError::AlreadyExists` on a name collision.
    CreateNew,
    /// Replace the stored snapshot as a whole.
    Overwrite,
}

/// Persists and restores complete trader snapshots, keyed by trader name.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &TraderSnapshot, mode: SaveMode) -> Result<(), DbError>;

    async fn load(&self, name: &str) -> Result<TraderSnapshot, DbError>;

    async fn exists(&self, name: &str) -> Result<bool, DbError>;

    /// Every stored name, sorted.
    async fn list_names(&self) -> Result<Vec<String>, DbError>;

    /// Removes a snapshot; `NotFound` when nothing is stored under `name`.
    async fn delete(&self, name: &str) -> Result<(), DbError>;
}

/// Trader names become file names and primary keys, so they are restricted to
/// ASCII letters, digits, `_`, `-` and `.`, and may not start with a dot.
pub fn validate_name(name: &str) -> Result<(), DbError> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(DbError::InvalidName(name.to_string()))
    }
}
