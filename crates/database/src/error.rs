use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Database query failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("An error occurred during JSON serialization/deserialization: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Snapshot file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("No snapshot is saved under the name '{0}'.")]
    NotFound(String),

    #[error("A snapshot named '{0}' already exists; saving requires explicit overwrite.")]
    AlreadyExists(String),

    #[error("'{0}' cannot be used as a snapshot name.")]
    InvalidName(String),

    #[error("Stored snapshot is corrupt: {0}")]
    Corrupt(String),
}
