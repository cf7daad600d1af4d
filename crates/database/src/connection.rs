use crate::error::DbError;
use configuration::StorageSettings;
use dotenvy::dotenv;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::env;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// The URL comes from `storage.database_url` when set, otherwise from the
/// `DATABASE_URL` environment variable (a `.env` file is honored if present).
pub async fn connect(settings: &StorageSettings) -> Result<PgPool, DbError> {
    let database_url = match &settings.database_url {
        Some(url) => url.clone(),
        None => {
            // A missing .env file is fine; the variable may be exported directly.
            let _ = dotenv();
            env::var("DATABASE_URL").map_err(|_e| {
                DbError::ConnectionConfigError(
                    "storage.database_url or DATABASE_URL must be set.".to_string(),
                )
            })?
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections = settings.max_connections, "Connected to PostgreSQL.");
    Ok(pool)
}

/// Applies the embedded schema migrations so the snapshot tables exist.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
