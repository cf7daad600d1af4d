use crate::error::DbError;
use crate::store::{validate_name, SaveMode, SnapshotStore};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use core_types::{Direction, OptionContract, OptionKind, PositionRecord, TraderSnapshot};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow, Postgres};
use sqlx::{Row, Transaction};

/// Stores trader snapshots in PostgreSQL.
///
/// A trader is a row in `traders`; its holdings are rows in `trader_positions`
/// ordered by `ordinal`. Saving replaces both inside one transaction.
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_positions(
        tx: &mut Transaction<'_, Postgres>,
        snapshot: &TraderSnapshot,
    ) -> Result<(), DbError> {
        for (ordinal, record) in snapshot.positions.iter().enumerate() {
            let ordinal = i32::try_from(ordinal)
                .map_err(|_| DbError::Corrupt(format!("too many positions for '{}'", snapshot.name)))?;
            let contract = record.contract.as_ref();

            sqlx::query(
                r#"
                INSERT INTO trader_positions
                    (id, trader_name, ordinal, symbol, quantity, direction,
                     option_kind, expiration, strike, borrow_fee, opened_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(record.id)
            .bind(&snapshot.name)
            .bind(ordinal)
            .bind(&record.symbol)
            .bind(record.quantity)
            .bind(record.direction.to_string())
            .bind(contract.map(|c| c.kind.to_string()))
            .bind(contract.map(|c| c.expiration))
            .bind(contract.map(|c| c.strike))
            .bind(record.borrow_fee)
            .bind(record.opened_at)
            .bind(record.updated_at)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn save(&self, snapshot: &TraderSnapshot, mode: SaveMode) -> Result<(), DbError> {
        validate_name(&snapshot.name)?;
        let mut tx: Transaction<Postgres> = self.pool.begin().await?;

        match mode {
            SaveMode::CreateNew => {
                let inserted = sqlx::query(
                    "INSERT INTO traders (name, cash, saved_at) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
                )
                .bind(&snapshot.name)
                .bind(snapshot.cash)
                .bind(snapshot.saved_at)
                .execute(&mut *tx)
                .await?;
                if inserted.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(DbError::AlreadyExists(snapshot.name.clone()));
                }
            }
            SaveMode::Overwrite => {
                sqlx::query(
                    r#"
                    INSERT INTO traders (name, cash, saved_at) VALUES ($1, $2, $3)
                    ON CONFLICT (name) DO UPDATE SET cash = EXCLUDED.cash, saved_at = EXCLUDED.saved_at
                    "#,
                )
                .bind(&snapshot.name)
                .bind(snapshot.cash)
                .bind(snapshot.saved_at)
                .execute(&mut *tx)
                .await?;
                sqlx::query("DELETE FROM trader_positions WHERE trader_name = $1")
                    .bind(&snapshot.name)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        Self::insert_positions(&mut tx, snapshot).await?;
        tx.commit().await?;

        tracing::debug!(name = %snapshot.name, positions = snapshot.positions.len(), "Snapshot stored in database.");
        Ok(())
    }

    async fn load(&self, name: &str) -> Result<TraderSnapshot, DbError> {
        validate_name(name)?;
        let trader = sqlx::query("SELECT name, cash, saved_at FROM traders WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(name.to_string()))?;

        let rows = sqlx::query(
            r#"
            SELECT id, symbol, quantity, direction, option_kind, expiration, strike,
                   borrow_fee, opened_at, updated_at
            FROM trader_positions
            WHERE trader_name = $1
            ORDER BY ordinal ASC
            "#,
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        let positions = rows
            .iter()
            .map(position_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TraderSnapshot {
            name: trader.try_get("name")?,
            cash: trader.try_get("cash")?,
            positions,
            saved_at: trader.try_get("saved_at")?,
        })
    }

    async fn exists(&self, name: &str) -> Result<bool, DbError> {
        validate_name(name)?;
        let found: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM traders WHERE name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }

    async fn list_names(&self) -> Result<Vec<String>, DbError> {
        let names = sqlx::query_scalar("SELECT name FROM traders ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<(), DbError> {
        validate_name(name)?;
        // Positions follow via ON DELETE CASCADE.
        let deleted = sqlx::query("DELETE FROM traders WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(DbError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

fn position_from_row(row: &PgRow) -> Result<PositionRecord, DbError> {
    let direction: String = row.try_get("direction")?;
    let direction = match direction.as_str() {
        "long" => Direction::Long,
        "short" => Direction::Short,
        other => return Err(DbError::Corrupt(format!("unknown direction '{other}'"))),
    };

    let kind: Option<String> = row.try_get("option_kind")?;
    let expiration: Option<NaiveDate> = row.try_get("expiration")?;
    let strike: Option<Decimal> = row.try_get("strike")?;
    let contract = match (kind.as_deref(), expiration, strike) {
        (None, None, None) => None,
        (Some(kind), Some(expiration), Some(strike)) => {
            let kind = match kind {
                "call" => OptionKind::Call,
                "put" => OptionKind::Put,
                other => return Err(DbError::Corrupt(format!("unknown option kind '{other}'"))),
            };
            let contract = OptionContract::new(kind, expiration, strike)
                .map_err(|e| DbError::Corrupt(e.to_string()))?;
            Some(contract)
        }
        _ => return Err(DbError::Corrupt("incomplete option contract columns".to_string())),
    };

    let opened_at: DateTime<Utc> = row.try_get("opened_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(PositionRecord {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        quantity: row.try_get("quantity")?,
        direction,
        contract,
        borrow_fee: row.try_get("borrow_fee")?,
        opened_at,
        updated_at,
    })
}
