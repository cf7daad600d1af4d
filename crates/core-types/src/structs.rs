use crate::enums::{Direction, OptionKind, QuoteSide};
use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The terms of an option contract attached to a holding.
///
/// A holding without a contract is a plain equity position. Calls and puts are
/// distinguished by `kind` only; whether the contract was bought or written is
/// carried by the position's `Direction`, never by the contract itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OptionContract {
    pub kind: OptionKind,
    pub expiration: NaiveDate,
    pub strike: Decimal,
}

impl OptionContract {
    /// Creates a contract, rejecting a non-positive strike price.
    pub fn new(kind: OptionKind, expiration: NaiveDate, strike: Decimal) -> Result<Self, CoreError> {
        if strike <= Decimal::ZERO {
            return Err(CoreError::InvalidInput(
                "strike".to_string(),
                format!("must be positive, got {}", strike),
            ));
        }
        Ok(Self { kind, expiration, strike })
    }

    pub fn call(expiration: NaiveDate, strike: Decimal) -> Result<Self, CoreError> {
        Self::new(OptionKind::Call, expiration, strike)
    }

    pub fn put(expiration: NaiveDate, strike: Decimal) -> Result<Self, CoreError> {
        Self::new(OptionKind::Put, expiration, strike)
    }
}

impl fmt::Display for OptionContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.expiration, self.kind, self.strike)
    }
}

/// The best price currently offered on one side of the book, and how much is
/// available at that price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub side: QuoteSide,
    pub price: Decimal,
    pub size: Decimal,
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} x {}", self.price, self.size)
    }
}

/// The persisted form of a single holding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    pub direction: Direction,
    #[serde(default)]
    pub contract: Option<OptionContract>,
    #[serde(default)]
    pub borrow_fee: Option<Decimal>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A complete, self-contained image of one trader's account.
///
/// Stores replace the whole object on save; there is no partial update and no
/// schema versioning beyond that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraderSnapshot {
    pub name: String,
    pub cash: Decimal,
    pub positions: Vec<PositionRecord>,
    pub saved_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 1, 15).unwrap()
    }

    #[test]
    fn contract_rejects_non_positive_strike() {
        assert!(OptionContract::call(expiry(), dec!(0)).is_err());
        assert!(OptionContract::put(expiry(), dec!(-5)).is_err());
        assert!(OptionContract::call(expiry(), dec!(120)).is_ok());
    }

    #[test]
    fn quote_displays_price_by_size() {
        let quote = Quote {
            symbol: "ACME".to_string(),
            side: QuoteSide::Ask,
            price: dec!(50.25),
            size: dec!(300),
        };
        assert_eq!(quote.to_string(), "$50.25 x 300");
    }

    #[test]
    fn snapshot_tolerates_missing_optional_fields() {
        let json = r#"{
            "name": "alice",
            "cash": "100",
            "positions": [{
                "id": "6f1c4f5e-2d2b-4a57-9a55-0d4f5f0b7c11",
                "symbol": "ACME",
                "quantity": "3",
                "direction": "Long",
                "opened_at": "2026-01-02T03:04:05Z",
                "updated_at": "2026-01-02T03:04:05Z"
            }],
            "saved_at": "2026-01-02T03:04:05Z"
        }"#;
        let snapshot: TraderSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.positions.len(), 1);
        assert_eq!(snapshot.positions[0].contract, None);
        assert_eq!(snapshot.positions[0].borrow_fee, None);
    }
}
