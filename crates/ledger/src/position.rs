use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use core_types::{Direction, OptionContract, PositionRecord};
use rust_decimal::Decimal;
use std::fmt;
use uuid::Uuid;

/// Identifies one holding inside a portfolio.
///
/// Two trades touch the same position only when symbol, direction and option
/// contract all match; a long and a short on the same symbol are separate entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub symbol: String,
    pub direction: Direction,
    pub contract: Option<OptionContract>,
}

impl PositionKey {
    /// Symbols are compared case-insensitively, so they are stored upper-cased.
    pub fn new(symbol: &str, direction: Direction, contract: Option<OptionContract>) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            direction,
            contract,
        }
    }

    pub fn long(symbol: &str) -> Self {
        Self::new(symbol, Direction::Long, None)
    }

    pub fn short(symbol: &str) -> Self {
        Self::new(symbol, Direction::Short, None)
    }

    pub fn option(symbol: &str, direction: Direction, contract: OptionContract) -> Self {
        Self::new(symbol, direction, Some(contract))
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.direction, self.symbol)?;
        if let Some(contract) = &self.contract {
            write!(f, " {}", contract)?;
        }
        Ok(())
    }
}

/// Whether a position still holds anything after a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Open,
    /// Quantity reached zero; the owning portfolio must drop the position.
    Closed,
}

/// A single holding of one symbol in one direction.
///
/// The quantity is positive for as long as the position lives in a portfolio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    id: Uuid,
    key: PositionKey,
    quantity: Decimal,
    borrow_fee: Option<Decimal>,
    opened_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Position {
    /// Opens a position with a positive initial quantity.
    pub fn new(key: PositionKey, quantity: Decimal) -> Result<Self, LedgerError> {
        ensure_positive(quantity)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            key,
            quantity,
            borrow_fee: None,
            opened_at: now,
            updated_at: now,
        })
    }

    /// Attaches the borrow fee looked up when a short is opened.
    pub fn with_borrow_fee(mut self, borrow_fee: Option<Decimal>) -> Self {
        self.borrow_fee = borrow_fee;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &PositionKey {
        &self.key
    }

    pub fn symbol(&self) -> &str {
        &self.key.symbol
    }

    pub fn direction(&self) -> Direction {
        self.key.direction
    }

    pub fn contract(&self) -> Option<&OptionContract> {
        self.key.contract.as_ref()
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// `None` when no fee was known at the time the short was opened.
    pub fn borrow_fee(&self) -> Option<Decimal> {
        self.borrow_fee
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn increase(&mut self, amount: Decimal) -> Result<(), LedgerError> {
        ensure_positive(amount)?;
        self.quantity = self
            .quantity
            .checked_add(amount)
            .ok_or_else(|| LedgerError::QuantityOverflow {
                key: self.key.clone(),
                held: self.quantity,
                added: amount,
            })?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Reduces the quantity, reporting `Closed` when nothing is left.
    pub fn decrease(&mut self, amount: Decimal) -> Result<PositionStatus, LedgerError> {
        ensure_positive(amount)?;
        if amount > self.quantity {
            return Err(LedgerError::InsufficientQuantity {
                key: self.key.clone(),
                requested: amount,
                available: self.quantity,
            });
        }
        self.quantity -= amount;
        self.updated_at = Utc::now();

        if self.quantity.is_zero() {
            Ok(PositionStatus::Closed)
        } else {
            Ok(PositionStatus::Open)
        }
    }

    pub fn to_record(&self) -> PositionRecord {
        PositionRecord {
            id: self.id,
            symbol: self.key.symbol.clone(),
            quantity: self.quantity,
            direction: self.key.direction,
            contract: self.key.contract,
            borrow_fee: self.borrow_fee,
            opened_at: self.opened_at,
            updated_at: self.updated_at,
        }
    }
}

impl TryFrom<PositionRecord> for Position {
    type Error = LedgerError;

    fn try_from(record: PositionRecord) -> Result<Self, Self::Error> {
        if record.symbol.trim().is_empty() {
            return Err(LedgerError::InvalidSnapshot("position with an empty symbol".to_string()));
        }
        if record.quantity <= Decimal::ZERO {
            return Err(LedgerError::InvalidSnapshot(format!(
                "position {} has non-positive quantity {}",
                record.symbol, record.quantity
            )));
        }
        if let Some(contract) = &record.contract {
            if contract.strike <= Decimal::ZERO {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "option on {} has non-positive strike {}",
                    record.symbol, contract.strike
                )));
            }
        }

        Ok(Self {
            id: record.id,
            key: PositionKey::new(&record.symbol, record.direction, record.contract),
            quantity: record.quantity,
            borrow_fee: record.borrow_fee,
            opened_at: record.opened_at,
            updated_at: record.updated_at,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key.symbol, self.quantity)?;
        match (self.key.direction, &self.key.contract) {
            (Direction::Long, None) => Ok(()),
            (Direction::Short, None) => write!(f, " (short)"),
            (Direction::Long, Some(contract)) => write!(f, " ({})", contract),
            (Direction::Short, Some(contract)) => write!(f, " (written {})", contract),
        }
    }
}

pub(crate) fn ensure_positive(quantity: Decimal) -> Result<(), LedgerError> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn construction_requires_positive_quantity() {
        assert!(matches!(
            Position::new(PositionKey::long("ACME"), dec!(0)),
            Err(LedgerError::InvalidQuantity(_))
        ));
        assert!(matches!(
            Position::new(PositionKey::long("ACME"), dec!(-3)),
            Err(LedgerError::InvalidQuantity(_))
        ));
        let position = Position::new(PositionKey::long("acme"), dec!(5)).unwrap();
        assert_eq!(position.symbol(), "ACME");
        assert_eq!(position.quantity(), dec!(5));
        assert_eq!(position.borrow_fee(), None);
    }

    #[test]
    fn increase_rejects_non_positive_amounts() {
        let mut position = Position::new(PositionKey::long("ACME"), dec!(5)).unwrap();
        assert!(matches!(position.increase(dec!(0)), Err(LedgerError::InvalidQuantity(_))));
        position.increase(dec!(2.5)).unwrap();
        assert_eq!(position.quantity(), dec!(7.5));
    }

    #[test]
    fn increase_past_the_decimal_range_is_rejected() {
        let mut position = Position::new(PositionKey::long("ACME"), Decimal::MAX).unwrap();
        let err = position.increase(dec!(1)).unwrap_err();
        assert!(matches!(err, LedgerError::QuantityOverflow { .. }));
        assert_eq!(position.quantity(), Decimal::MAX);
    }

    #[test]
    fn decrease_reports_closure_at_zero() {
        let mut position = Position::new(PositionKey::short("ACME"), dec!(5)).unwrap();
        assert_eq!(position.decrease(dec!(2)).unwrap(), PositionStatus::Open);
        assert_eq!(position.decrease(dec!(3)).unwrap(), PositionStatus::Closed);
        assert!(position.quantity().is_zero());
    }

    #[test]
    fn decrease_beyond_holding_leaves_quantity_untouched() {
        let mut position = Position::new(PositionKey::long("ACME"), dec!(5)).unwrap();
        let err = position.decrease(dec!(6)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientQuantity { requested, available, .. }
                if requested == dec!(6) && available == dec!(5)
        ));
        assert_eq!(position.quantity(), dec!(5));
    }

    #[test]
    fn display_annotates_direction_and_contract() {
        let expiry = NaiveDate::from_ymd_opt(2027, 1, 15).unwrap();
        let contract = OptionContract::put(expiry, dec!(40)).unwrap();

        let long = Position::new(PositionKey::long("ACME"), dec!(10)).unwrap();
        let short = Position::new(PositionKey::short("ACME"), dec!(4)).unwrap();
        let written = Position::new(PositionKey::option("ACME", Direction::Short, contract), dec!(1)).unwrap();

        assert_eq!(long.to_string(), "ACME 10");
        assert_eq!(short.to_string(), "ACME 4 (short)");
        assert_eq!(written.to_string(), "ACME 1 (written 2027-01-15 put @ 40)");
    }

    #[test]
    fn record_conversion_rejects_empty_holdings() {
        let mut record = Position::new(PositionKey::long("ACME"), dec!(1)).unwrap().to_record();
        record.quantity = dec!(0);
        assert!(matches!(Position::try_from(record), Err(LedgerError::InvalidSnapshot(_))));
    }
}
