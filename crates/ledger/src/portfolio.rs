use crate::error::LedgerError;
use crate::position::{Position, PositionKey, PositionStatus};
use core_types::{Direction, PositionRecord};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;

/// The holdings of one trader, in the order they were first opened.
///
/// Holds at most one position per `PositionKey`. Positions that reach zero are
/// removed immediately, so every position reachable from here has a positive
/// quantity.
#[derive(Debug, Clone, Default)]
pub struct Portfolio {
    positions: Vec<Position>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the plain (non-option) position for `symbol` facing `direction`.
    pub fn find(&self, symbol: &str, direction: Direction) -> Option<&Position> {
        self.find_key(&PositionKey::new(symbol, direction, None))
    }

    /// Finds the position for an exact key, option contract included.
    pub fn find_key(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.iter().find(|p| p.key() == key)
    }

    /// Adds to the matching position, or opens a new one at the end of the list.
    ///
    /// `borrow_fee` is only recorded when a new position is opened.
    pub fn upsert(
        &mut self,
        key: PositionKey,
        quantity: Decimal,
        borrow_fee: Option<Decimal>,
    ) -> Result<&Position, LedgerError> {
        match self.positions.iter().position(|p| p.key() == &key) {
            Some(index) => {
                let position = &mut self.positions[index];
                position.increase(quantity)?;
                Ok(&*position)
            }
            None => {
                let position = Position::new(key, quantity)?.with_borrow_fee(borrow_fee);
                self.positions.push(position);
                Ok(&self.positions[self.positions.len() - 1])
            }
        }
    }

    /// Checks that adding `quantity` to the position at `key` stays within range.
    pub fn ensure_increasable(&self, key: &PositionKey, quantity: Decimal) -> Result<(), LedgerError> {
        if let Some(position) = self.find_key(key) {
            if position.quantity().checked_add(quantity).is_none() {
                return Err(LedgerError::QuantityOverflow {
                    key: key.clone(),
                    held: position.quantity(),
                    added: quantity,
                });
            }
        }
        Ok(())
    }

    /// Checks that `reduce(key, quantity)` would succeed, without changing anything.
    pub fn ensure_reducible(&self, key: &PositionKey, quantity: Decimal) -> Result<(), LedgerError> {
        let position = self
            .find_key(key)
            .ok_or_else(|| LedgerError::NoSuchPosition(key.clone()))?;
        if quantity > position.quantity() {
            return Err(LedgerError::InsufficientQuantity {
                key: key.clone(),
                requested: quantity,
                available: position.quantity(),
            });
        }
        Ok(())
    }

    /// Takes `quantity` off the matching position, dropping it when it reaches zero.
    pub fn reduce(&mut self, key: &PositionKey, quantity: Decimal) -> Result<PositionStatus, LedgerError> {
        let index = self
            .positions
            .iter()
            .position(|p| p.key() == key)
            .ok_or_else(|| LedgerError::NoSuchPosition(key.clone()))?;

        let status = self.positions[index].decrease(quantity)?;
        if status == PositionStatus::Closed {
            self.positions.remove(index);
        }
        Ok(status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn to_records(&self) -> Vec<PositionRecord> {
        self.positions.iter().map(Position::to_record).collect()
    }

    /// Rebuilds a portfolio from persisted records, keeping their order.
    pub fn from_records(records: Vec<PositionRecord>) -> Result<Self, LedgerError> {
        let mut seen = HashSet::new();
        let mut positions = Vec::with_capacity(records.len());

        for record in records {
            let position = Position::try_from(record)?;
            if !seen.insert(position.key().clone()) {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "duplicate {} position",
                    position.key()
                )));
            }
            positions.push(position);
        }

        Ok(Self { positions })
    }
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for position in &self.positions {
            writeln!(f, "{}", position)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn upsert_merges_same_key_and_separates_directions() {
        let mut portfolio = Portfolio::new();
        portfolio.upsert(PositionKey::long("ACME"), dec!(10), None).unwrap();
        portfolio.upsert(PositionKey::short("ACME"), dec!(3), Some(dec!(0.02))).unwrap();
        portfolio.upsert(PositionKey::long("acme"), dec!(5), None).unwrap();

        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.find("ACME", Direction::Long).unwrap().quantity(), dec!(15));
        let short = portfolio.find("ACME", Direction::Short).unwrap();
        assert_eq!(short.quantity(), dec!(3));
        assert_eq!(short.borrow_fee(), Some(dec!(0.02)));
    }

    #[test]
    fn borrow_fee_is_kept_from_the_opening_trade() {
        let mut portfolio = Portfolio::new();
        portfolio.upsert(PositionKey::short("ACME"), dec!(3), Some(dec!(0.02))).unwrap();
        portfolio.upsert(PositionKey::short("ACME"), dec!(1), Some(dec!(0.09))).unwrap();
        assert_eq!(
            portfolio.find("ACME", Direction::Short).unwrap().borrow_fee(),
            Some(dec!(0.02))
        );
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut portfolio = Portfolio::new();
        for symbol in ["ZED", "ACME", "MID"] {
            portfolio.upsert(PositionKey::long(symbol), dec!(1), None).unwrap();
        }
        portfolio.upsert(PositionKey::long("ACME"), dec!(1), None).unwrap();

        let symbols: Vec<&str> = portfolio.iter().map(|p| p.symbol()).collect();
        assert_eq!(symbols, vec!["ZED", "ACME", "MID"]);
    }

    #[test]
    fn reduce_prunes_at_zero() {
        let mut portfolio = Portfolio::new();
        portfolio.upsert(PositionKey::long("ACME"), dec!(4), None).unwrap();

        assert_eq!(portfolio.reduce(&PositionKey::long("ACME"), dec!(1)).unwrap(), PositionStatus::Open);
        assert_eq!(portfolio.reduce(&PositionKey::long("ACME"), dec!(3)).unwrap(), PositionStatus::Closed);
        assert!(portfolio.is_empty());
        assert!(portfolio.find("ACME", Direction::Long).is_none());
    }

    #[test]
    fn reduce_missing_key_fails() {
        let mut portfolio = Portfolio::new();
        portfolio.upsert(PositionKey::long("ACME"), dec!(4), None).unwrap();
        assert!(matches!(
            portfolio.reduce(&PositionKey::short("ACME"), dec!(1)),
            Err(LedgerError::NoSuchPosition(_))
        ));
    }

    #[test]
    fn ensure_reducible_matches_reduce() {
        let mut portfolio = Portfolio::new();
        portfolio.upsert(PositionKey::long("ACME"), dec!(4), None).unwrap();

        assert!(portfolio.ensure_reducible(&PositionKey::long("ACME"), dec!(4)).is_ok());
        assert!(matches!(
            portfolio.ensure_reducible(&PositionKey::long("ACME"), dec!(5)),
            Err(LedgerError::InsufficientQuantity { .. })
        ));
        assert!(matches!(
            portfolio.ensure_reducible(&PositionKey::long("OTHER"), dec!(1)),
            Err(LedgerError::NoSuchPosition(_))
        ));
    }

    #[test]
    fn from_records_rejects_duplicate_keys() {
        let mut portfolio = Portfolio::new();
        portfolio.upsert(PositionKey::long("ACME"), dec!(4), None).unwrap();
        let mut records = portfolio.to_records();
        records.push(records[0].clone());

        assert!(matches!(
            Portfolio::from_records(records),
            Err(LedgerError::InvalidSnapshot(_))
        ));
    }
}
