use crate::position::PositionKey;
use core_types::QuoteSide;
use market_data::error::QuoteError;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    #[error("Price must not be negative, got {0}")]
    InvalidPrice(Decimal),

    #[error("Symbol must not be empty")]
    InvalidSymbol,

    #[error("Cash balance must not be negative, got {0}")]
    NegativeCash(Decimal),

    #[error("Not enough cash available to execute trade. Required: {required}, Available: {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    #[error("Not enough {key} held. Requested: {requested}, Available: {available}")]
    InsufficientQuantity {
        key: PositionKey,
        requested: Decimal,
        available: Decimal,
    },

    #[error("No {0} position is held")]
    NoSuchPosition(PositionKey),

    #[error("Quantity desired ({requested}) is greater than {side} size ({available}) for {symbol}")]
    QuantityExceedsMarketSize {
        symbol: String,
        side: QuoteSide,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Quote unavailable: {0}")]
    QuoteUnavailable(#[from] QuoteError),

    #[error("Trade value overflows the cash balance: {quantity} x {price}")]
    AmountOverflow { quantity: Decimal, price: Decimal },

    #[error("Adding {added} to {key} would overflow its quantity of {held}")]
    QuantityOverflow {
        key: PositionKey,
        held: Decimal,
        added: Decimal,
    },

    #[error("Snapshot cannot be restored: {0}")]
    InvalidSnapshot(String),
}
