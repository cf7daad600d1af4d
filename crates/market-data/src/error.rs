use core_types::QuoteSide;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("The HTTP request for market data failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("No {side} quote is available for {symbol}")]
    Unavailable { symbol: String, side: QuoteSide },

    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("The quote feed returned an error: {0}")]
    Feed(String),

    #[error("Failed to deserialize the quote response: {0}")]
    Deserialization(String),
}
