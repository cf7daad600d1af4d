//! # Tradebook Market Data Crate
//!
//! The ledger never fetches prices itself. It asks a `QuoteSource` for the top of
//! book on one side and trades against whatever comes back, so the live HTTP feed
//! and the in-memory table used by demos and tests are interchangeable.
//!
//! ## Public API
//!
//! - `QuoteSource`: the async contract every quote provider implements.
//! - `option_symbol`: the OCC-style ticker under which an option contract is quoted.
//! - `YahooQuoteClient`: quotes from a Yahoo-Finance-compatible JSON endpoint.
//! - `StaticQuoteSource`: a mutable in-memory quote table.
//! - `QuoteError`: the specific error types that can be returned from this crate.

use crate::error::QuoteError;
use crate::responses::QuoteEnvelope;
use async_trait::async_trait;
use configuration::MarketDataSettings;
use core_types::{OptionContract, OptionKind, Quote, QuoteSide};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::time::Duration;

pub mod error;
pub mod responses;
pub mod static_source;

// --- Public API ---
pub use static_source::StaticQuoteSource;

/// The generic, abstract interface for a source of market quotes.
/// The ledger depends only on this trait, allowing the underlying
/// implementation (live or static) to be swapped out.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches the best price and the size available at that price on one side of the book.
    async fn quote(&self, symbol: &str, side: QuoteSide) -> Result<Quote, QuoteError>;

    /// Looks up the annual fee for borrowing shares of `symbol`.
    ///
    /// `Ok(None)` means the provider has no figure for it.
    async fn borrow_fee(&self, _symbol: &str) -> Result<Option<Decimal>, QuoteError> {
        Ok(None)
    }

    /// Fetches the premium quote for one option contract on `symbol`.
    ///
    /// Providers without an options feed keep this default, which reports the
    /// contract as unavailable.
    async fn option_quote(
        &self,
        symbol: &str,
        contract: &OptionContract,
        side: QuoteSide,
    ) -> Result<Quote, QuoteError> {
        Err(QuoteError::Unavailable {
            symbol: option_symbol(symbol, contract),
            side,
        })
    }
}

/// Builds the OCC ticker for a contract: root, `YYMMDD`, `C`/`P`, and the
/// strike in thousandths padded to eight digits (`ACME270115P00040000`).
pub fn option_symbol(symbol: &str, contract: &OptionContract) -> String {
    let kind = match contract.kind {
        OptionKind::Call => 'C',
        OptionKind::Put => 'P',
    };
    let strike = (contract.strike * Decimal::from(1000)).trunc().normalize();
    format!(
        "{}{}{}{:0>8}",
        symbol.trim().to_uppercase(),
        contract.expiration.format("%y%m%d"),
        kind,
        strike.to_string()
    )
}

/// A concrete implementation of `QuoteSource` backed by the Yahoo Finance quote API.
#[derive(Clone)]
pub struct YahooQuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooQuoteClient {
    pub fn new(settings: &MarketDataSettings) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteClient {
    async fn quote(&self, symbol: &str, side: QuoteSide) -> Result<Quote, QuoteError> {
        let url = format!("{}/v7/finance/quote", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", symbol)])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(QuoteError::Feed(format!("HTTP {}: {}", status, text)));
        }

        let envelope: QuoteEnvelope =
            serde_json::from_str(&text).map_err(|e| QuoteError::Deserialization(e.to_string()))?;
        let quote = top_of_book(envelope, symbol, side)?;

        tracing::debug!(symbol, %side, price = %quote.price, size = %quote.size, "Quote received.");
        Ok(quote)
    }

    /// Option contracts are quoted by the same endpoint under their OCC ticker.
    async fn option_quote(
        &self,
        symbol: &str,
        contract: &OptionContract,
        side: QuoteSide,
    ) -> Result<Quote, QuoteError> {
        self.quote(&option_symbol(symbol, contract), side).await
    }
}

/// Extracts one side of the book for `symbol` from a quote response.
///
/// A missing or non-positive price is reported as `Unavailable`; a missing size
/// is read as zero so that no market order can be filled against it.
fn top_of_book(envelope: QuoteEnvelope, symbol: &str, side: QuoteSide) -> Result<Quote, QuoteError> {
    let response = envelope.quote_response;
    if let Some(error) = response.error {
        return Err(QuoteError::Feed(format!("{}: {}", error.code, error.description)));
    }

    let result = response
        .result
        .into_iter()
        .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
        .ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))?;

    let (price, size) = match side {
        QuoteSide::Bid => (result.bid, result.bid_size),
        QuoteSide::Ask => (result.ask, result.ask_size),
    };

    let unavailable = || QuoteError::Unavailable {
        symbol: symbol.to_string(),
        side,
    };
    let price = price
        .and_then(Decimal::from_f64)
        .map(|p| p.round_dp(4).normalize())
        .filter(|p| *p > Decimal::ZERO)
        .ok_or_else(unavailable)?;

    Ok(Quote {
        symbol: result.symbol,
        side,
        price,
        size: Decimal::from(size.unwrap_or(0)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn envelope(json: &str) -> QuoteEnvelope {
        serde_json::from_str(json).unwrap()
    }

    const ACME: &str = r#"{"quoteResponse":{"result":[
        {"symbol":"ACME","bid":54.99,"bidSize":12,"ask":55.01,"askSize":8}
    ],"error":null}}"#;

    #[test]
    fn reads_each_side_of_the_book() {
        let bid = top_of_book(envelope(ACME), "ACME", QuoteSide::Bid).unwrap();
        assert_eq!(bid.price, dec!(54.99));
        assert_eq!(bid.size, dec!(12));

        let ask = top_of_book(envelope(ACME), "acme", QuoteSide::Ask).unwrap();
        assert_eq!(ask.price, dec!(55.01));
        assert_eq!(ask.size, dec!(8));
    }

    #[test]
    fn zero_price_is_unavailable() {
        let json = r#"{"quoteResponse":{"result":[{"symbol":"ACME","bid":0.0,"bidSize":0}]}}"#;
        let err = top_of_book(envelope(json), "ACME", QuoteSide::Bid).unwrap_err();
        assert!(matches!(err, QuoteError::Unavailable { side: QuoteSide::Bid, .. }));
    }

    #[test]
    fn missing_side_is_unavailable() {
        let json = r#"{"quoteResponse":{"result":[{"symbol":"ACME","bid":10.5,"bidSize":3}]}}"#;
        let err = top_of_book(envelope(json), "ACME", QuoteSide::Ask).unwrap_err();
        assert!(matches!(err, QuoteError::Unavailable { side: QuoteSide::Ask, .. }));
    }

    #[test]
    fn absent_symbol_is_unknown() {
        let err = top_of_book(envelope(ACME), "NOPE", QuoteSide::Bid).unwrap_err();
        assert!(matches!(err, QuoteError::UnknownSymbol(s) if s == "NOPE"));
    }

    #[test]
    fn option_symbols_follow_the_occ_layout() {
        let expiry = chrono::NaiveDate::from_ymd_opt(2027, 1, 15).unwrap();
        let put = OptionContract::put(expiry, dec!(40)).unwrap();
        assert_eq!(option_symbol("acme", &put), "ACME270115P00040000");

        let call = OptionContract::call(expiry, dec!(152.5)).unwrap();
        assert_eq!(option_symbol("ACME", &call), "ACME270115C00152500");
    }

    #[test]
    fn feed_error_is_surfaced() {
        let json = r#"{"quoteResponse":{"result":[],"error":{"code":"Bad Request","description":"Missing symbols"}}}"#;
        let err = top_of_book(envelope(json), "ACME", QuoteSide::Bid).unwrap_err();
        assert!(matches!(err, QuoteError::Feed(_)));
    }
}
