use crate::error::QuoteError;
use crate::{option_symbol, QuoteSource};
use async_trait::async_trait;
use core_types::{OptionContract, Quote, QuoteSide};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct BookTop {
    bid: (Decimal, Decimal),
    ask: (Decimal, Decimal),
}

/// An in-memory quote table.
///
/// Quotes can be replaced at any time through a shared reference, which lets a
/// test move the market between two orders on the same trader.
#[derive(Debug, Default)]
pub struct StaticQuoteSource {
    books: RwLock<HashMap<String, BookTop>>,
    borrow_fees: RwLock<HashMap<String, Decimal>>,
}

impl StaticQuoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets both sides of the book for `symbol`, as (price, size) pairs.
    pub fn set_quote(&self, symbol: &str, bid: (Decimal, Decimal), ask: (Decimal, Decimal)) {
        let mut books = self.books.write().unwrap_or_else(|e| e.into_inner());
        books.insert(symbol.to_uppercase(), BookTop { bid, ask });
    }

    /// Builder-style variant of `set_quote`.
    pub fn with_quote(self, symbol: &str, bid: (Decimal, Decimal), ask: (Decimal, Decimal)) -> Self {
        self.set_quote(symbol, bid, ask);
        self
    }

    /// Sets the premium book for one option contract on `symbol`.
    pub fn set_option_quote(
        &self,
        symbol: &str,
        contract: &OptionContract,
        bid: (Decimal, Decimal),
        ask: (Decimal, Decimal),
    ) {
        self.set_quote(&option_symbol(symbol, contract), bid, ask);
    }

    pub fn set_borrow_fee(&self, symbol: &str, fee: Decimal) {
        let mut fees = self.borrow_fees.write().unwrap_or_else(|e| e.into_inner());
        fees.insert(symbol.to_uppercase(), fee);
    }

    /// Drops `symbol` from the table, so later quotes for it fail.
    pub fn remove(&self, symbol: &str) {
        let mut books = self.books.write().unwrap_or_else(|e| e.into_inner());
        books.remove(&symbol.to_uppercase());
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn quote(&self, symbol: &str, side: QuoteSide) -> Result<Quote, QuoteError> {
        let top = {
            let books = self.books.read().unwrap_or_else(|e| e.into_inner());
            books
                .get(&symbol.to_uppercase())
                .copied()
                .ok_or_else(|| QuoteError::UnknownSymbol(symbol.to_string()))?
        };

        let (price, size) = match side {
            QuoteSide::Bid => top.bid,
            QuoteSide::Ask => top.ask,
        };
        if price <= Decimal::ZERO {
            return Err(QuoteError::Unavailable {
                symbol: symbol.to_string(),
                side,
            });
        }

        Ok(Quote {
            symbol: symbol.to_string(),
            side,
            price,
            size,
        })
    }

    async fn borrow_fee(&self, symbol: &str) -> Result<Option<Decimal>, QuoteError> {
        let fees = self.borrow_fees.read().unwrap_or_else(|e| e.into_inner());
        Ok(fees.get(&symbol.to_uppercase()).copied())
    }

    async fn option_quote(
        &self,
        symbol: &str,
        contract: &OptionContract,
        side: QuoteSide,
    ) -> Result<Quote, QuoteError> {
        self.quote(&option_symbol(symbol, contract), side).await
    }
}
