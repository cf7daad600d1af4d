use crate::error::LedgerError;
use crate::portfolio::Portfolio;
use crate::position::{ensure_positive, PositionKey};
use chrono::Utc;
use core_types::{Direction, OptionContract, Quote, QuoteSide, TraderSnapshot};
use market_data::QuoteSource;
use rust_decimal::Decimal;

/// Which way cash moves when a trade settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CashFlow {
    Debit,
    Credit,
}

/// The receipt for a settled trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    pub key: PositionKey,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Signed change to the cash balance: negative for purchases.
    pub cash_delta: Decimal,
    pub cash_after: Decimal,
    /// Quantity left in the affected position; zero once it has been closed.
    pub remaining: Decimal,
}

/// The outcome of a short cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cover {
    pub symbol: String,
    pub quantity: Decimal,
    pub short_remaining: Decimal,
    /// Long shares delivered against the short, when a long position was held.
    pub long_delivered: Option<Decimal>,
}

/// A trading account: a cash balance and the portfolio it pays for.
///
/// Every operation checks all of its preconditions before touching cash or
/// positions, so a returned error always leaves the trader exactly as it was.
/// The trader does no locking of its own; callers sharing one across tasks must
/// serialize access to it.
#[derive(Debug, Clone)]
pub struct Trader {
    name: String,
    cash: Decimal,
    portfolio: Portfolio,
}

impl Trader {
    /// Opens an account with `cash` and no positions.
    pub fn new(name: impl Into<String>, cash: Decimal) -> Result<Self, LedgerError> {
        if cash < Decimal::ZERO {
            return Err(LedgerError::NegativeCash(cash));
        }
        Ok(Self {
            name: name.into(),
            cash,
            portfolio: Portfolio::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// Buys `quantity` shares of `symbol` at `price`.
    ///
    /// An existing short on the same symbol is left alone; the purchase always
    /// opens or adds to a separate long position.
    pub fn buy(&mut self, symbol: &str, quantity: Decimal, price: Decimal) -> Result<Fill, LedgerError> {
        self.open(key_for(symbol, Direction::Long, None)?, quantity, price, CashFlow::Debit, None)
    }

    /// Sells `quantity` shares of a held long position at `price`.
    pub fn sell(&mut self, symbol: &str, quantity: Decimal, price: Decimal) -> Result<Fill, LedgerError> {
        self.close(key_for(symbol, Direction::Long, None)?, quantity, price, CashFlow::Credit)
    }

    /// Buys at the current ask, provided the ask size covers `quantity`.
    pub async fn market_buy(
        &mut self,
        quotes: &dyn QuoteSource,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<Fill, LedgerError> {
        key_for(symbol, Direction::Long, None)?;
        ensure_positive(quantity)?;
        let price = market_price(quotes, symbol, QuoteSide::Ask, quantity).await?;
        self.buy(symbol, quantity, price)
    }

    /// Sells at the current bid, provided the bid size covers `quantity`.
    pub async fn market_sell(
        &mut self,
        quotes: &dyn QuoteSource,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Long, None)?;
        ensure_positive(quantity)?;
        self.portfolio.ensure_reducible(&key, quantity)?;
        let price = market_price(quotes, symbol, QuoteSide::Bid, quantity).await?;
        self.sell(symbol, quantity, price)
    }

    /// Sells borrowed shares at the current bid and records the short.
    ///
    /// The borrow fee is looked up for newly opened shorts; a failed lookup is
    /// logged and recorded as unknown rather than failing the trade.
    pub async fn short_sell(
        &mut self,
        quotes: &dyn QuoteSource,
        symbol: &str,
        quantity: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Short, None)?;
        ensure_positive(quantity)?;

        let bid = quotes.quote(&key.symbol, QuoteSide::Bid).await?;
        let borrow_fee = if self.portfolio.find_key(&key).is_some() {
            None
        } else {
            match quotes.borrow_fee(&key.symbol).await {
                Ok(fee) => fee,
                Err(e) => {
                    tracing::warn!(trader = %self.name, symbol = %key.symbol, error = %e, "Borrow fee lookup failed; recording it as unknown.");
                    None
                }
            }
        };

        self.open(key, quantity, bid.price, CashFlow::Credit, borrow_fee)
    }

    /// Closes `quantity` of the short on `symbol`.
    ///
    /// When a long position on the same symbol is held, the cover is delivered
    /// out of it: the long must hold at least `quantity` and is reduced alongside
    /// the short. Without a long position only the short is reduced. No cash
    /// changes hands here.
    pub fn short_cover(&mut self, symbol: &str, quantity: Decimal) -> Result<Cover, LedgerError> {
        let short_key = key_for(symbol, Direction::Short, None)?;
        let long_key = PositionKey::long(symbol);
        ensure_positive(quantity)?;

        self.portfolio.ensure_reducible(&short_key, quantity)?;
        let long_held = self.portfolio.find_key(&long_key).map(|p| p.quantity());
        if let Some(available) = long_held {
            if available < quantity {
                return Err(LedgerError::InsufficientQuantity {
                    key: long_key,
                    requested: quantity,
                    available,
                });
            }
        }

        self.portfolio.reduce(&short_key, quantity)?;
        if long_held.is_some() {
            self.portfolio.reduce(&long_key, quantity)?;
        }

        let short_remaining = self.held(&short_key);
        tracing::info!(
            trader = %self.name,
            symbol = %short_key.symbol,
            quantity = %quantity,
            short_remaining = %short_remaining,
            long_delivered = long_held.is_some(),
            "Short covered."
        );

        Ok(Cover {
            symbol: short_key.symbol,
            quantity,
            short_remaining,
            long_delivered: long_held.map(|_| quantity),
        })
    }

    /// Buys option contracts, paying `premium` per contract.
    pub fn buy_option(
        &mut self,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Long, Some(contract))?;
        self.open(key, quantity, premium, CashFlow::Debit, None)
    }

    /// Sells option contracts previously bought.
    pub fn sell_option(
        &mut self,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Long, Some(contract))?;
        self.close(key, quantity, premium, CashFlow::Credit)
    }

    /// Writes (sells to open) option contracts, collecting `premium` per contract.
    pub fn write_option(
        &mut self,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Short, Some(contract))?;
        self.open(key, quantity, premium, CashFlow::Credit, None)
    }

    /// Buys back written option contracts.
    pub fn close_written_option(
        &mut self,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
        premium: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Short, Some(contract))?;
        self.close(key, quantity, premium, CashFlow::Debit)
    }

    /// Buys option contracts at the current ask premium.
    pub async fn market_buy_option(
        &mut self,
        quotes: &dyn QuoteSource,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Long, Some(contract))?;
        ensure_positive(quantity)?;
        let premium = option_market_price(quotes, &key.symbol, &contract, QuoteSide::Ask, quantity).await?;
        self.buy_option(symbol, contract, quantity, premium)
    }

    /// Sells held option contracts at the current bid premium.
    pub async fn market_sell_option(
        &mut self,
        quotes: &dyn QuoteSource,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Long, Some(contract))?;
        ensure_positive(quantity)?;
        self.portfolio.ensure_reducible(&key, quantity)?;
        let premium = option_market_price(quotes, &key.symbol, &contract, QuoteSide::Bid, quantity).await?;
        self.sell_option(symbol, contract, quantity, premium)
    }

    /// Writes option contracts at the current bid premium.
    pub async fn market_write_option(
        &mut self,
        quotes: &dyn QuoteSource,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Short, Some(contract))?;
        ensure_positive(quantity)?;
        let premium = option_market_price(quotes, &key.symbol, &contract, QuoteSide::Bid, quantity).await?;
        self.write_option(symbol, contract, quantity, premium)
    }

    /// Buys back written contracts at the current ask premium.
    pub async fn market_close_written_option(
        &mut self,
        quotes: &dyn QuoteSource,
        symbol: &str,
        contract: OptionContract,
        quantity: Decimal,
    ) -> Result<Fill, LedgerError> {
        let key = key_for(symbol, Direction::Short, Some(contract))?;
        ensure_positive(quantity)?;
        self.portfolio.ensure_reducible(&key, quantity)?;
        let premium = option_market_price(quotes, &key.symbol, &contract, QuoteSide::Ask, quantity).await?;
        self.close_written_option(symbol, contract, quantity, premium)
    }

    /// Captures the full account state for persistence.
    pub fn snapshot(&self) -> TraderSnapshot {
        TraderSnapshot {
            name: self.name.clone(),
            cash: self.cash,
            positions: self.portfolio.to_records(),
            saved_at: Utc::now(),
        }
    }

    /// Restores an account, rejecting snapshots that break ledger invariants.
    pub fn from_snapshot(snapshot: TraderSnapshot) -> Result<Self, LedgerError> {
        if snapshot.name.trim().is_empty() {
            return Err(LedgerError::InvalidSnapshot("trader name is empty".to_string()));
        }
        if snapshot.cash < Decimal::ZERO {
            return Err(LedgerError::InvalidSnapshot(format!(
                "cash balance {} is negative",
                snapshot.cash
            )));
        }

        Ok(Self {
            name: snapshot.name,
            cash: snapshot.cash,
            portfolio: Portfolio::from_records(snapshot.positions)?,
        })
    }

    /// Opens or adds to the position at `key`.
    fn open(
        &mut self,
        key: PositionKey,
        quantity: Decimal,
        price: Decimal,
        flow: CashFlow,
        borrow_fee: Option<Decimal>,
    ) -> Result<Fill, LedgerError> {
        let cash_after = self.settle(quantity, price, flow)?;
        self.portfolio.ensure_increasable(&key, quantity)?;

        let remaining = self.portfolio.upsert(key.clone(), quantity, borrow_fee)?.quantity();
        Ok(self.commit(key, quantity, price, cash_after, remaining))
    }

    /// Takes `quantity` off the position at `key`.
    fn close(
        &mut self,
        key: PositionKey,
        quantity: Decimal,
        price: Decimal,
        flow: CashFlow,
    ) -> Result<Fill, LedgerError> {
        ensure_positive(quantity)?;
        self.portfolio.ensure_reducible(&key, quantity)?;
        let cash_after = self.settle(quantity, price, flow)?;

        self.portfolio.reduce(&key, quantity)?;
        let remaining = self.held(&key);
        Ok(self.commit(key, quantity, price, cash_after, remaining))
    }

    /// Validates a trade's cash leg and returns the balance it would leave.
    fn settle(&self, quantity: Decimal, price: Decimal, flow: CashFlow) -> Result<Decimal, LedgerError> {
        ensure_positive(quantity)?;
        if price < Decimal::ZERO {
            return Err(LedgerError::InvalidPrice(price));
        }

        let overflow = || LedgerError::AmountOverflow { quantity, price };
        let amount = quantity.checked_mul(price).ok_or_else(overflow)?;

        match flow {
            CashFlow::Debit => {
                if self.cash < amount {
                    return Err(LedgerError::InsufficientFunds {
                        required: amount,
                        available: self.cash,
                    });
                }
                Ok(self.cash - amount)
            }
            CashFlow::Credit => self.cash.checked_add(amount).ok_or_else(overflow),
        }
    }

    fn commit(
        &mut self,
        key: PositionKey,
        quantity: Decimal,
        price: Decimal,
        cash_after: Decimal,
        remaining: Decimal,
    ) -> Fill {
        let cash_delta = cash_after - self.cash;
        self.cash = cash_after;

        tracing::info!(
            trader = %self.name,
            position = %key,
            quantity = %quantity,
            price = %price,
            cash_delta = %cash_delta,
            cash = %cash_after,
            "Trade executed."
        );

        Fill {
            key,
            quantity,
            price,
            cash_delta,
            cash_after,
            remaining,
        }
    }

    fn held(&self, key: &PositionKey) -> Decimal {
        self.portfolio
            .find_key(key)
            .map(|p| p.quantity())
            .unwrap_or(Decimal::ZERO)
    }
}

fn key_for(
    symbol: &str,
    direction: Direction,
    contract: Option<OptionContract>,
) -> Result<PositionKey, LedgerError> {
    if symbol.trim().is_empty() {
        return Err(LedgerError::InvalidSymbol);
    }
    if let Some(contract) = &contract {
        if contract.strike <= Decimal::ZERO {
            return Err(LedgerError::InvalidPrice(contract.strike));
        }
    }
    Ok(PositionKey::new(symbol, direction, contract))
}

/// Fetches the price a market order of `quantity` would fill at.
async fn market_price(
    quotes: &dyn QuoteSource,
    symbol: &str,
    side: QuoteSide,
    quantity: Decimal,
) -> Result<Decimal, LedgerError> {
    let quote = quotes.quote(symbol, side).await?;
    fill_price(quote, quantity)
}

/// Same as `market_price`, against the premium book of one option contract.
async fn option_market_price(
    quotes: &dyn QuoteSource,
    symbol: &str,
    contract: &OptionContract,
    side: QuoteSide,
    quantity: Decimal,
) -> Result<Decimal, LedgerError> {
    let quote = quotes.option_quote(symbol, contract, side).await?;
    fill_price(quote, quantity)
}

fn fill_price(quote: Quote, quantity: Decimal) -> Result<Decimal, LedgerError> {
    tracing::debug!(symbol = %quote.symbol, side = %quote.side, price = %quote.price, size = %quote.size, "Market quote.");

    if quantity > quote.size {
        return Err(LedgerError::QuantityExceedsMarketSize {
            symbol: quote.symbol,
            side: quote.side,
            requested: quantity,
            available: quote.size,
        });
    }
    Ok(quote.price)
}
