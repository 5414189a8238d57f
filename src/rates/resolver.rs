use crate::config::Config;
use crate::consts::CROSS_RATE_DIGITS;
use crate::rates::cache::{CacheError, RateCache};
use crate::rates::provider::{
    new_agent, CoinApi, CoinMarketCap, CoincapFront, LiveQuote, LiveQuoteSource, ProviderError,
    QuoteProvider,
};
use crate::util::decimal::{self, DecimalError};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RateError {
    #[error("No provider could price {code} in USD on {date}")]
    Unresolved {
        code: String,
        date: String,
        source: ProviderError,
    },

    #[error("Live quote board fetch failed")]
    LiveBoard(#[source] ProviderError),

    #[error("Rate cache write failed")]
    Cache(#[from] CacheError),

    #[error("Decimal arithmetic error")]
    Decimal(#[from] DecimalError),
}

/// Internal cross-rate outcome. `Unknown` means the live board lacked one of
/// the symbols; it is surfaced as the `"0"` sentinel only at the public
/// boundary, so it cannot be confused with a genuine zero rate internally.
enum Resolution {
    Known(String),
    Unknown,
}

/// Answers "what was the X→Y exchange rate on date D".
///
/// Owns all rate state for one top-level run: the persistent caches, the
/// ordered historical provider chain, and the memoized live quote board.
/// Construct a fresh resolver per run.
pub struct RateResolver {
    cache: RateCache,
    providers: Vec<Box<dyn QuoteProvider>>,
    live: Box<dyn LiveQuoteSource>,
    board: Vec<LiveQuote>,
    board_fetched: bool,
}

impl RateResolver {
    pub fn new(config: &Config) -> Self {
        let agent = new_agent();

        Self {
            cache: RateCache::new(&config.cache_dir),
            providers: vec![
                Box::new(CoinMarketCap::new(
                    agent.clone(),
                    &config.coin_market_cap_api_key,
                )),
                Box::new(CoinApi::new(agent.clone(), &config.coin_api_key)),
            ],
            live: Box::new(CoincapFront::new(agent)),
            board: Vec::new(),
            board_fetched: false,
        }
    }

    /// USD price for `code` on `date` as a decimal string.
    ///
    /// The date-keyed cache is consulted first; a hit never touches the
    /// network. On a miss the provider chain is walked in order, skipping
    /// providers whose lookback window excludes `date`, and the first success
    /// is written through to the cache. Exhausting the chain is an error.
    pub fn usd_rate_cached(&mut self, code: &str, date: &str) -> Result<String, RateError> {
        if let Some(rate) = self.cache.date_rate(date, code) {
            return Ok(rate);
        }

        let now = Utc::now();
        let mut last_err = ProviderError::Exhausted;
        for provider in &self.providers {
            if !provider.supports(date, now) {
                debug!("{} does not cover {date}, skipping", provider.name());
                continue;
            }
            match provider.usd_quote(code, date) {
                Ok(rate) => {
                    self.cache.put_date_rate(date, code, &rate)?;
                    return Ok(rate);
                }
                Err(err) => {
                    warn!("{} has no {code}/USD quote for {date}: {err}", provider.name());
                    last_err = err;
                }
            }
        }

        Err(RateError::Unresolved {
            code: code.to_string(),
            date: date.to_string(),
            source: last_err,
        })
    }

    /// Cross rate between two arbitrary currencies on `date` as a decimal
    /// string, or the `"0"` sentinel when the rate is unknown. Callers must
    /// treat `"0"` as "rate unknown", not as a zero-value exchange rate.
    pub fn cross_rate(&mut self, from: &str, to: &str, date: &str) -> Result<String, RateError> {
        match self.cross_rate_inner(from, to, date)? {
            Resolution::Known(rate) => Ok(rate),
            Resolution::Unknown => {
                warn!("No live quote for {from} or {to}, reporting rate as unknown");
                Ok("0".to_string())
            }
        }
    }

    fn cross_rate_inner(
        &mut self,
        from: &str,
        to: &str,
        date: &str,
    ) -> Result<Resolution, RateError> {
        let pair = format!("{from}_{to}");

        // A previously observed live rate short-circuits historical lookup
        // for this pair entirely.
        if let Some(rate) = self.cache.pair_rate(&pair) {
            return Ok(Resolution::Known(rate));
        }

        match self.historical_cross(from, to, date) {
            Ok(rate) => Ok(Resolution::Known(rate)),
            Err(err) => {
                debug!("Historical {pair} lookup failed for {date} ({err}), trying live quotes");
                self.live_cross(&pair, from, to)
            }
        }
    }

    /// Cross rate via two historical USD legs.
    fn historical_cross(&mut self, from: &str, to: &str, date: &str) -> Result<String, RateError> {
        let from_usd = self.usd_rate_cached(&from.to_uppercase(), date)?;
        let to_usd = self.usd_rate_cached(&to.to_uppercase(), date)?;

        Ok(decimal::div(&from_usd, &to_usd, CROSS_RATE_DIGITS)?)
    }

    /// Last resort: scan the live quote board for both symbols. A computed
    /// rate is cached pair-keyed, never into the date-keyed historical map,
    /// so a live price cannot poison historical data.
    fn live_cross(&mut self, pair: &str, from: &str, to: &str) -> Result<Resolution, RateError> {
        if !self.board_fetched {
            self.board = self.live.front().map_err(RateError::LiveBoard)?;
            self.board_fetched = true;
            debug!("Fetched {} live quotes", self.board.len());
        }

        let mut from_usd = None;
        let mut to_usd = None;
        for quote in &self.board {
            if quote.short.eq_ignore_ascii_case(from) {
                from_usd = Some(quote.price);
            }
            if quote.short.eq_ignore_ascii_case(to) {
                to_usd = Some(quote.price);
            }
            if from_usd.is_some() && to_usd.is_some() {
                break;
            }
        }

        match (from_usd, to_usd) {
            (Some(from_usd), Some(to_usd)) => {
                let rate = decimal::div(
                    &from_usd.to_string(),
                    &to_usd.to_string(),
                    CROSS_RATE_DIGITS,
                )?;
                self.cache.put_pair_rate(pair, &rate)?;

                Ok(Resolution::Known(rate))
            }
            _ => Ok(Resolution::Unknown),
        }
    }
}

#[cfg(test)]
pub(crate) use testing::{FailingLive, PanickingLive, StaticLive, StaticProvider};

#[cfg(test)]
mod testing {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    impl RateResolver {
        /// Test constructor wiring arbitrary providers and live sources.
        pub(crate) fn from_raw(
            cache: RateCache,
            providers: Vec<Box<dyn QuoteProvider>>,
            live: Box<dyn LiveQuoteSource>,
        ) -> Self {
            Self {
                cache,
                providers,
                live,
                board: Vec::new(),
                board_fetched: false,
            }
        }
    }

    /// Mock provider returning a fixed quote (or failure), counting calls.
    pub(crate) struct StaticProvider {
        pub(crate) name: &'static str,
        pub(crate) rate: Option<&'static str>,
        pub(crate) in_window: bool,
        pub(crate) calls: Rc<Cell<usize>>,
    }

    impl StaticProvider {
        pub(crate) fn new(name: &'static str, rate: Option<&'static str>) -> Self {
            Self {
                name,
                rate,
                in_window: true,
                calls: Rc::new(Cell::new(0)),
            }
        }
    }

    impl QuoteProvider for StaticProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports(&self, _date: &str, _now: chrono::DateTime<Utc>) -> bool {
            self.in_window
        }

        fn usd_quote(&self, _code: &str, _date: &str) -> Result<String, ProviderError> {
            self.calls.set(self.calls.get() + 1);

            self.rate
                .map(str::to_string)
                .ok_or(ProviderError::MissingRate(self.name))
        }
    }

    /// Mock live source serving a fixed board, counting fetches.
    pub(crate) struct StaticLive {
        pub(crate) board: Vec<LiveQuote>,
        pub(crate) fetches: Rc<Cell<usize>>,
    }

    impl StaticLive {
        pub(crate) fn new(quotes: &[(&str, &str)]) -> Self {
            let board = quotes
                .iter()
                .map(|(short, price)| LiveQuote {
                    short: short.to_string(),
                    price: price.parse().unwrap(),
                })
                .collect();

            Self {
                board,
                fetches: Rc::new(Cell::new(0)),
            }
        }
    }

    impl LiveQuoteSource for StaticLive {
        fn front(&self) -> Result<Vec<LiveQuote>, ProviderError> {
            self.fetches.set(self.fetches.get() + 1);

            Ok(self.board.clone())
        }
    }

    /// Mock live source whose fetch fails, for error propagation tests.
    pub(crate) struct FailingLive;

    impl LiveQuoteSource for FailingLive {
        fn front(&self) -> Result<Vec<LiveQuote>, ProviderError> {
            Err(ProviderError::MissingRate("live board down"))
        }
    }

    /// Mock live source that must never be reached.
    pub(crate) struct PanickingLive;

    impl LiveQuoteSource for PanickingLive {
        fn front(&self) -> Result<Vec<LiveQuote>, ProviderError> {
            panic!("live quote board must not be fetched");
        }
    }
}
