use crate::consts::{CMC_ENDPOINT, CMC_MAX_AGE_DAYS, COINAPI_ENDPOINT, COINCAP_FRONT_ENDPOINT};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::trace;
use ureq::tls::{TlsConfig, TlsProvider};
use ureq::Agent;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error")]
    Http(#[from] Box<ureq::Error>),

    #[error("No usable rate from {0}")]
    MissingRate(&'static str),

    #[error("Provider chain exhausted")]
    Exhausted,
}

impl From<ureq::Error> for ProviderError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

/// A strategy for pricing one currency in USD on a given date.
///
/// Exists as a trait so the resolver can walk an ordered fallback chain, and
/// so unit tests can mock quotes without a network.
pub trait QuoteProvider {
    fn name(&self) -> &'static str;

    /// Whether this provider can answer for `date` at all. Lookback-limited
    /// APIs reject out-of-window dates here, before any request is made.
    fn supports(&self, date: &str, now: DateTime<Utc>) -> bool {
        let _ = (date, now);
        true
    }

    /// USD price of `code` on `date` as a decimal string.
    fn usd_quote(&self, code: &str, date: &str) -> Result<String, ProviderError>;
}

/// A source for the live front-page quote board, the last-resort rate source.
pub trait LiveQuoteSource {
    /// Fetch the full quote board. The resolver calls this at most once per
    /// run and memoizes the result.
    fn front(&self) -> Result<Vec<LiveQuote>, ProviderError>;
}

/// One row of the live quote board. Not date-aware; this is the price right
/// now.
#[derive(Clone, Debug, Deserialize)]
pub struct LiveQuote {
    #[serde(default)]
    pub short: String,
    #[serde(default)]
    pub price: Decimal,
}

pub(crate) fn new_agent() -> Agent {
    Agent::from(
        Agent::config_builder()
            .tls_config(
                TlsConfig::builder()
                    .provider(TlsProvider::NativeTls)
                    .build(),
            )
            .build(),
    )
}

/// CoinAPI historical quotes. No lookback restriction.
pub struct CoinApi {
    agent: Agent,
    api_key: String,
}

impl CoinApi {
    pub fn new(agent: Agent, api_key: impl Into<String>) -> Self {
        Self {
            agent,
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoinApiQuote {
    rate: Option<Decimal>,
}

impl QuoteProvider for CoinApi {
    fn name(&self) -> &'static str {
        "CoinAPI"
    }

    fn usd_quote(&self, code: &str, date: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{COINAPI_ENDPOINT}/exchangerate/{code}/USD?time={date}T00:00:00.0000000Z&apiKey={key}",
            key = self.api_key,
        );
        let mut resp = self.agent.get(&url).call()?;
        let quote: CoinApiQuote = resp.body_mut().read_json()?;
        trace!("CoinAPI {code}/USD @ {date}: {quote:?}");

        quote
            .rate
            .map(|rate| rate.normalize().to_string())
            .ok_or(ProviderError::MissingRate(self.name()))
    }
}

/// CoinMarketCap historical quotes, restricted to recent dates.
pub struct CoinMarketCap {
    agent: Agent,
    api_key: String,
}

impl CoinMarketCap {
    pub fn new(agent: Agent, api_key: impl Into<String>) -> Self {
        Self {
            agent,
            api_key: api_key.into(),
        }
    }
}

impl QuoteProvider for CoinMarketCap {
    fn name(&self) -> &'static str {
        "CoinMarketCap"
    }

    /// The historical quotes API only reaches back [`CMC_MAX_AGE_DAYS`] days.
    fn supports(&self, date: &str, now: DateTime<Utc>) -> bool {
        match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(date) => {
                let midnight = NaiveDateTime::new(date, NaiveTime::default()).and_utc();
                now.signed_duration_since(midnight) < Duration::days(CMC_MAX_AGE_DAYS)
            }
            Err(_) => false,
        }
    }

    fn usd_quote(&self, code: &str, date: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{CMC_ENDPOINT}/cryptocurrency/quotes/historical?symbol={code}&time_end={date}&count=1"
        );
        let mut resp = self
            .agent
            .get(&url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .call()?;
        let json: serde_json::Value = resp.body_mut().read_json()?;
        trace!("CoinMarketCap {code}/USD @ {date}: {json}");

        json.pointer("/data/quotes/0/quote/USD/price")
            .and_then(|price| serde_json::from_value::<Decimal>(price.clone()).ok())
            .map(|price| price.normalize().to_string())
            .ok_or(ProviderError::MissingRate(self.name()))
    }
}

/// Coincap's front-page snapshot of every listed coin.
pub struct CoincapFront {
    agent: Agent,
}

impl CoincapFront {
    pub fn new(agent: Agent) -> Self {
        Self { agent }
    }
}

impl LiveQuoteSource for CoincapFront {
    fn front(&self) -> Result<Vec<LiveQuote>, ProviderError> {
        let mut resp = self.agent.get(COINCAP_FRONT_ENDPOINT).call()?;

        Ok(resp.body_mut().read_json()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2020-05-01 00:00:00+0000".parse().unwrap()
    }

    #[test]
    fn test_cmc_window() {
        let cmc = CoinMarketCap::new(new_agent(), "key");

        // 88 days back is inside the window, 89 is the hard boundary.
        assert!(cmc.supports("2020-04-30", now()));
        assert!(cmc.supports("2020-02-03", now()));
        assert!(!cmc.supports("2020-02-02", now()));
        assert!(!cmc.supports("2017-08-09", now()));
    }

    #[test]
    fn test_cmc_rejects_unparseable_dates() {
        let cmc = CoinMarketCap::new(new_agent(), "key");

        assert!(!cmc.supports("yesterday", now()));
    }

    #[test]
    fn test_live_quote_board_parsing() {
        let board: Vec<LiveQuote> = serde_json::from_str(
            r#"[
                { "short": "BTC", "long": "Bitcoin", "price": 8846.78, "cap24hrChange": -1.2 },
                { "short": "ETH", "long": "Ethereum", "price": 206.34 },
                { "long": "Mystery Coin" }
            ]"#,
        )
        .unwrap();

        assert_eq!(board.len(), 3);
        assert_eq!(board[0].short, "BTC");
        assert_eq!(board[1].price.to_string(), "206.34");
        assert_eq!(board[2].short, "");
    }
}
