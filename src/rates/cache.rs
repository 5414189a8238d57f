use crate::consts::{DATE_RATES_FILE, PAIR_RATES_FILE};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;
use tracing::{debug, warn};

/// `date (YYYY-MM-DD) → currency code → rate string`, altcoin priced in USD.
pub type DateRates = BTreeMap<String, BTreeMap<String, String>>;

/// `"{FROM}_{TO}" → rate string`, the most recent live rate seen for a pair.
pub type PairRates = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error")]
    Io(#[from] io::Error),

    #[error("JSON serialization error")]
    Json(#[from] serde_json::Error),
}

/// Persistent exchange-rate cache, scoped to one top-level run.
///
/// Constructing a fresh `RateCache` is the "clear caches" contract for a new
/// run; the in-memory maps never outlive it, while the backing files do. Each
/// map hydrates from its file at most once per run, and every insert is
/// written through to disk before returning.
#[derive(Debug)]
pub struct RateCache {
    dir: PathBuf,
    date_rates: DateRates,
    date_loaded: bool,
    pair_rates: PairRates,
    pair_loaded: bool,
}

impl RateCache {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            date_rates: DateRates::new(),
            date_loaded: false,
            pair_rates: PairRates::new(),
            pair_loaded: false,
        }
    }

    /// Cached USD rate for `code` on `date`, if any.
    pub fn date_rate(&mut self, date: &str, code: &str) -> Option<String> {
        self.ensure_date_loaded();

        self.date_rates
            .get(date)
            .and_then(|by_code| by_code.get(code))
            .cloned()
    }

    /// Write-through insert into the date-keyed map.
    ///
    /// An existing `(date, code)` entry is ground truth and is never
    /// overwritten.
    pub fn put_date_rate(&mut self, date: &str, code: &str, rate: &str) -> Result<(), CacheError> {
        self.ensure_date_loaded();

        let by_code = self.date_rates.entry(date.to_string()).or_default();
        if by_code.contains_key(code) {
            return Ok(());
        }
        by_code.insert(code.to_string(), rate.to_string());

        self.flush(DATE_RATES_FILE, &self.date_rates)
    }

    /// Cached live rate for a `"{FROM}_{TO}"` pair, if any.
    pub fn pair_rate(&mut self, pair: &str) -> Option<String> {
        self.ensure_pair_loaded();

        self.pair_rates.get(pair).cloned()
    }

    /// Write-through insert into the pair-keyed map. Pair rates are "most
    /// recent live rate seen", so later observations replace earlier ones.
    pub fn put_pair_rate(&mut self, pair: &str, rate: &str) -> Result<(), CacheError> {
        self.ensure_pair_loaded();

        self.pair_rates.insert(pair.to_string(), rate.to_string());

        self.flush(PAIR_RATES_FILE, &self.pair_rates)
    }

    fn ensure_date_loaded(&mut self) {
        if !self.date_loaded {
            self.date_loaded = true;
            self.date_rates = read_map(&self.dir.join(DATE_RATES_FILE));
        }
    }

    fn ensure_pair_loaded(&mut self) {
        if !self.pair_loaded {
            self.pair_loaded = true;
            self.pair_rates = read_map(&self.dir.join(PAIR_RATES_FILE));
        }
    }

    fn flush<T: Serialize>(&self, file: &str, map: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(file), serde_json::to_vec(map)?)?;

        Ok(())
    }
}

/// A missing or corrupt cache file never fails the run; it starts empty.
fn read_map<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(map) => map,
            Err(err) => {
                warn!("Corrupt rate cache {path:?}, starting empty: {err}");
                T::default()
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!("No rate cache at {path:?}, starting empty");
            T::default()
        }
        Err(err) => {
            warn!("Unable to read rate cache {path:?}, starting empty: {err}");
            T::default()
        }
    }
}
