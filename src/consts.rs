/// The reference coin that every swap volume is expressed in before fiat
/// conversion.
pub const BASE_CURRENCY: &str = "BTC";

/// The reporting currency for final monetary totals.
pub const FIAT_CURRENCY: &str = "USD";

/// Fractional digits retained when dividing two USD legs into a cross rate.
pub const CROSS_RATE_DIGITS: u32 = 8;

/// Fractional digits retained when splitting fiat volume between the two
/// sides of a swap.
pub const HALF_SPLIT_DIGITS: u32 = 2;

/// Flat fee model used for the revenue estimate (0.25%).
pub const SWAP_FEE_RATE: &str = "0.0025";

/// CoinMarketCap's historical quotes API only reaches back this many days.
pub const CMC_MAX_AGE_DAYS: i64 = 89;

/// API endpoints
pub const COINAPI_ENDPOINT: &str = "https://rest.coinapi.io/v1";
pub const CMC_ENDPOINT: &str = "https://pro-api.coinmarketcap.com/v1";
pub const COINCAP_FRONT_ENDPOINT: &str = "https://coincap.io/front";

/// Rate cache file names, relative to the configured cache directory.
pub const DATE_RATES_FILE: &str = "ratePairs.json";
pub const PAIR_RATES_FILE: &str = "btcRates.json";
