use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{fs, io};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read config file {0:?}")]
    Io(PathBuf, #[source] io::Error),

    #[error("Unable to parse config file {0:?}")]
    Parse(PathBuf, #[source] serde_json::Error),
}

/// Process configuration: provider API keys and the rate-cache location.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub coin_api_key: String,

    // Long-standing key casing in deployed config files.
    #[serde(alias = "coinMarketCapAPiKey")]
    pub coin_market_cap_api_key: String,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./cache")
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        serde_json::from_str(&data).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "coinApiKey": "ca-key", "coinMarketCapApiKey": "cmc-key" }"#,
        )
        .unwrap();

        assert_eq!(config.coin_api_key, "ca-key");
        assert_eq!(config.coin_market_cap_api_key, "cmc-key");
        assert_eq!(config.cache_dir, PathBuf::from("./cache"));
    }

    #[test]
    fn test_parse_legacy_cmc_key_casing() {
        let config: Config = serde_json::from_str(
            r#"{ "coinApiKey": "ca-key", "coinMarketCapAPiKey": "cmc-key", "cacheDir": "/tmp/x" }"#,
        )
        .unwrap();

        assert_eq!(config.coin_market_cap_api_key, "cmc-key");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/x"));
    }
}
