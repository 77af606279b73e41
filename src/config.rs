//! Scraper configuration.
//!
//! All values are optional and read from environment variables prefixed with
//! the upper-cased exchange name, e.g. `AYIN_REFRESH_DELAY` for the Ayin
//! exchange.

use std::time::Duration;

use url::Url;

const DEFAULT_REFRESH_DELAY_MS: u64 = 400;
const DEFAULT_SLEEP_TIMEOUT_MS: u64 = 1000;
const DEFAULT_EVENTS_LIMIT: usize = 10;
const DEFAULT_SWAP_CONTRACTS_LIMIT: usize = 100;
const DEFAULT_TRADE_CHANNEL_CAPACITY: usize = 1;
const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;

const DEFAULT_NODE_URL: &str = "https://node.mainnet.alephium.org";
const DEFAULT_EXPLORER_URL: &str = "https://backend.mainnet.alephium.org";
const DEFAULT_FACTORY_ADDRESS: &str = "vyrkJHFGbpr8rBsV9Z1BWxDMNqxbGGeKzk4cGjDfC3K2";

/// Scraper configuration.
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ScraperConfig {
    /// Delay between polling cycles, milliseconds.
    #[serde(default = "default_refresh_delay")]
    pub refresh_delay: u64,

    /// Pause between consecutive contracts within a cycle, milliseconds.
    #[serde(default = "default_sleep_timeout")]
    pub sleep_timeout: u64,

    /// Maximum number of events fetched per contract per cycle.
    #[serde(default = "default_events_limit")]
    pub events_limit: usize,

    /// Maximum number of swap contracts to discover.
    #[serde(default = "default_swap_contracts_limit")]
    pub swap_contracts_limit: usize,

    /// Only scrape this swap contract.
    #[serde(default)]
    pub target_swap_contract: Option<String>,

    /// Log HTTP requests and responses.
    #[serde(default)]
    pub debug: bool,

    /// Number of trades buffered before the scraper blocks.
    #[serde(default = "default_trade_channel_capacity")]
    pub trade_channel_capacity: usize,

    /// Stop the scraper after this many failed cycles in a row.
    #[serde(default)]
    pub max_consecutive_failures: Option<u32>,

    #[serde(default = "default_node_url")]
    pub node_url: Url,

    #[serde(default = "default_explorer_url")]
    pub explorer_url: Url,

    /// DEX factory contract the swap contracts are discovered from.
    #[serde(default = "default_factory_address")]
    pub factory_address: String,

    /// HTTP request timeout, seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl ScraperConfig {
    /// Load configuration of the exchange from environment variables.
    pub fn from_env(exchange_name: &str) -> Result<Self, envy::Error> {
        envy::prefixed(env_prefix(exchange_name)).from_env()
    }

    /// Load configuration of the exchange from the given variables.
    pub fn from_iter<I>(exchange_name: &str, vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(env_prefix(exchange_name)).from_iter(vars)
    }

    /// Polling interval, never zero.
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay.max(1))
    }

    pub fn sleep_timeout(&self) -> Duration {
        Duration::from_millis(self.sleep_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn target_swap_contract(&self) -> Option<&str> {
        self.target_swap_contract
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            refresh_delay: default_refresh_delay(),
            sleep_timeout: default_sleep_timeout(),
            events_limit: default_events_limit(),
            swap_contracts_limit: default_swap_contracts_limit(),
            target_swap_contract: None,
            debug: false,
            trade_channel_capacity: default_trade_channel_capacity(),
            max_consecutive_failures: None,
            node_url: default_node_url(),
            explorer_url: default_explorer_url(),
            factory_address: default_factory_address(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn env_prefix(exchange_name: &str) -> String {
    format!("{}_", exchange_name.to_uppercase())
}

fn default_refresh_delay() -> u64 {
    DEFAULT_REFRESH_DELAY_MS
}

fn default_sleep_timeout() -> u64 {
    DEFAULT_SLEEP_TIMEOUT_MS
}

fn default_events_limit() -> usize {
    DEFAULT_EVENTS_LIMIT
}

fn default_swap_contracts_limit() -> usize {
    DEFAULT_SWAP_CONTRACTS_LIMIT
}

fn default_trade_channel_capacity() -> usize {
    DEFAULT_TRADE_CHANNEL_CAPACITY
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SEC
}

fn default_node_url() -> Url {
    Url::parse(DEFAULT_NODE_URL).expect("valid default node URL")
}

fn default_explorer_url() -> Url {
    Url::parse(DEFAULT_EXPLORER_URL).expect("valid default explorer URL")
}

fn default_factory_address() -> String {
    DEFAULT_FACTORY_ADDRESS.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::from_iter("Ayin", vars(&[])).unwrap();

        assert_eq!(config.refresh_delay(), Duration::from_millis(400));
        assert_eq!(config.sleep_timeout(), Duration::from_millis(1000));
        assert_eq!(config.events_limit, 10);
        assert_eq!(config.swap_contracts_limit, 100);
        assert_eq!(config.target_swap_contract(), None);
        assert!(!config.debug);
        assert_eq!(config.trade_channel_capacity, 1);
        assert_eq!(config.max_consecutive_failures, None);
        assert_eq!(config.node_url.as_str(), "https://node.mainnet.alephium.org/");
        assert_eq!(config.factory_address, DEFAULT_FACTORY_ADDRESS);
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = ScraperConfig::from_iter(
            "Ayin",
            vars(&[
                ("AYIN_REFRESH_DELAY", "2500"),
                ("AYIN_SLEEP_TIMEOUT", "0"),
                ("AYIN_EVENTS_LIMIT", "25"),
                ("AYIN_SWAP_CONTRACTS_LIMIT", "7"),
                ("AYIN_TARGET_SWAP_CONTRACT", "25ywM8iGxKpZWuGA5z6DXKGcZCXtPBmnbQyJEsjvjjWTy"),
                ("AYIN_DEBUG", "true"),
                ("AYIN_MAX_CONSECUTIVE_FAILURES", "3"),
                ("AYIN_EXPLORER_URL", "http://localhost:9090"),
                // other exchanges are ignored
                ("OTHER_EVENTS_LIMIT", "99"),
            ]),
        )
        .unwrap();

        assert_eq!(config.refresh_delay(), Duration::from_millis(2500));
        assert_eq!(config.sleep_timeout(), Duration::ZERO);
        assert_eq!(config.events_limit, 25);
        assert_eq!(config.swap_contracts_limit, 7);
        assert_eq!(
            config.target_swap_contract(),
            Some("25ywM8iGxKpZWuGA5z6DXKGcZCXtPBmnbQyJEsjvjjWTy")
        );
        assert!(config.debug);
        assert_eq!(config.max_consecutive_failures, Some(3));
        assert_eq!(config.explorer_url.as_str(), "http://localhost:9090/");
    }

    #[test]
    fn test_blank_target_and_zero_refresh() {
        let config = ScraperConfig::from_iter(
            "ayin",
            vars(&[("AYIN_TARGET_SWAP_CONTRACT", "  "), ("AYIN_REFRESH_DELAY", "0")]),
        )
        .unwrap();

        assert_eq!(config.target_swap_contract(), None);
        assert_eq!(config.refresh_delay(), Duration::from_millis(1));
    }

    #[test]
    fn test_invalid_value() {
        assert!(ScraperConfig::from_iter("Ayin", vars(&[("AYIN_EVENTS_LIMIT", "ten")])).is_err());
    }
}
