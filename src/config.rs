use anyhow::{bail, Result};
use std::time::Duration;

// -----------------------------------------------
// NSE API ENDPOINTS
// -----------------------------------------------
pub const NSE_BASE_URL: &str = "https://www.nseindia.com";

pub fn nse_option_chain_url(symbol: &str) -> String {
    let kind = if NSE_INDICES.contains(&symbol) {
        "indices"
    } else {
        "equities"
    };

    format!(
        "{}/api/option-chain-{}?symbol={}",
        NSE_BASE_URL,
        kind,
        urlencoding::encode(symbol)
    )
}

// -----------------------------------------------
// INDEX SYMBOLS
// -----------------------------------------------
pub const NSE_INDICES: &[&str] = &["NIFTY", "BANKNIFTY", "FINNIFTY", "MIDCPNIFTY", "NIFTYNXT50"];

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                               AppleWebKit/537.36 (KHTML, like Gecko) \
                               Chrome/131.0.0.0 Safari/537.36";

pub const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-IN,en;q=0.9",
];

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------
// HTTP HEADERS
// -----------------------------------------------
pub const HEADER_ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
pub const HEADER_ACCEPT_JSON: &str = "application/json, text/javascript, */*; q=0.01";
pub const HEADER_REFERER_HOME: &str = "https://www.nseindia.com";
pub const HEADER_REFERER_DERIVATIVES: &str = "https://www.nseindia.com/get-quotes/derivatives";
pub const HEADER_X_REQUESTED_WITH: &str = "XMLHttpRequest";

// Upper bound on how much of a bad upstream body ends up in the logs
pub const BODY_EXCERPT_CHARS: usize = 400;

// -----------------------------------------------
// CACHE CONFIG
// -----------------------------------------------
pub const CACHE_TTL: Duration = Duration::from_secs(9);
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

// -----------------------------------------------
// SERVER DEFAULTS
// -----------------------------------------------
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SYMBOL: &str = "NIFTY";
pub const DEFAULT_LOG_DIR: &str = "./logs";

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Application configuration handler
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub symbol: String,
    pub cache_ttl: Duration,
    pub refresh_interval: Duration,
    pub log_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            symbol: DEFAULT_SYMBOL.to_string(),
            cache_ttl: CACHE_TTL,
            refresh_interval: REFRESH_INTERVAL,
            log_dir: DEFAULT_LOG_DIR.to_string(),
        }
    }
}

impl AppConfig {
    /// Create new configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secs = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };

        Self {
            host: lookup("HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse::<u16>().ok())
                .unwrap_or(defaults.port),
            symbol: lookup("NSE_SYMBOL")
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.symbol),
            cache_ttl: secs("CACHE_TTL_SECS", defaults.cache_ttl),
            refresh_interval: secs("REFRESH_INTERVAL_SECS", defaults.refresh_interval),
            log_dir: lookup("LOG_DIR")
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(defaults.log_dir),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache_ttl.is_zero() {
            bail!("cache TTL must be greater than zero");
        }
        if self.refresh_interval.is_zero() {
            bail!("refresh interval must be greater than zero");
        }
        if self.cache_ttl >= self.refresh_interval {
            bail!(
                "cache TTL ({}s) must be shorter than the refresh interval ({}s)",
                self.cache_ttl.as_secs(),
                self.refresh_interval.as_secs()
            );
        }
        Ok(())
    }
}
