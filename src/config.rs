//! # Configuration
//!
//! $$
//! \text{defaults} \prec \text{environment} \prec \text{CLI flags}
//! $$
//!
//! Runtime settings, read from `MINVAR_*` environment variables.

use std::env;
use std::time::Duration;

use crate::error::Result;
use crate::fetcher::cache::DEFAULT_TTL;
use crate::fetcher::validate_window;
use crate::fetcher::RetryPolicy;
use crate::source::coingecko::DEFAULT_BASE_URL;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

#[derive(Clone, Debug)]
pub struct Config {
  /// Base URL of the CoinGecko-compatible API.
  pub api_base: String,
  /// Optional API key sent with every upstream request.
  pub api_key: Option<String>,
  /// Lookback used when a request does not specify one.
  pub default_window_days: u32,
  pub cache_ttl: Duration,
  pub retry: RetryPolicy,
  /// Pages of 250 markets loaded into the catalog.
  pub catalog_pages: u32,
  /// Background catalog refresh period. `None` disables it.
  pub catalog_refresh: Option<Duration>,
  pub http_timeout: Duration,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api_base: DEFAULT_BASE_URL.to_string(),
      api_key: None,
      default_window_days: DEFAULT_WINDOW_DAYS,
      cache_ttl: DEFAULT_TTL,
      retry: RetryPolicy::default(),
      catalog_pages: 4,
      catalog_refresh: None,
      http_timeout: Duration::from_secs(30),
    }
  }
}

fn env_str(name: &str) -> Option<String> {
  env::var(name)
    .ok()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
}

fn env_u64(name: &str, default: u64) -> u64 {
  env_str(name)
    .and_then(|s| s.parse().ok())
    .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
  env_str(name)
    .and_then(|s| s.parse().ok())
    .unwrap_or(default)
}

impl Config {
  /// Defaults overridden by any `MINVAR_*` variables that are set and parse.
  pub fn from_env() -> Result<Self> {
    let defaults = Self::default();

    let refresh_secs = env_u64("MINVAR_CATALOG_REFRESH_SECS", 0);
    let config = Self {
      api_base: env_str("MINVAR_API_BASE").unwrap_or(defaults.api_base),
      api_key: env_str("MINVAR_API_KEY"),
      default_window_days: env_u32("MINVAR_DEFAULT_DAYS", defaults.default_window_days),
      cache_ttl: Duration::from_secs(env_u64(
        "MINVAR_CACHE_TTL_SECS",
        defaults.cache_ttl.as_secs(),
      )),
      retry: RetryPolicy::new(
        env_u32("MINVAR_MAX_ATTEMPTS", defaults.retry.max_attempts),
        Duration::from_millis(env_u64(
          "MINVAR_BACKOFF_BASE_MS",
          defaults.retry.base_delay.as_millis() as u64,
        )),
      ),
      catalog_pages: env_u32("MINVAR_CATALOG_PAGES", defaults.catalog_pages),
      catalog_refresh: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
      http_timeout: Duration::from_secs(env_u64(
        "MINVAR_HTTP_TIMEOUT_SECS",
        defaults.http_timeout.as_secs(),
      )),
    };

    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<()> {
    validate_window(self.default_window_days)
  }
}
