//! # Price Fetcher
//!
//! $$
//! \text{wait}_n = b \cdot 2^{n}, \quad n = 1, \dots, N_{\max}-1
//! $$
//!
//! Cache-first acquisition of historical price series with rate-limit retry.
//! Assets are fetched one after another so a batch never bursts the shared
//! upstream rate budget.

pub mod cache;
pub mod retry;

use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::source::PriceSource;

pub use cache::PriceCache;
pub use retry::RetryPolicy;

/// Chronological USD prices for one asset over one window.
pub type PriceSeries = Vec<f64>;

pub const MIN_WINDOW_DAYS: u32 = 7;
pub const MAX_WINDOW_DAYS: u32 = 2000;

pub fn validate_window(window_days: u32) -> Result<()> {
  if (MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&window_days) {
    Ok(())
  } else {
    Err(Error::InvalidWindow {
      window_days,
      min: MIN_WINDOW_DAYS,
      max: MAX_WINDOW_DAYS,
    })
  }
}

/// Fetches price series through a shared [`PriceCache`].
#[derive(Clone)]
pub struct PriceFetcher {
  source: Arc<dyn PriceSource>,
  cache: Arc<PriceCache>,
  retry: RetryPolicy,
}

impl PriceFetcher {
  pub fn new(source: Arc<dyn PriceSource>, cache: Arc<PriceCache>, retry: RetryPolicy) -> Self {
    Self {
      source,
      cache,
      retry,
    }
  }

  pub fn cache(&self) -> &Arc<PriceCache> {
    &self.cache
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    self.retry
  }

  /// Fetch every asset in order. The first failure aborts the batch.
  pub async fn fetch_all(
    &self,
    asset_ids: &[String],
    window_days: u32,
  ) -> Result<Vec<(String, PriceSeries)>> {
    validate_window(window_days)?;

    let mut out = Vec::with_capacity(asset_ids.len());
    for asset_id in asset_ids {
      let series = self.fetch(asset_id, window_days).await?;
      out.push((asset_id.clone(), series));
    }
    Ok(out)
  }

  /// Fetch one series, serving it from cache while fresh.
  pub async fn fetch(&self, asset_id: &str, window_days: u32) -> Result<PriceSeries> {
    if let Some(series) = self.cache.get_fresh(asset_id, window_days) {
      debug!(asset_id, window_days, "price cache hit");
      return Ok(series);
    }
    debug!(asset_id, window_days, "price cache miss");

    let series = self.fetch_with_retry(asset_id, window_days).await?;
    if series.len() < 2 {
      return Err(Error::InsufficientData {
        asset_id: asset_id.to_string(),
        window_days,
        points: series.len(),
      });
    }

    self.cache.insert(asset_id, window_days, series.clone());
    Ok(series)
  }

  async fn fetch_with_retry(&self, asset_id: &str, window_days: u32) -> Result<PriceSeries> {
    let max_attempts = self.retry.attempts();
    let mut attempt = 0;

    loop {
      attempt += 1;
      match self.source.market_chart(asset_id, window_days).await {
        Ok(series) => return Ok(series),
        Err(err) if err.is_rate_limited() => {
          if attempt >= max_attempts {
            return Err(Error::RetryExhausted {
              asset_id: asset_id.to_string(),
              attempts: attempt,
            });
          }

          let delay = self.retry.backoff(attempt);
          warn!(
            asset_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "rate limited, backing off"
          );
          tokio::time::sleep(delay).await;
        }
        Err(source) => {
          return Err(Error::Fetch {
            asset_id: asset_id.to_string(),
            window_days,
            source,
          })
        }
      }
    }
  }
}
