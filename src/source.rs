//! # Price Source
//!
//! $$
//! \mathcal{S}: (\text{id}, N) \mapsto (p_1, \dots, p_T)
//! $$
//!
//! Upstream market-data contract: a listing of known assets and a historical
//! USD market chart per asset.

pub mod coingecko;
#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;
use thiserror::Error;

use crate::catalog::Asset;

pub use coingecko::CoinGeckoClient;

/// Upstream failure. Only [`SourceError::RateLimited`] is worth retrying.
#[derive(Error, Debug)]
pub enum SourceError {
  #[error("upstream rate limit hit")]
  RateLimited,

  #[error("upstream returned HTTP {status}: {body}")]
  Status { status: u16, body: String },

  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("malformed upstream payload: {0}")]
  Decode(String),
}

impl SourceError {
  pub fn is_rate_limited(&self) -> bool {
    matches!(self, SourceError::RateLimited)
  }
}

/// Market data provider used by the catalog and the price fetcher.
#[async_trait]
pub trait PriceSource: Send + Sync {
  /// Every asset the provider knows about, in provider order.
  async fn list_assets(&self) -> Result<Vec<Asset>, SourceError>;

  /// Chronologically ordered USD prices for `asset_id` over the last `days` days.
  async fn market_chart(&self, asset_id: &str, days: u32) -> Result<Vec<f64>, SourceError>;
}
