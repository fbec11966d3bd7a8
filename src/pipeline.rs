//! # Allocation Pipeline
//!
//! $$
//! \text{tickers} \xrightarrow{\text{resolve}} \text{ids} \xrightarrow{\text{fetch}} p \xrightarrow{\ln} R \xrightarrow{\Sigma^{-1}} \mathbf{w}^\*
//! $$
//!
//! End-to-end request handling over injected catalog, cache and source.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::error::Result;
use crate::fetcher::validate_window;
use crate::fetcher::PriceCache;
use crate::fetcher::PriceFetcher;
use crate::optimizer::covariance;
use crate::optimizer::min_variance_weights;
use crate::optimizer::portfolio_variance;
use crate::resolver::resolve;
use crate::returns::compute_returns;
use crate::source::PriceSource;

/// Result of one request. `weights[i]` belongs to `asset_ids[i]`.
#[derive(Clone, Debug, Serialize)]
pub struct Allocation {
  pub asset_ids: Vec<String>,
  pub weights: Vec<f64>,
  /// Per-period variance of the optimal portfolio's log returns.
  pub variance: f64,
  /// Number of return observations behind the covariance estimate.
  pub observations: usize,
  pub window_days: u32,
  pub as_of: DateTime<Utc>,
}

impl Allocation {
  pub fn weight_of(&self, asset_id: &str) -> Option<f64> {
    self
      .asset_ids
      .iter()
      .position(|id| id == asset_id)
      .map(|i| self.weights[i])
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
    self
      .asset_ids
      .iter()
      .map(String::as_str)
      .zip(self.weights.iter().copied())
  }
}

/// Shared request handler. Cheap to clone; clones share catalog and cache.
#[derive(Clone)]
pub struct Pipeline {
  catalog: Arc<CatalogStore>,
  fetcher: PriceFetcher,
  default_window_days: u32,
}

impl Pipeline {
  pub fn new(catalog: Arc<CatalogStore>, fetcher: PriceFetcher, default_window_days: u32) -> Self {
    Self {
      catalog,
      fetcher,
      default_window_days,
    }
  }

  /// Fresh, empty stores wired to `source` with settings from `config`.
  pub fn from_config(config: &Config, source: Arc<dyn PriceSource>) -> Self {
    let cache = Arc::new(PriceCache::new(config.cache_ttl));
    let fetcher = PriceFetcher::new(source, cache, config.retry);
    Self::new(
      Arc::new(CatalogStore::default()),
      fetcher,
      config.default_window_days,
    )
  }

  pub fn catalog(&self) -> &Arc<CatalogStore> {
    &self.catalog
  }

  pub fn fetcher(&self) -> &PriceFetcher {
    &self.fetcher
  }

  /// Minimum-variance allocation for `tickers` over `window_days` (or the
  /// configured default).
  pub async fn run<S: AsRef<str>>(
    &self,
    tickers: &[S],
    window_days: Option<u32>,
  ) -> Result<Allocation> {
    let window_days = window_days.unwrap_or(self.default_window_days);
    validate_window(window_days)?;

    let catalog = self.catalog.snapshot();
    let asset_ids = resolve(&catalog, tickers)?;

    let prices = self.fetcher.fetch_all(&asset_ids, window_days).await?;
    let returns = compute_returns(&prices)?;
    let cov = covariance(&returns)?;
    let weights = min_variance_weights(&cov)?;
    let variance = portfolio_variance(&weights, &cov);

    info!(
      assets = asset_ids.len(),
      window_days,
      observations = returns.nrows(),
      variance,
      "minimum-variance allocation computed"
    );

    Ok(Allocation {
      asset_ids,
      weights,
      variance,
      observations: returns.nrows(),
      window_days,
      as_of: Utc::now(),
    })
  }
}
