//! # Price Cache
//!
//! $$
//! \text{fresh}(k) \iff t_{\text{now}} - t_{\text{fetched}}(k) < \tau
//! $$
//!
//! Time-bounded cache of price series keyed by `(asset_id, window_days)`.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use super::PriceSeries;

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

type CacheKey = (String, u32);

#[derive(Clone, Debug)]
pub struct CacheEntry {
  pub series: PriceSeries,
  pub fetched_at: Instant,
}

impl CacheEntry {
  fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(self.fetched_at) < ttl
  }
}

/// Shared price cache. Stale entries stay in the map until overwritten or
/// purged; lookups simply ignore them.
#[derive(Debug)]
pub struct PriceCache {
  entries: DashMap<CacheKey, CacheEntry>,
  ttl: Duration,
}

impl Default for PriceCache {
  fn default() -> Self {
    Self::new(DEFAULT_TTL)
  }
}

impl PriceCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      entries: DashMap::new(),
      ttl,
    }
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// Cached series for the key if it is still within the TTL.
  pub fn get_fresh(&self, asset_id: &str, window_days: u32) -> Option<PriceSeries> {
    let key = (asset_id.to_string(), window_days);
    let now = Instant::now();

    self
      .entries
      .get(&key)
      .filter(|entry| entry.is_fresh(self.ttl, now))
      .map(|entry| entry.series.clone())
  }

  /// Store `series`, replacing any previous entry for the key.
  pub fn insert(&self, asset_id: &str, window_days: u32, series: PriceSeries) {
    self.entries.insert(
      (asset_id.to_string(), window_days),
      CacheEntry {
        series,
        fetched_at: Instant::now(),
      },
    );
  }

  /// Drop every stale entry and return how many were removed.
  pub fn purge_stale(&self) -> usize {
    let now = Instant::now();
    let before = self.entries.len();
    self.entries.retain(|_, entry| entry.is_fresh(self.ttl, now));
    before - self.entries.len()
  }

  /// Number of stored entries, stale ones included.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
