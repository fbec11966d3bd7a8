use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::PriceSource;
use super::SourceError;
use crate::catalog::Asset;

/// In-memory source that replays queued responses and counts calls.
#[derive(Default)]
pub(crate) struct ScriptedSource {
  assets: Mutex<Vec<Asset>>,
  listing_failures: Mutex<VecDeque<SourceError>>,
  series: Mutex<HashMap<String, Vec<f64>>>,
  queued: Mutex<HashMap<String, VecDeque<Result<Vec<f64>, SourceError>>>>,
  chart_calls: AtomicUsize,
  list_calls: AtomicUsize,
}

impl ScriptedSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_asset(self, id: &str, symbol: &str, rank: Option<u32>) -> Self {
    self.assets.lock().push(Asset {
      id: id.to_string(),
      symbol: symbol.to_string(),
      market_cap_rank: rank,
    });
    self
  }

  /// Answer every chart request for `id` with `prices` once the queue is drained.
  pub fn with_series(self, id: &str, prices: &[f64]) -> Self {
    self.series.lock().insert(id.to_string(), prices.to_vec());
    self
  }

  /// One-shot response served before the standing series.
  pub fn push_response(&self, id: &str, response: Result<Vec<f64>, SourceError>) {
    self
      .queued
      .lock()
      .entry(id.to_string())
      .or_default()
      .push_back(response);
  }

  pub fn fail_next_listing(&self, err: SourceError) {
    self.listing_failures.lock().push_back(err);
  }

  pub fn set_assets(&self, assets: Vec<Asset>) {
    *self.assets.lock() = assets;
  }

  pub fn chart_calls(&self) -> usize {
    self.chart_calls.load(Ordering::SeqCst)
  }

  pub fn list_calls(&self) -> usize {
    self.list_calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PriceSource for ScriptedSource {
  async fn list_assets(&self) -> Result<Vec<Asset>, SourceError> {
    self.list_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(err) = self.listing_failures.lock().pop_front() {
      return Err(err);
    }
    Ok(self.assets.lock().clone())
  }

  async fn market_chart(&self, asset_id: &str, _days: u32) -> Result<Vec<f64>, SourceError> {
    self.chart_calls.fetch_add(1, Ordering::SeqCst);

    let queued = self
      .queued
      .lock()
      .get_mut(asset_id)
      .and_then(|q| q.pop_front());
    if let Some(response) = queued {
      return response;
    }

    self
      .series
      .lock()
      .get(asset_id)
      .cloned()
      .ok_or_else(|| SourceError::Status {
        status: 404,
        body: format!("coin '{asset_id}' not found"),
      })
  }
}
