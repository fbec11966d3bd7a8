//! # Asset Catalog
//!
//! $$
//! \mathcal{C} = \{(\text{id}_i, \text{symbol}_i, \text{rank}_i)\}_{i=1}^{n}
//! $$
//!
//! Read-mostly snapshot of known assets. A refresh builds a new [`Catalog`]
//! and swaps it in whole, so readers holding the previous snapshot are never
//! disturbed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;

use crate::error::Error;
use crate::error::Result;
use crate::source::PriceSource;

/// A tradable asset as listed by the upstream source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
  pub id: String,
  pub symbol: String,
  /// 1 is the largest market cap. `None` when the source does not rank it.
  pub market_cap_rank: Option<u32>,
}

/// Immutable, indexed set of assets.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
  assets: Vec<Asset>,
  by_id: HashMap<String, usize>,
  by_symbol: HashMap<String, Vec<usize>>,
}

impl Catalog {
  pub fn new(assets: Vec<Asset>) -> Self {
    let mut by_id = HashMap::with_capacity(assets.len());
    let mut by_symbol: HashMap<String, Vec<usize>> = HashMap::new();

    for (idx, asset) in assets.iter().enumerate() {
      by_id.entry(asset.id.to_lowercase()).or_insert(idx);
      by_symbol
        .entry(asset.symbol.to_lowercase())
        .or_default()
        .push(idx);
    }

    Self {
      assets,
      by_id,
      by_symbol,
    }
  }

  pub fn len(&self) -> usize {
    self.assets.len()
  }

  pub fn is_empty(&self) -> bool {
    self.assets.is_empty()
  }

  pub fn assets(&self) -> &[Asset] {
    &self.assets
  }

  /// Asset whose id equals `id` (lower-cased).
  pub fn by_id(&self, id: &str) -> Option<&Asset> {
    self.by_id.get(id).map(|&idx| &self.assets[idx])
  }

  /// Assets sharing `symbol` (lower-cased), in catalog order.
  pub fn by_symbol<'a>(&'a self, symbol: &str) -> impl Iterator<Item = &'a Asset> + 'a {
    self
      .by_symbol
      .get(symbol)
      .into_iter()
      .flatten()
      .map(move |&idx| &self.assets[idx])
  }
}

/// Shared holder of the current catalog snapshot.
#[derive(Debug, Default)]
pub struct CatalogStore {
  current: RwLock<Arc<Catalog>>,
}

impl CatalogStore {
  pub fn new(catalog: Catalog) -> Self {
    Self {
      current: RwLock::new(Arc::new(catalog)),
    }
  }

  /// The catalog as of now. Later refreshes do not affect the returned snapshot.
  pub fn snapshot(&self) -> Arc<Catalog> {
    self.current.read().clone()
  }

  pub fn replace(&self, catalog: Catalog) {
    *self.current.write() = Arc::new(catalog);
  }

  /// Reload every asset from `source` and swap the snapshot.
  ///
  /// On failure the previous snapshot stays in place.
  pub async fn refresh(&self, source: &dyn PriceSource) -> Result<usize> {
    let assets = source.list_assets().await.map_err(Error::Catalog)?;
    let catalog = Catalog::new(assets);
    let count = catalog.len();
    self.replace(catalog);

    info!(assets = count, "asset catalog refreshed");
    Ok(count)
  }

  /// Refresh every `period` on a background task. The first refresh happens
  /// one period from now.
  pub fn spawn_refresh(
    self: Arc<Self>,
    source: Arc<dyn PriceSource>,
    period: Duration,
  ) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
      loop {
        ticker.tick().await;
        if let Err(err) = self.refresh(source.as_ref()).await {
          error!(error = %err, "periodic catalog refresh failed, keeping previous snapshot");
        }
      }
    })
  }
}
