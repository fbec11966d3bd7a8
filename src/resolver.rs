//! # Ticker Resolver
//!
//! $$
//! \text{ticker} \mapsto \begin{cases} \text{id} & \text{if an id matches} \\ \arg\min_{\text{symbol match}} \text{rank} & \text{otherwise} \end{cases}
//! $$
//!
//! Maps user-supplied tickers to canonical asset ids.

use crate::catalog::Asset;
use crate::catalog::Catalog;
use crate::error::Error;
use crate::error::Result;

/// Ranked assets sort before unranked ones.
fn rank_key(asset: &Asset) -> (bool, u32) {
  match asset.market_cap_rank {
    Some(rank) => (false, rank),
    None => (true, u32::MAX),
  }
}

/// Resolve a single ticker, id match first, then best-ranked symbol match.
pub fn resolve_one<'a>(catalog: &'a Catalog, ticker: &str) -> Option<&'a Asset> {
  let needle = ticker.trim().to_lowercase();
  if needle.is_empty() {
    return None;
  }

  catalog
    .by_id(&needle)
    .or_else(|| catalog.by_symbol(&needle).min_by_key(|a| rank_key(a)))
}

/// Resolve every ticker in order. All misses are reported together.
pub fn resolve<S: AsRef<str>>(catalog: &Catalog, tickers: &[S]) -> Result<Vec<String>> {
  let mut ids = Vec::with_capacity(tickers.len());
  let mut missing = Vec::new();

  for ticker in tickers {
    match resolve_one(catalog, ticker.as_ref()) {
      Some(asset) => ids.push(asset.id.clone()),
      None => missing.push(ticker.as_ref().to_string()),
    }
  }

  if missing.is_empty() {
    Ok(ids)
  } else {
    Err(Error::Resolution { missing })
  }
}
