//! # CoinGecko Client
//!
//! $$
//! \texttt{/coins/\{id\}/market\_chart?vs\_currency=usd\&days=N}
//! $$
//!
//! `reqwest` client for CoinGecko-compatible REST APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::PriceSource;
use super::SourceError;
use crate::catalog::Asset;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const MARKETS_PER_PAGE: usize = 250;

#[derive(Debug, Deserialize)]
struct MarketRow {
  id: String,
  symbol: String,
  market_cap_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
  /// `[timestamp_ms, price]` pairs, oldest first.
  prices: Vec<[f64; 2]>,
}

/// HTTP price source backed by the CoinGecko v3 API.
#[derive(Clone, Debug)]
pub struct CoinGeckoClient {
  http: reqwest::Client,
  base_url: String,
  api_key: Option<String>,
  catalog_pages: u32,
}

impl CoinGeckoClient {
  pub fn new(
    base_url: impl Into<String>,
    api_key: Option<String>,
    timeout: Duration,
    catalog_pages: u32,
  ) -> Result<Self, SourceError> {
    let http = reqwest::Client::builder().timeout(timeout).build()?;

    Ok(Self {
      http,
      base_url: base_url.into().trim_end_matches('/').to_string(),
      api_key,
      catalog_pages: catalog_pages.max(1),
    })
  }

  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T, SourceError> {
    let url = format!("{}{}", self.base_url, path);
    let mut request = self.http.get(&url).query(query);
    if let Some(key) = &self.api_key {
      request = request.header(API_KEY_HEADER, key);
    }

    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(SourceError::RateLimited);
    }
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(SourceError::Status {
        status: status.as_u16(),
        body,
      });
    }

    let body = response.text().await?;
    parse_json(&body)
  }
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, SourceError> {
  serde_json::from_str(body).map_err(|e| SourceError::Decode(e.to_string()))
}

fn chart_prices(chart: MarketChart) -> Vec<f64> {
  chart.prices.into_iter().map(|[_, price]| price).collect()
}

fn into_asset(row: MarketRow) -> Asset {
  Asset {
    id: row.id,
    symbol: row.symbol,
    market_cap_rank: row.market_cap_rank,
  }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
  async fn list_assets(&self) -> Result<Vec<Asset>, SourceError> {
    let mut assets = Vec::new();

    for page in 1..=self.catalog_pages {
      let rows: Vec<MarketRow> = self
        .get_json(
          "/coins/markets",
          &[
            ("vs_currency", "usd".to_string()),
            ("order", "market_cap_desc".to_string()),
            ("per_page", MARKETS_PER_PAGE.to_string()),
            ("page", page.to_string()),
          ],
        )
        .await?;

      let last_page = rows.len() < MARKETS_PER_PAGE;
      assets.extend(rows.into_iter().map(into_asset));
      if last_page {
        break;
      }
    }

    debug!(count = assets.len(), "listed upstream markets");
    Ok(assets)
  }

  async fn market_chart(&self, asset_id: &str, days: u32) -> Result<Vec<f64>, SourceError> {
    let chart: MarketChart = self
      .get_json(
        &format!("/coins/{asset_id}/market_chart"),
        &[
          ("vs_currency", "usd".to_string()),
          ("days", days.to_string()),
        ],
      )
      .await?;

    Ok(chart_prices(chart))
  }
}
