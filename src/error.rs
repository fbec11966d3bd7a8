//! # Errors
//!
//! $$
//! \text{resolve} \to \text{fetch} \to \text{returns} \to \text{optimize}
//! $$
//!
//! Every pipeline stage fails fast with one of these variants. None of them
//! leave the shared catalog or price cache in a partial state.

use thiserror::Error;

use crate::source::SourceError;

/// Pipeline error, one variant per failure kind.
#[derive(Error, Debug)]
pub enum Error {
  #[error("unknown tickers: {}", .missing.join(", "))]
  Resolution { missing: Vec<String> },

  #[error("lookback window of {window_days} days is outside {min}..={max}")]
  InvalidWindow { window_days: u32, min: u32, max: u32 },

  #[error("failed to fetch {window_days}d prices for {asset_id}: {source}")]
  Fetch {
    asset_id: String,
    window_days: u32,
    source: SourceError,
  },

  #[error("rate limited on {asset_id}, gave up after {attempts} attempts")]
  RetryExhausted { asset_id: String, attempts: u32 },

  #[error("{asset_id} returned {points} price points for {window_days}d, need at least 2")]
  InsufficientData {
    asset_id: String,
    window_days: u32,
    points: usize,
  },

  #[error("no price series supplied")]
  EmptyInput,

  #[error("common history of {min_len} points is too short to compute returns")]
  InsufficientHistory { min_len: usize },

  #[error("{asset_id} has invalid price {price} at index {index}")]
  InvalidPrice {
    asset_id: String,
    index: usize,
    price: f64,
  },

  #[error("return matrix has {columns} columns for {asset_ids} asset ids")]
  ShapeMismatch { asset_ids: usize, columns: usize },

  #[error("return matrix has no rows")]
  EmptyReturns,

  #[error("covariance matrix is singular: {reason}")]
  SingularCovariance { reason: String },

  #[error("failed to refresh asset catalog: {0}")]
  Catalog(#[source] SourceError),
}

impl Error {
  /// Stable machine-readable code for front ends.
  pub fn code(&self) -> &'static str {
    match self {
      Error::Resolution { .. } => "RESOLUTION_ERROR",
      Error::InvalidWindow { .. } => "INVALID_WINDOW",
      Error::Fetch { .. } => "FETCH_ERROR",
      Error::RetryExhausted { .. } => "RETRY_EXHAUSTED",
      Error::InsufficientData { .. } => "INSUFFICIENT_DATA",
      Error::EmptyInput => "EMPTY_INPUT",
      Error::InsufficientHistory { .. } => "INSUFFICIENT_HISTORY",
      Error::InvalidPrice { .. } => "INVALID_PRICE",
      Error::ShapeMismatch { .. } => "SHAPE_MISMATCH",
      Error::EmptyReturns => "EMPTY_RETURNS",
      Error::SingularCovariance { .. } => "SINGULAR_COVARIANCE",
      Error::Catalog(_) => "CATALOG_ERROR",
    }
  }

  pub(crate) fn singular(reason: impl Into<String>) -> Self {
    Error::SingularCovariance {
      reason: reason.into(),
    }
  }
}

pub type Result<T> = std::result::Result<T, Error>;
