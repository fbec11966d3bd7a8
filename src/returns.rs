//! # Returns Engine
//!
//! $$
//! r_{t,k} = \ln\frac{p_{t,k}}{p_{t-1,k}}
//! $$
//!
//! Aligns price series on their most recent common window and turns them
//! into a log-return matrix.

use ndarray::Array2;

use crate::error::Error;
use crate::error::Result;
use crate::fetcher::PriceSeries;

/// Log returns, rows = time steps, columns = assets in request order.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnMatrix {
  asset_ids: Vec<String>,
  values: Array2<f64>,
}

impl ReturnMatrix {
  /// Wrap raw returns. `values` must have one column per asset id.
  pub fn new(asset_ids: Vec<String>, values: Array2<f64>) -> Result<Self> {
    if asset_ids.len() != values.ncols() {
      return Err(Error::ShapeMismatch {
        asset_ids: asset_ids.len(),
        columns: values.ncols(),
      });
    }
    Ok(Self { asset_ids, values })
  }

  pub fn asset_ids(&self) -> &[String] {
    &self.asset_ids
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn nrows(&self) -> usize {
    self.values.nrows()
  }

  pub fn ncols(&self) -> usize {
    self.values.ncols()
  }
}

/// Keep the trailing `len` samples of `series`.
fn tail(series: &[f64], len: usize) -> &[f64] {
  &series[series.len().saturating_sub(len)..]
}

/// Convert close prices to log returns.
pub fn log_returns_series(asset_id: &str, closes: &[f64]) -> Result<Vec<f64>> {
  if let Some(index) = closes.iter().position(|p| !p.is_finite() || *p <= 0.0) {
    return Err(Error::InvalidPrice {
      asset_id: asset_id.to_string(),
      index,
      price: closes[index],
    });
  }

  Ok(closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect())
}

/// Build the return matrix over the shortest series' length, dropping the
/// oldest samples of longer series.
pub fn compute_returns(prices: &[(String, PriceSeries)]) -> Result<ReturnMatrix> {
  let min_len = prices
    .iter()
    .map(|(_, series)| series.len())
    .min()
    .ok_or(Error::EmptyInput)?;
  if min_len < 2 {
    return Err(Error::InsufficientHistory { min_len });
  }

  let rows = min_len - 1;
  let mut values = Array2::<f64>::zeros((rows, prices.len()));
  for (k, (asset_id, series)) in prices.iter().enumerate() {
    let column = log_returns_series(asset_id, tail(series, min_len))?;
    for (t, r) in column.into_iter().enumerate() {
      values[[t, k]] = r;
    }
  }

  let asset_ids = prices.iter().map(|(id, _)| id.clone()).collect();
  ReturnMatrix::new(asset_ids, values)
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;

  use super::*;

  fn series(id: &str, prices: &[f64]) -> (String, PriceSeries) {
    (id.to_string(), prices.to_vec())
  }

  #[test]
  fn two_asset_example_rows() {
    let m = compute_returns(&[
      series("bitcoin", &[100.0, 105.0, 103.0]),
      series("ethereum", &[10.0, 10.5, 10.2]),
    ])
    .unwrap();

    assert_eq!(m.asset_ids(), ["bitcoin", "ethereum"]);
    assert_eq!(m.nrows(), 2);
    let v = m.values();
    assert_relative_eq!(v[[0, 0]], 1.05_f64.ln(), epsilon = 1e-12);
    assert_relative_eq!(v[[0, 1]], 1.05_f64.ln(), epsilon = 1e-12);
    assert_relative_eq!(v[[1, 0]], (103.0_f64 / 105.0).ln(), epsilon = 1e-12);
    assert_relative_eq!(v[[1, 1]], (10.2_f64 / 10.5).ln(), epsilon = 1e-12);
  }

  #[test]
  fn longer_series_lose_their_oldest_points() {
    let long: Vec<f64> = (1..=10).map(|x| x as f64).collect();
    let short: Vec<f64> = (1..=7).map(|x| 10.0 * x as f64).collect();

    let m = compute_returns(&[series("a", &long), series("b", &short)]).unwrap();

    assert_eq!(m.nrows(), 6);
    assert_eq!(m.ncols(), 2);
    // first kept step of `a` is 4 -> 5
    assert_relative_eq!(m.values()[[0, 0]], (5.0_f64 / 4.0).ln(), epsilon = 1e-12);
    assert_relative_eq!(m.values()[[5, 0]], (10.0_f64 / 9.0).ln(), epsilon = 1e-12);
  }

  #[test]
  fn column_count_must_match_asset_ids() {
    let err = ReturnMatrix::new(vec!["a".to_string()], Array2::zeros((3, 2))).unwrap_err();
    assert!(matches!(
      err,
      Error::ShapeMismatch {
        asset_ids: 1,
        columns: 2
      }
    ));
    assert_eq!(err.code(), "SHAPE_MISMATCH");
  }

  #[test]
  fn empty_mapping_is_rejected() {
    assert!(matches!(compute_returns(&[]), Err(Error::EmptyInput)));
  }

  #[test]
  fn too_short_common_history_is_rejected() {
    let err = compute_returns(&[series("a", &[1.0, 2.0, 3.0]), series("b", &[5.0])]).unwrap_err();
    assert!(matches!(err, Error::InsufficientHistory { min_len: 1 }));
  }

  #[test]
  fn non_positive_price_is_reported_with_position() {
    let err = compute_returns(&[series("a", &[1.0, 0.0, 3.0])]).unwrap_err();
    match err {
      Error::InvalidPrice {
        asset_id, index, ..
      } => {
        assert_eq!(asset_id, "a");
        assert_eq!(index, 1);
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn invalid_price_outside_the_common_window_is_ignored() {
    let m = compute_returns(&[series("a", &[-1.0, 2.0, 4.0]), series("b", &[1.0, 2.0])]).unwrap();
    assert_eq!(m.nrows(), 1);
    assert_relative_eq!(m.values()[[0, 0]], 2.0_f64.ln(), epsilon = 1e-12);
  }
}
