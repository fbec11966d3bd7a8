//! # Dense Linear Algebra
//!
//! $$
//! [A \mid I] \xrightarrow{\text{Gauss-Jordan}} [I \mid A^{-1}]
//! $$
//!
//! The handful of matrix operations the optimizer needs, on top of `ndarray`.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

use crate::error::Error;
use crate::error::Result;

/// Pivots smaller than this fraction of the largest entry count as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

/// Column-wise mean. Empty matrices yield zeros.
pub fn column_mean(m: &Array2<f64>) -> Array1<f64> {
  m.mean_axis(Axis(0))
    .unwrap_or_else(|| Array1::zeros(m.ncols()))
}

/// Subtract `row` from every row of `m`.
pub fn subtract_broadcast(m: &Array2<f64>, row: &Array1<f64>) -> Array2<f64> {
  m - row
}

pub fn transpose(m: &Array2<f64>) -> Array2<f64> {
  m.t().to_owned()
}

pub fn matmul(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
  a.dot(b)
}

/// Invert a square matrix with partially pivoted Gauss-Jordan elimination.
///
/// Fails with [`Error::SingularCovariance`] when a pivot falls below
/// [`PIVOT_TOLERANCE`] relative to the largest absolute entry.
pub fn invert(m: &Array2<f64>) -> Result<Array2<f64>> {
  let n = m.nrows();
  if n != m.ncols() {
    return Err(Error::singular(format!(
      "cannot invert a {}x{} matrix",
      m.nrows(),
      m.ncols()
    )));
  }
  if n == 0 {
    return Ok(Array2::zeros((0, 0)));
  }

  let scale = m.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
  if !scale.is_finite() {
    return Err(Error::singular("matrix has non-finite entries"));
  }
  if scale == 0.0 {
    return Err(Error::singular("matrix is all zeros"));
  }
  let threshold = scale * PIVOT_TOLERANCE;

  let mut aug = Array2::<f64>::zeros((n, 2 * n));
  aug.slice_mut(ndarray::s![.., ..n]).assign(m);
  for i in 0..n {
    aug[[i, n + i]] = 1.0;
  }

  for col in 0..n {
    let mut max_row = col;
    let mut max_val = aug[[col, col]].abs();
    for row in (col + 1)..n {
      if aug[[row, col]].abs() > max_val {
        max_val = aug[[row, col]].abs();
        max_row = row;
      }
    }

    if max_val <= threshold {
      return Err(Error::singular(format!(
        "pivot {max_val:e} in column {col} is below tolerance {threshold:e}"
      )));
    }

    if max_row != col {
      for j in 0..(2 * n) {
        aug.swap([col, j], [max_row, j]);
      }
    }

    let pivot = aug[[col, col]];
    for j in 0..(2 * n) {
      aug[[col, j]] /= pivot;
    }

    for row in 0..n {
      if row == col {
        continue;
      }
      let factor = aug[[row, col]];
      if factor == 0.0 {
        continue;
      }
      for j in 0..(2 * n) {
        aug[[row, j]] -= factor * aug[[col, j]];
      }
    }
  }

  Ok(aug.slice(ndarray::s![.., n..]).to_owned())
}
