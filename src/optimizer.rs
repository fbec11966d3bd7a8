//! # Minimum-Variance Optimizer
//!
//! $$
//! \mathbf{w}^\* = \frac{\Sigma^{-1}\mathbf{1}}{\mathbf{1}^\top\Sigma^{-1}\mathbf{1}}
//! $$
//!
//! Sample covariance with Bessel's correction and the closed-form global
//! minimum-variance portfolio. Weights sum to one and may be negative.
//!
//! The inverse is taken on the correlation matrix
//! $R = D^{-1/2} \Sigma D^{-1/2}$ and mapped back with
//! $\Sigma^{-1} = D^{-1/2} R^{-1} D^{-1/2}$, so singularity tracks how
//! collinear the assets are rather than how large their returns are.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;

use crate::error::Error;
use crate::error::Result;
use crate::linalg::column_mean;
use crate::linalg::invert;
use crate::linalg::matmul;
use crate::linalg::subtract_broadcast;
use crate::linalg::transpose;
use crate::returns::ReturnMatrix;

/// Sample covariance `XᵗX / (T - 1)` of the demeaned returns.
pub fn covariance(returns: &ReturnMatrix) -> Result<Array2<f64>> {
  let rows = returns.nrows();
  if rows == 0 {
    return Err(Error::EmptyReturns);
  }
  if rows == 1 {
    return Err(Error::singular(
      "a single return observation has no sample covariance",
    ));
  }

  let x = returns.values();
  let demeaned = subtract_broadcast(x, &column_mean(x));
  let cov = matmul(&transpose(&demeaned), &demeaned) / (rows - 1) as f64;

  Ok(cov)
}

/// `1 / σ_k` per asset, rejecting zero, negative and non-finite variances.
fn inverse_volatilities(cov: &Array2<f64>) -> Result<Array1<f64>> {
  if cov.nrows() != cov.ncols() {
    return Err(Error::singular(format!(
      "covariance is {}x{}, not square",
      cov.nrows(),
      cov.ncols()
    )));
  }

  let mut scale = Array1::<f64>::zeros(cov.nrows());
  for (k, var) in cov.diag().iter().enumerate() {
    if !var.is_finite() || *var <= 0.0 {
      return Err(Error::singular(format!("asset {k} has variance {var}")));
    }
    scale[k] = var.sqrt().recip();
  }
  Ok(scale)
}

/// `Σ⁻¹` via the correlation matrix.
fn invert_covariance(cov: &Array2<f64>) -> Result<Array2<f64>> {
  let scale = inverse_volatilities(cov)?;
  let outer = &scale.view().insert_axis(Axis(1)) * &scale.view().insert_axis(Axis(0));

  let corr = cov * &outer;
  let corr_inv = invert(&corr)?;
  Ok(corr_inv * &outer)
}

/// Closed-form minimum-variance weights for a covariance matrix.
pub fn min_variance_weights(cov: &Array2<f64>) -> Result<Vec<f64>> {
  let n = cov.nrows();
  let cov_inv = invert_covariance(cov)?;
  let ones = Array1::<f64>::ones(n);

  let numerator = cov_inv.dot(&ones);
  let denominator = ones.dot(&numerator);
  if !denominator.is_finite() || denominator <= 0.0 {
    return Err(Error::singular(format!(
      "1ᵗΣ⁻¹1 = {denominator} is not a positive finite number"
    )));
  }

  let weights: Vec<f64> = numerator.iter().map(|v| v / denominator).collect();
  if weights.iter().any(|w| !w.is_finite()) {
    return Err(Error::singular("weights are not finite"));
  }

  Ok(weights)
}

/// Global minimum-variance weights, one per return column, same order.
pub fn optimize(returns: &ReturnMatrix) -> Result<Vec<f64>> {
  let cov = covariance(returns)?;
  min_variance_weights(&cov)
}

/// Portfolio variance `wᵗΣw`.
pub fn portfolio_variance(weights: &[f64], cov: &Array2<f64>) -> f64 {
  let w = Array1::from(weights.to_vec());
  w.dot(&cov.dot(&w))
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use approx::assert_relative_eq;
  use ndarray::array;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use rand_distr::Distribution;
  use rand_distr::Normal;

  use super::*;
  use crate::fetcher::PriceSeries;
  use crate::returns::compute_returns;

  fn matrix(values: Array2<f64>) -> ReturnMatrix {
    let ids = (0..values.ncols()).map(|i| format!("asset-{i}")).collect();
    ReturnMatrix::new(ids, values).unwrap()
  }

  fn named(raw: &[(&str, &[f64])]) -> Vec<(String, PriceSeries)> {
    raw
      .iter()
      .map(|(id, prices)| (id.to_string(), prices.to_vec()))
      .collect()
  }

  /// Random walks sharing one market factor, seeded per shape.
  fn random_prices(assets: usize, points: usize, seed: u64) -> Vec<(String, PriceSeries)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let shock = Normal::new(0.0, 0.03).unwrap();
    let market: Vec<f64> = (0..points).map(|_| shock.sample(&mut rng)).collect();

    (0..assets)
      .map(|k| {
        let beta = 0.3 + 1.5 * k as f64 / assets as f64;
        let mut price = 10.0_f64.powi(k as i32 % 5 - 2);
        let series = market
          .iter()
          .map(|m| {
            price *= (beta * m + shock.sample(&mut rng)).exp();
            price
          })
          .collect();
        (format!("asset-{k}"), series)
      })
      .collect()
  }

  #[test]
  fn covariance_uses_bessel_correction() {
    let returns = matrix(array![[0.01, 0.02], [0.03, -0.02], [0.02, 0.00]]);
    let cov = covariance(&returns).unwrap();

    // column 0: mean 0.02, squared deviations 1e-4, 1e-4, 0
    assert_relative_eq!(cov[[0, 0]], 2e-4 / 2.0, epsilon = 1e-15);
    // column 1: mean 0, squared deviations 4e-4, 4e-4, 0
    assert_relative_eq!(cov[[1, 1]], 8e-4 / 2.0, epsilon = 1e-15);
    assert_relative_eq!(cov[[0, 1]], cov[[1, 0]], epsilon = 1e-18);
    assert_relative_eq!(cov[[0, 1]], (-0.01 * 0.02 + 0.01 * -0.02) / 2.0, epsilon = 1e-15);
  }

  #[test]
  fn uncorrelated_assets_get_inverse_variance_weights() {
    let cov = array![[0.04, 0.0], [0.0, 0.01]];
    let w = min_variance_weights(&cov).unwrap();

    assert_relative_eq!(w[0], 0.2, epsilon = 1e-12);
    assert_relative_eq!(w[1], 0.8, epsilon = 1e-12);
  }

  #[test]
  fn strongly_correlated_pair_shorts_the_riskier_leg() {
    let cov = array![[0.01, 0.018], [0.018, 0.04]];
    let w = min_variance_weights(&cov).unwrap();

    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    assert!(w[1] < 0.0);
    assert!(w[0] > 1.0);
  }

  #[test]
  fn weights_minimize_variance_against_perturbations() {
    let cov = array![[0.04, 0.01, 0.0], [0.01, 0.09, 0.02], [0.0, 0.02, 0.16]];
    let w = min_variance_weights(&cov).unwrap();
    let best = portfolio_variance(&w, &cov);

    for (i, j) in [(0, 1), (1, 2), (0, 2)] {
      let mut shifted = w.clone();
      shifted[i] += 0.01;
      shifted[j] -= 0.01;
      assert!(portfolio_variance(&shifted, &cov) > best);
    }
  }

  #[test]
  fn five_point_pair_sums_to_one_and_is_deterministic() {
    let prices = vec![
      ("bitcoin".to_string(), vec![100.0, 105.0, 103.0, 108.0, 107.5]),
      ("ethereum".to_string(), vec![10.0, 10.5, 10.2, 10.1, 10.9]),
    ];
    let returns = compute_returns(&prices).unwrap();

    let first = optimize(&returns).unwrap();
    let second = optimize(&returns).unwrap();

    assert_eq!(first, second);
    assert_abs_diff_eq!(first.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
  }

  #[test]
  fn three_point_pair_has_rank_one_covariance() {
    // two returns per asset demean to ±d, so Σ = 2ddᵗ whatever the prices
    let prices = named(&[
      ("bitcoin", &[100.0, 105.0, 103.0]),
      ("ethereum", &[10.0, 10.5, 10.2]),
    ]);
    let returns = compute_returns(&prices).unwrap();

    assert!(matches!(
      optimize(&returns),
      Err(Error::SingularCovariance { .. })
    ));
  }

  #[test]
  fn tiny_return_scale_is_not_mistaken_for_singularity() {
    let prices = named(&[
      ("volatile", &[100.0, 130.0, 90.0, 125.0, 80.0, 120.0]),
      ("stable", &[1.0, 1.0, 1.0000001, 1.0, 1.0000002, 1.0000001]),
    ]);
    let returns = compute_returns(&prices).unwrap();

    let w = optimize(&returns).unwrap();
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    assert!(w[1] > 0.99, "weights {w:?}");
  }

  #[test]
  fn rescaling_one_asset_keeps_the_pair_invertible() {
    let base = array![
      [0.010, 0.004],
      [-0.020, -0.001],
      [0.015, 0.012],
      [-0.005, -0.009],
      [0.020, 0.003],
    ];

    for factor in [1.0, 1e-4, 1e-8, 1e-12] {
      let mut scaled = base.clone();
      scaled.column_mut(1).mapv_inplace(|r| r * factor);
      let w = optimize(&matrix(scaled)).unwrap();
      assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
      assert!(w.iter().all(|v| v.is_finite()));
    }
  }

  #[test]
  fn nearly_collinear_pair_lands_on_the_right_side_of_the_tolerance() {
    let a = [0.010, -0.020, 0.015, -0.005, 0.020];
    let noise = [1.0, -1.0, -1.0, 1.0, 0.0];
    let pair = |eps: f64| {
      let mut values = Array2::<f64>::zeros((a.len(), 2));
      for t in 0..a.len() {
        values[[t, 0]] = a[t];
        values[[t, 1]] = a[t] + eps * noise[t];
      }
      matrix(values)
    };

    // 1 - ρ² ≈ (1e-9 / 1e-2)², far below the pivot tolerance
    assert!(matches!(
      optimize(&pair(1e-9)),
      Err(Error::SingularCovariance { .. })
    ));

    // 1 - ρ² ≈ 1e-2, comfortably invertible
    let w = optimize(&pair(1e-3)).unwrap();
    assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
  }

  #[test]
  fn zero_variance_asset_is_singular() {
    let returns = matrix(array![[0.01, 0.0], [0.03, 0.0], [-0.02, 0.0]]);
    assert!(matches!(
      optimize(&returns),
      Err(Error::SingularCovariance { .. })
    ));
  }

  #[test]
  fn random_portfolios_always_sum_to_one() {
    let mut seed = 0;
    for assets in [2, 3, 5, 8, 13] {
      for points in [30, 90, 365] {
        seed += 1;
        let returns = compute_returns(&random_prices(assets, points, seed)).unwrap();
        let w = optimize(&returns).unwrap();

        assert_eq!(w.len(), assets);
        assert!(w.iter().all(|v| v.is_finite()), "{assets}x{points}: {w:?}");
        assert_abs_diff_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-8);
      }
    }
  }

  #[test]
  fn identical_series_are_singular_not_nan() {
    let prices = vec![
      ("a".to_string(), vec![100.0, 105.0, 103.0, 110.0]),
      ("b".to_string(), vec![100.0, 105.0, 103.0, 110.0]),
    ];
    let returns = compute_returns(&prices).unwrap();

    let err = optimize(&returns).unwrap_err();
    assert!(matches!(err, Error::SingularCovariance { .. }));
  }

  #[test]
  fn scaled_copy_of_a_series_is_singular() {
    let prices = vec![
      ("a".to_string(), vec![100.0, 105.0, 103.0, 110.0]),
      ("b".to_string(), vec![1.0, 1.05, 1.03, 1.10]),
    ];
    let returns = compute_returns(&prices).unwrap();

    assert!(matches!(
      optimize(&returns),
      Err(Error::SingularCovariance { .. })
    ));
  }

  #[test]
  fn more_assets_than_observations_is_singular() {
    let returns = matrix(array![[0.01, 0.02, -0.01], [0.03, -0.02, 0.02]]);
    assert!(matches!(
      optimize(&returns),
      Err(Error::SingularCovariance { .. })
    ));
  }

  #[test]
  fn empty_and_single_row_matrices_fail() {
    let empty = matrix(Array2::zeros((0, 2)));
    assert!(matches!(optimize(&empty), Err(Error::EmptyReturns)));

    let one_row = matrix(array![[0.01, 0.02]]);
    assert!(matches!(
      optimize(&one_row),
      Err(Error::SingularCovariance { .. })
    ));
  }

  #[test]
  fn single_asset_gets_full_weight() {
    let returns = matrix(array![[0.01], [0.03], [-0.02]]);
    let w = optimize(&returns).unwrap();
    assert_relative_eq!(w[0], 1.0, epsilon = 1e-12);
  }
}
