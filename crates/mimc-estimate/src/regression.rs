//! Weighted least squares on the normal equations

use mimc_core::{Error, Result};
use nalgebra::{DMatrix, DVector};

/// Solve `X^T W X b = X^T W y` for `b`
///
/// `design` holds one row per observation. Cholesky is tried first, SVD
/// handles rank-deficient systems.
pub fn weighted_least_squares(design: &DMatrix<f64>, y: &[f64], weights: &[f64]) -> Result<Vec<f64>> {
    let n = design.nrows();
    if y.len() != n {
        return Err(Error::size_mismatch(n, y.len(), "regression targets"));
    }
    if weights.len() != n {
        return Err(Error::size_mismatch(n, weights.len(), "regression weights"));
    }
    if n == 0 || design.ncols() == 0 {
        return Err(Error::InvalidInput("regression needs at least one observation".to_string()));
    }
    if weights.iter().any(|&w| !(w >= 0.0 && w.is_finite())) {
        return Err(Error::InvalidInput(
            "regression weights must be finite and non-negative".to_string(),
        ));
    }

    let weighted = DMatrix::from_fn(n, design.ncols(), |i, j| design[(i, j)] * weights[i]);
    let xtwx = weighted.transpose() * design;
    let xtwy = weighted.transpose() * DVector::from_column_slice(y);

    let coeffs = match xtwx.clone().cholesky() {
        Some(chol) => chol.solve(&xtwy),
        None => xtwx
            .svd(true, true)
            .solve(&xtwy, 1e-10)
            .map_err(|e| Error::Computation(format!("failed to solve regression system: {e}")))?,
    };

    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(Error::non_finite("regression coefficients"));
    }
    Ok(coeffs.as_slice().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line() {
        // y = 1 + 2x
        let x = [0.0, 1.0, 2.0, 3.0];
        let design = DMatrix::from_fn(4, 2, |i, j| if j == 0 { 1.0 } else { x[i] });
        let y: Vec<f64> = x.iter().map(|v| 1.0 + 2.0 * v).collect();
        let coeffs = weighted_least_squares(&design, &y, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_relative_eq!(coeffs[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(coeffs[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_weights_pull_towards_heavy_rows() {
        // Through the origin, slope is sum(w x y) / sum(w x^2)
        let design = DMatrix::from_column_slice(2, 1, &[1.0, 1.0]);
        let coeffs = weighted_least_squares(&design, &[1.0, 3.0], &[3.0, 1.0]).unwrap();
        assert_relative_eq!(coeffs[0], 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_errors() {
        let design = DMatrix::from_column_slice(2, 1, &[1.0, 1.0]);
        assert!(matches!(
            weighted_least_squares(&design, &[1.0], &[1.0, 1.0]),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(weighted_least_squares(&design, &[1.0, 1.0], &[1.0, -1.0]).is_err());
    }
}
