//! Tolerance sequences
//!
//! A run walks a geometric sequence of tolerances from a coarse starting value
//! down to the requested one, followed by a few tighter verification entries.

use mimc_core::{Error, Result};

/// Parameters of a geometric tolerance sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceSchedule {
    /// Tolerance that ends the run
    pub final_tol: f64,
    /// Approximate tolerance of the first iteration
    pub start_tol: f64,
    /// Number of entries below `final_tol`
    pub extra_iterations: usize,
    /// Ratio between consecutive entries above `final_tol`
    pub r1: f64,
    /// Ratio between consecutive entries below `final_tol`
    pub r2: f64,
}

impl ToleranceSchedule {
    pub fn build(&self) -> Result<Vec<f64>> {
        build_sequence(
            self.final_tol,
            self.start_tol,
            self.extra_iterations,
            self.r1,
            self.r2,
        )
    }
}

/// Build `final*r1^n, ..., final*r1, final, final/r2, ..., final/r2^extra`
///
/// `n = floor(ln(start/final) / ln(r1))`, so the first entry never exceeds
/// `start_tol`. A starting tolerance below the final one yields `[final, ...]`.
pub fn build_sequence(
    final_tol: f64,
    start_tol: f64,
    extra_iterations: usize,
    r1: f64,
    r2: f64,
) -> Result<Vec<f64>> {
    if !(final_tol > 0.0 && final_tol.is_finite()) {
        return Err(Error::config(format!("final tolerance must be positive, got {final_tol}")));
    }
    if !(start_tol > 0.0 && start_tol.is_finite()) {
        return Err(Error::config(format!("start tolerance must be positive, got {start_tol}")));
    }
    if !(r1 > 1.0) || !(r2 > 1.0) {
        return Err(Error::config(format!(
            "tolerance ratios must exceed 1, got r1={r1}, r2={r2}"
        )));
    }

    // Guard keeps ratios that are integral up to rounding from losing a step
    let steps = (-(final_tol / start_tol).ln() / r1.ln() + 1e-10).floor().max(0.0) as i32;

    let mut tols: Vec<f64> = (0..=steps).rev().map(|k| final_tol * r1.powi(k)).collect();
    tols.extend((1..=extra_iterations as i32).map(|k| final_tol * r2.powi(-k)));
    Ok(tols)
}

/// Reject sequences that increase anywhere
pub fn ensure_non_increasing(tols: &[f64]) -> Result<()> {
    if tols.is_empty() {
        return Err(Error::config("tolerance sequence is empty"));
    }
    if let Some(bad) = tols.iter().find(|t| !(**t > 0.0)) {
        return Err(Error::config(format!("tolerances must be positive, got {bad}")));
    }
    if let Some(pair) = tols.windows(2).find(|w| w[1] > w[0]) {
        return Err(Error::config(format!(
            "tolerances must be non-increasing, got {} followed by {}",
            pair[0], pair[1]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_sequence() {
        let tols = build_sequence(0.1, 1.0, 1, 2.0, 1.1).unwrap();
        assert_eq!(tols.len(), 5);
        assert_relative_eq!(tols[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(tols[3], 0.1);
        assert_relative_eq!(*tols.last().unwrap(), 0.1 / 1.1, epsilon = 1e-12);

        assert!(tols[0] < 1.0);
        assert!(ensure_non_increasing(&tols).is_ok());
        assert_eq!(tols.iter().filter(|&&t| t < 0.1).count(), 1);
    }

    #[test]
    fn test_integral_ratio_keeps_start() {
        let tols = build_sequence(0.1, 0.8, 0, 2.0, 1.1).unwrap();
        assert_eq!(tols.len(), 4);
        assert_relative_eq!(tols[0], 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_start_below_final() {
        let tols = build_sequence(0.1, 0.01, 2, 2.0, 1.1).unwrap();
        assert_eq!(tols.len(), 3);
        assert_eq!(tols[0], 0.1);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(build_sequence(0.0, 1.0, 0, 2.0, 1.1).is_err());
        assert!(build_sequence(0.1, 1.0, 0, 1.0, 1.1).is_err());
        assert!(build_sequence(0.1, 1.0, 0, 2.0, 0.9).is_err());
        assert!(build_sequence(0.1, f64::NAN, 0, 2.0, 1.1).is_err());
    }

    #[test]
    fn test_increasing_sequence_rejected() {
        assert!(ensure_non_increasing(&[0.4, 0.2, 0.2, 0.1]).is_ok());
        assert!(matches!(
            ensure_non_increasing(&[0.4, 0.1, 0.2]),
            Err(Error::Configuration(_))
        ));
        assert!(ensure_non_increasing(&[]).is_err());
        assert!(ensure_non_increasing(&[0.1, -0.1]).is_err());
    }
}
