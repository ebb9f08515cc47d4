//! Classical bias and statistical error estimates
//!
//! The bias is read off the boundary of the level set: the mixed differences
//! there are the leading terms of the truncated remainder.

use mimc_core::{Error, LevelStatistics, Result};
use mimc_levels::boundary_mask;
use tracing::debug;

/// Boundary-based bias estimator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassicalEstimator {
    conservative_boundary: bool,
}

impl ClassicalEstimator {
    /// `conservative_boundary` sums absolute boundary means instead of taking
    /// the absolute value of their sum
    pub fn new(conservative_boundary: bool) -> Self {
        Self {
            conservative_boundary,
        }
    }

    /// Bias estimate from the boundary levels of `stats`
    ///
    /// Infinite while every level is on the boundary, which includes the
    /// single-level and empty cases.
    pub fn bias(&self, stats: &LevelStatistics) -> Result<f64> {
        let mask = boundary_mask(stats.levels());
        if mask.iter().all(|&on_boundary| on_boundary) {
            return Ok(f64::INFINITY);
        }

        let means = stats.select_mask(&mask)?.mean()?;
        let bias = if self.conservative_boundary {
            means.iter().map(|m| m.abs()).sum()
        } else {
            means.iter().sum::<f64>().abs()
        };
        debug!(bias, boundary = means.len(), "classical bias");
        Ok(bias)
    }

    /// Per-level sample variances
    pub fn variances(&self, stats: &LevelStatistics) -> Result<Vec<f64>> {
        stats.variance()
    }
}

/// Statistical error `Ca * sqrt(sum V_l / M_l)`
///
/// A level without samples contributes nothing when its variance is zero and
/// makes the error infinite otherwise.
pub fn statistical_error(confidence: f64, variances: &[f64], counts: &[u64]) -> Result<f64> {
    if variances.len() != counts.len() {
        return Err(Error::size_mismatch(counts.len(), variances.len(), "per-level variances"));
    }
    let mut total = 0.0;
    for (&v, &m) in variances.iter().zip(counts) {
        let v = v.max(0.0);
        if m > 0 {
            total += v / m as f64;
        } else if v > 0.0 {
            return Ok(f64::INFINITY);
        }
    }
    Ok(confidence * total.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mimc_core::LevelIndex;

    fn one_dim_stats(means: &[f64]) -> LevelStatistics {
        let mut stats = LevelStatistics::new(1);
        let levels = (0..means.len() as u32).map(LevelIndex::scalar).collect();
        stats.add_levels(levels).unwrap();
        let sums: Vec<[f64; 2]> = means.iter().map(|&m| [10.0 * m, 10.0 * (m * m + 1.0)]).collect();
        stats
            .add_samples(&sums, &vec![10; means.len()], &vec![1.0; means.len()])
            .unwrap();
        stats
    }

    #[test]
    fn test_single_level_bias_is_infinite() {
        let est = ClassicalEstimator::default();
        assert!(est.bias(&one_dim_stats(&[1.0])).unwrap().is_infinite());
        assert!(est.bias(&LevelStatistics::new(1)).unwrap().is_infinite());
    }

    #[test]
    fn test_bias_is_last_level_mean_in_one_dimension() {
        let est = ClassicalEstimator::default();
        let bias = est.bias(&one_dim_stats(&[1.0, 0.5, -0.25])).unwrap();
        assert_relative_eq!(bias, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_conservative_boundary() {
        let mut stats = LevelStatistics::new(2);
        stats
            .add_levels(vec![
                LevelIndex::new(vec![0, 0]),
                LevelIndex::new(vec![0, 1]),
                LevelIndex::new(vec![1, 0]),
            ])
            .unwrap();
        stats
            .add_samples(&[[10.0, 20.0], [3.0, 9.0], [-2.0, 9.0]], &[10, 10, 10], &[1.0; 3])
            .unwrap();

        let plain = ClassicalEstimator::new(false).bias(&stats).unwrap();
        let conservative = ClassicalEstimator::new(true).bias(&stats).unwrap();
        assert_relative_eq!(plain, 0.1, epsilon = 1e-12);
        assert_relative_eq!(conservative, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_bias_requires_boundary_samples() {
        let mut stats = LevelStatistics::new(1);
        stats
            .add_levels(vec![LevelIndex::scalar(0), LevelIndex::scalar(1)])
            .unwrap();
        assert!(matches!(
            ClassicalEstimator::default().bias(&stats),
            Err(Error::Domain(_))
        ));
    }

    #[test]
    fn test_statistical_error() {
        let err = statistical_error(2.0, &[4.0, 1.0], &[16, 4]).unwrap();
        assert_relative_eq!(err, 2.0 * 0.5f64.sqrt(), epsilon = 1e-12);

        assert_eq!(statistical_error(2.0, &[4.0, 0.0], &[16, 0]).unwrap(), 1.0);
        assert!(statistical_error(2.0, &[4.0, 1.0], &[16, 0]).unwrap().is_infinite());
        assert!(statistical_error(2.0, &[4.0], &[16, 0]).is_err());
    }
}
