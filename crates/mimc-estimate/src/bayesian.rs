//! Bayesian bias and variance model for one-dimensional hierarchies
//!
//! Level differences are modelled as
//!
//! ```text
//! E[dQ_l] ~ W * (h_l^w - h_{l-1}^w)
//! V[dQ_l] ~ S * (h_l^{s/2} - h_{l-1}^{s/2})^2
//! ```
//!
//! with known rates `w` and `s`. The constants `W` and `S` are fitted to the
//! cumulative samples of levels `1..=L`; the per-level variance is then the
//! posterior mean of a Normal-Inverse-Gamma model with prior weights `kappa0`
//! and `kappa1`.

use crate::allocation::SampleAllocator;
use crate::regression::weighted_least_squares;
use mimc_core::{Error, Hierarchy, LevelIndex, LevelStatistics, Result, WorkModel};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Fitted model constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BayesianFit {
    /// Weak-error constant `W`
    pub weak_constant: f64,
    /// Strong-error constant `S`
    pub strong_constant: f64,
}

/// Stores and step sizes the model reads from
#[derive(Clone, Copy)]
pub struct BayesianInputs<'a> {
    /// Samples drawn for the current tolerance
    pub active: &'a LevelStatistics,
    /// Samples drawn over the whole run
    pub cumulative: &'a LevelStatistics,
    pub hierarchy: &'a dyn Hierarchy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BayesianEstimator {
    weak_exponent: f64,
    strong_exponent: f64,
    kappa0: f64,
    kappa1: f64,
    fit_exponents: bool,
    fit: Option<BayesianFit>,
}

impl BayesianEstimator {
    /// Create an estimator with known weak and strong rates
    pub fn new(weak_exponent: f64, strong_exponent: f64) -> Result<Self> {
        if !weak_exponent.is_finite() || !strong_exponent.is_finite() {
            return Err(Error::config(format!(
                "Bayesian rates must be finite, got w={weak_exponent}, s={strong_exponent}"
            )));
        }
        Ok(Self {
            weak_exponent,
            strong_exponent,
            kappa0: 0.1,
            kappa1: 0.1,
            fit_exponents: false,
            fit: None,
        })
    }

    /// Set the prior weights of the weak and strong constants
    pub fn with_prior(mut self, kappa0: f64, kappa1: f64) -> Self {
        self.kappa0 = kappa0;
        self.kappa1 = kappa1;
        self
    }

    /// Request fitting of the rates together with the constants
    ///
    /// Not supported; parameter estimation fails when enabled.
    pub fn with_exponent_fitting(mut self, enabled: bool) -> Self {
        self.fit_exponents = enabled;
        self
    }

    pub fn weak_exponent(&self) -> f64 {
        self.weak_exponent
    }

    pub fn strong_exponent(&self) -> f64 {
        self.strong_exponent
    }

    /// Most recent fit, if any
    pub fn fit(&self) -> Option<BayesianFit> {
        self.fit
    }

    fn current_fit(&self) -> Result<BayesianFit> {
        self.fit.ok_or_else(|| {
            Error::Computation("Bayesian parameters have not been estimated".to_string())
        })
    }

    /// Fit `W` and `S` to the cumulative samples of levels `1..=L`
    ///
    /// Levels without samples are left out of both sums.
    #[instrument(skip(self, cumulative, hierarchy), fields(levels = cumulative.len()))]
    pub fn estimate_params(
        &mut self,
        cumulative: &LevelStatistics,
        hierarchy: &dyn Hierarchy,
    ) -> Result<BayesianFit> {
        if self.fit_exponents {
            return Err(Error::NotImplemented(
                "fitting the weak and strong rates".to_string(),
            ));
        }
        check_scalar_levels(cumulative)?;
        let max_level = max_level_of(cumulative.len())?;
        let h = steps(hierarchy, max_level)?;

        let mut x = Vec::new();
        let mut m1 = Vec::new();
        let mut m2 = Vec::new();
        let mut weights = Vec::new();
        let mut sl = Vec::new();
        let mut total_samples = 0.0;
        for l in 1..=max_level {
            let count = cumulative.counts()[l];
            if count == 0 {
                continue;
            }
            let m = count as f64;
            let [s1, s2] = cumulative.power_sums()[l];
            let strong = self.strong_weight(&h, l);
            x.push(self.weak_difference(&h, l));
            m1.push(s1 / m);
            m2.push(s2 / m);
            weights.push(m * strong);
            sl.push(strong);
            total_samples += m;
        }
        if x.is_empty() {
            return Err(Error::Domain(
                "Bayesian fit requires samples on at least one level above 0".to_string(),
            ));
        }

        let design = DMatrix::from_column_slice(x.len(), 1, &x);
        let weak = weighted_least_squares(&design, &m1, &weights)?[0];
        let strong = x
            .iter()
            .zip(&m1)
            .zip(&m2)
            .zip(&sl)
            .map(|(((wl, a), b), s)| s * (b - 2.0 * a * weak * wl + weak * weak * wl * wl))
            .sum::<f64>()
            / total_samples;

        if !weak.is_finite() || !strong.is_finite() {
            return Err(Error::non_finite("Bayesian model constants"));
        }

        let fit = BayesianFit {
            weak_constant: weak,
            strong_constant: strong,
        };
        debug!(w = weak, s = strong, "fitted Bayesian constants");
        self.fit = Some(fit);
        Ok(fit)
    }

    /// Bias estimate `|W| * h_L^w` at level `max_level`
    pub fn bias(&self, hierarchy: &dyn Hierarchy, max_level: usize) -> Result<f64> {
        let fit = self.current_fit()?;
        if max_level < 2 {
            return Err(Error::InsufficientLevels {
                expected: 2,
                actual: max_level,
            });
        }
        let h = steps(hierarchy, max_level)?;
        Ok(fit.weak_constant.abs() * h[max_level].powf(self.weak_exponent))
    }

    /// Posterior variance estimates for levels `0..=max_level`
    ///
    /// Level 0 uses the sample variance of the active store. Levels beyond the
    /// stored ones are zero.
    pub fn variances(&self, inputs: BayesianInputs<'_>, max_level: usize) -> Result<Vec<f64>> {
        let fit = self.current_fit()?;
        if max_level < 2 {
            return Err(Error::InsufficientLevels {
                expected: 2,
                actual: max_level,
            });
        }
        let h = steps(inputs.hierarchy, max_level)?;
        let cumulative = inputs.cumulative;

        let mut variances = Vec::with_capacity(max_level + 1);
        variances.push(inputs.active.select(&[0])?.variance()?[0]);
        for l in 1..=max_level {
            if l >= cumulative.len() {
                variances.push(0.0);
                continue;
            }
            let count = cumulative.counts()[l];
            let m = count as f64;
            let (m1, m2) = if count > 0 {
                let [s1, s2] = cumulative.power_sums()[l];
                (s1 / m, s2 / m)
            } else {
                (0.0, 0.0)
            };
            let mu = fit.weak_constant * self.weak_difference(&h, l);
            let precision = self.strong_weight(&h, l) / fit.strong_constant;
            let g3 = self.kappa1 * precision + m;
            let g4 = self.kappa1
                + 0.5 * m * (m2 - m1 * m1 + self.kappa0 * (m1 - mu).powi(2) / (self.kappa0 + m));
            variances.push(g4 / g3);
        }
        Ok(variances)
    }

    /// Level count in `[current, current + max_increment]` with the least
    /// total work for `tol`
    ///
    /// Ties keep the smaller count.
    pub fn optimal_level_count(
        &self,
        inputs: BayesianInputs<'_>,
        work_model: &dyn WorkModel,
        allocator: &SampleAllocator,
        tol: f64,
        max_increment: usize,
    ) -> Result<usize> {
        let current = inputs.active.len();
        let mut best = current;
        let mut best_work = f64::INFINITY;
        for count in current..=current + max_increment {
            let max_level = count.saturating_sub(1);
            let levels: Vec<LevelIndex> = (0..count as u32).map(LevelIndex::scalar).collect();
            let work = work_model.work(&levels);
            let bias = self.bias(inputs.hierarchy, max_level)?;
            let variances = self.variances(inputs, max_level)?;
            let allocation = allocator.theoretical_samples(tol, bias, &variances, &work)?;
            let total = allocation.total_work(&work);
            debug!(count, total, "candidate level count");
            if total < best_work {
                best = count;
                best_work = total;
            }
        }
        Ok(best)
    }

    fn weak_difference(&self, h: &[f64], l: usize) -> f64 {
        h[l].powf(self.weak_exponent) - h[l - 1].powf(self.weak_exponent)
    }

    fn strong_weight(&self, h: &[f64], l: usize) -> f64 {
        let half = self.strong_exponent / 2.0;
        (h[l].powf(half) - h[l - 1].powf(half)).powi(-2)
    }
}

fn max_level_of(len: usize) -> Result<usize> {
    let max_level = len.saturating_sub(1);
    if max_level < 2 {
        return Err(Error::InsufficientLevels {
            expected: 2,
            actual: max_level,
        });
    }
    Ok(max_level)
}

/// Step sizes of levels `0..=max_level`
fn steps(hierarchy: &dyn Hierarchy, max_level: usize) -> Result<Vec<f64>> {
    let levels: Vec<LevelIndex> = (0..=max_level as u32).map(LevelIndex::scalar).collect();
    let h = hierarchy.hierarchy(&levels);
    if h.len() != levels.len() {
        return Err(Error::size_mismatch(levels.len(), h.len(), "hierarchy values"));
    }
    if h.iter().any(|&v| !(v > 0.0 && v.is_finite())) {
        return Err(Error::Computation(format!(
            "hierarchy values must be finite and positive, got {h:?}"
        )));
    }
    Ok(h)
}

/// The model addresses rows by level, so row `l` must hold level `[l]`
fn check_scalar_levels(stats: &LevelStatistics) -> Result<()> {
    if stats.dim() != 1 {
        return Err(Error::config(format!(
            "Bayesian estimation supports one-dimensional levels only, got dimension {}",
            stats.dim()
        )));
    }
    for (position, level) in stats.levels().iter().enumerate() {
        if level.get(0) as usize != position {
            return Err(Error::InvalidInput(format!(
                "Bayesian estimation needs levels in order, found {level} at position {position}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use mimc_levels::{ExponentialWork, GeometricHierarchy};

    /// Store whose level `l` has mean `2^-l` and variance `4^-l`
    fn geometric_store(levels: u32, samples: u64) -> LevelStatistics {
        let mut stats = LevelStatistics::new(1);
        stats
            .add_levels((0..levels).map(LevelIndex::scalar).collect())
            .unwrap();
        let m = samples as f64;
        let sums: Vec<[f64; 2]> = (0..levels)
            .map(|l| {
                let mean = 0.5f64.powi(l as i32);
                let var = 0.25f64.powi(l as i32);
                [m * mean, m * (var + mean * mean)]
            })
            .collect();
        stats
            .add_samples(&sums, &vec![samples; levels as usize], &vec![1.0; levels as usize])
            .unwrap();
        stats
    }

    fn hierarchy() -> GeometricHierarchy {
        GeometricHierarchy::new(1.0, 0.5)
    }

    #[test]
    fn test_recovers_exact_weak_constant() {
        // With h_l = 2^-l and w = 1, W * (h_l - h_{l-1}) = -W * 2^-l
        let store = geometric_store(5, 100);
        let mut est = BayesianEstimator::new(1.0, 2.0).unwrap();
        let fit = est.estimate_params(&store, &hierarchy()).unwrap();
        assert_relative_eq!(fit.weak_constant, -1.0, epsilon = 1e-10);
        assert!(fit.strong_constant > 0.0);
        assert_eq!(est.fit(), Some(fit));
    }

    #[test]
    fn test_bias_scales_with_step() {
        let store = geometric_store(5, 100);
        let mut est = BayesianEstimator::new(1.0, 2.0).unwrap();
        est.estimate_params(&store, &hierarchy()).unwrap();
        assert_relative_eq!(est.bias(&hierarchy(), 4).unwrap(), 1.0 / 16.0, epsilon = 1e-10);
        assert_relative_eq!(est.bias(&hierarchy(), 6).unwrap(), 1.0 / 64.0, epsilon = 1e-10);
        assert!(matches!(
            est.bias(&hierarchy(), 1),
            Err(Error::InsufficientLevels { .. })
        ));
    }

    #[test]
    fn test_requires_three_levels() {
        let store = geometric_store(2, 10);
        let mut est = BayesianEstimator::new(1.0, 2.0).unwrap();
        assert!(matches!(
            est.estimate_params(&store, &hierarchy()),
            Err(Error::InsufficientLevels {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_exponent_fitting_not_implemented() {
        let store = geometric_store(4, 10);
        let mut est = BayesianEstimator::new(1.0, 2.0)
            .unwrap()
            .with_exponent_fitting(true);
        assert!(matches!(
            est.estimate_params(&store, &hierarchy()),
            Err(Error::NotImplemented(_))
        ));
    }

    #[test]
    fn test_variance_requires_fit() {
        let store = geometric_store(4, 10);
        let h = hierarchy();
        let est = BayesianEstimator::new(1.0, 2.0).unwrap();
        let inputs = BayesianInputs {
            active: &store,
            cumulative: &store,
            hierarchy: &h,
        };
        assert!(matches!(est.variances(inputs, 3), Err(Error::Computation(_))));
    }

    #[test]
    fn test_variances_padded_and_shrunk() {
        let store = geometric_store(4, 1000);
        let h = hierarchy();
        let mut est = BayesianEstimator::new(1.0, 2.0).unwrap();
        est.estimate_params(&store, &h).unwrap();
        let inputs = BayesianInputs {
            active: &store,
            cumulative: &store,
            hierarchy: &h,
        };

        let v = est.variances(inputs, 6).unwrap();
        assert_eq!(v.len(), 7);
        assert_relative_eq!(v[0], 1.0, epsilon = 1e-10);
        assert_eq!(&v[4..], &[0.0, 0.0, 0.0]);
        // The prior shrinks every estimate below the sample variance
        for l in 1..4 {
            assert!(v[l] > 0.0 && v[l] < 0.25f64.powi(l as i32), "level {l}: {}", v[l]);
        }
        assert!(v[1] > v[2] && v[2] > v[3]);
    }

    #[test]
    fn test_unsampled_level_falls_back_to_prior() {
        let mut store = geometric_store(3, 100);
        store.add_levels(vec![LevelIndex::scalar(3)]).unwrap();
        let h = hierarchy();
        let mut est = BayesianEstimator::new(1.0, 2.0).unwrap();
        let fit = est.estimate_params(&store, &h).unwrap();
        let inputs = BayesianInputs {
            active: &store,
            cumulative: &store,
            hierarchy: &h,
        };

        let v = est.variances(inputs, 3).unwrap();
        // With M = 0 the posterior is 1 / Lambda = S * (h_3 - h_2)^2
        let expected = fit.strong_constant * (0.125f64 - 0.25).powi(2);
        assert_relative_eq!(v[3], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_unordered_levels_rejected() {
        let mut store = LevelStatistics::new(1);
        store
            .add_levels(vec![
                LevelIndex::scalar(0),
                LevelIndex::scalar(2),
                LevelIndex::scalar(1),
            ])
            .unwrap();
        let mut est = BayesianEstimator::new(1.0, 2.0).unwrap();
        assert!(matches!(
            est.estimate_params(&store, &hierarchy()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_optimal_level_count_stays_in_window() {
        let store = geometric_store(4, 1000);
        let h = hierarchy();
        let mut est = BayesianEstimator::new(1.0, 2.0).unwrap();
        est.estimate_params(&store, &h).unwrap();
        let inputs = BayesianInputs {
            active: &store,
            cumulative: &store,
            hierarchy: &h,
        };
        let allocator = SampleAllocator::new(2.0, 0.5, false);
        let work = ExponentialWork::new(2f64.ln());

        let count = est
            .optimal_level_count(inputs, &work, &allocator, 0.01, 2)
            .unwrap();
        assert!((4..=6).contains(&count));
    }
}
