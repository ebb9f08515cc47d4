//! Optimal sample allocation
//!
//! Splits the tolerance into a bias part `(1 - theta) * TOL` and a statistical
//! part `theta * TOL`, then chooses per-level sample counts that meet the
//! statistical part at minimal total work:
//!
//! ```text
//! M_l = (theta * TOL / Ca)^-2 * sum_k sqrt(W_k V_k) * sqrt(V_l / W_l)
//! ```

use mimc_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Continuous per-level sample counts and the splitting parameter that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleAllocation {
    /// Unrounded optimal counts, one per level
    pub optimal: Vec<f64>,
    /// Splitting parameter in `(0, 1]`
    pub theta: f64,
}

impl SampleAllocation {
    /// Integer counts, the floor of the optimal ones
    pub fn counts(&self) -> Vec<u64> {
        self.optimal.iter().map(|&m| m.floor() as u64).collect()
    }

    /// Total work `sum(W_l * M_l)` of the continuous allocation
    pub fn total_work(&self, work: &[f64]) -> f64 {
        self.optimal.iter().zip(work).map(|(m, w)| m * w).sum()
    }
}

/// Computes [`SampleAllocation`]s for a confidence constant and splitting policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleAllocator {
    confidence: f64,
    default_theta: f64,
    constant_theta: bool,
}

impl SampleAllocator {
    pub fn new(confidence: f64, default_theta: f64, constant_theta: bool) -> Self {
        Self {
            confidence,
            default_theta,
            constant_theta,
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn default_theta(&self) -> f64 {
        self.default_theta
    }

    /// Splitting parameter for a tolerance and bias estimate
    ///
    /// Uses `1 - bias/tol` unless `theta` is held constant or that value is
    /// not in `(0, 1]`, in which case the default applies.
    pub fn theta(&self, tol: f64, bias: f64) -> f64 {
        if self.constant_theta {
            return self.default_theta;
        }
        let theta = 1.0 - bias / tol;
        if theta > 0.0 && theta <= 1.0 {
            theta
        } else {
            self.default_theta
        }
    }

    /// Optimal continuous sample counts for the given per-level variances and work
    ///
    /// Negative variance estimates are treated as zero.
    pub fn theoretical_samples(
        &self,
        tol: f64,
        bias: f64,
        variances: &[f64],
        work: &[f64],
    ) -> Result<SampleAllocation> {
        if variances.len() != work.len() {
            return Err(Error::size_mismatch(variances.len(), work.len(), "per-level work"));
        }
        if !(tol > 0.0 && tol.is_finite()) {
            return Err(Error::InvalidInput(format!("tolerance must be positive, got {tol}")));
        }
        if work.iter().any(|&w| !(w > 0.0 && w.is_finite())) {
            return Err(Error::InvalidInput(format!(
                "per-level work must be finite and positive, got {work:?}"
            )));
        }
        if variances.iter().any(|v| !v.is_finite()) {
            return Err(Error::non_finite("per-level variances"));
        }

        let theta = self.theta(tol, bias);
        let variances: Vec<f64> = variances.iter().map(|&v| v.max(0.0)).collect();
        let scale = (theta * tol / self.confidence).powi(-2);
        let root_cost: f64 = variances.iter().zip(work).map(|(v, w)| (v * w).sqrt()).sum();

        let optimal: Vec<f64> = variances
            .iter()
            .zip(work)
            .map(|(v, w)| scale * root_cost * (v / w).sqrt())
            .collect();

        debug!(tol, bias, theta, levels = optimal.len(), "allocated samples");
        Ok(SampleAllocation { optimal, theta })
    }
}
