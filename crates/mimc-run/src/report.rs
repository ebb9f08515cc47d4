//! Run reports and serializable summaries

use crate::run::MimcRun;
use mimc_core::LevelIndex;
use mimc_estimate::BayesianFit;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Statistics of one level in a [`RunSummary`]
///
/// Values are `None` for levels without samples. `variance` is the
/// posterior estimate for Bayesian runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub level: LevelIndex,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub samples: u64,
    pub average_time: Option<f64>,
}

/// Snapshot of a run handed to persistence layers
///
/// Non-finite estimates are stored as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub elapsed: f64,
    pub estimate: Option<f64>,
    pub bias: Option<f64>,
    pub stat_error: Option<f64>,
    pub theta: f64,
    pub fit: Option<BayesianFit>,
    pub levels: Vec<LevelSummary>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl MimcRun {
    /// Summarize the active store and current estimates
    ///
    /// Level variances are the posterior ones once a Bayesian fit exists.
    pub fn summary(&self) -> RunSummary {
        let stats = self.active();
        let posterior = self.fit().and_then(|_| self.variances().ok());
        let levels: Vec<LevelSummary> = stats
            .levels()
            .iter()
            .enumerate()
            .map(|(i, level)| {
                let m = stats.counts()[i];
                let [s1, s2] = stats.power_sums()[i];
                let per_sample = |x: f64| (m > 0).then(|| x / m as f64);
                let mean = per_sample(s1);
                let variance = match &posterior {
                    Some(v) => v.get(i).copied(),
                    None => mean.zip(per_sample(s2)).map(|(m1, m2)| m2 - m1 * m1),
                };
                LevelSummary {
                    level: level.clone(),
                    mean,
                    variance,
                    samples: m,
                    average_time: per_sample(stats.times()[i]),
                }
            })
            .collect();

        let estimate = levels
            .iter()
            .map(|l| l.mean)
            .sum::<Option<f64>>()
            .filter(|_| !levels.is_empty());

        RunSummary {
            run_id: self.id(),
            elapsed: self.elapsed(),
            estimate,
            bias: finite(self.bias()),
            stat_error: finite(self.statistical_error()),
            theta: self.theta(),
            fit: self.fit(),
            levels,
        }
    }
}

impl fmt::Display for MimcRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        let show = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |x| format!("{x:.6e}"));

        writeln!(f, "Run {}", summary.run_id)?;
        writeln!(f, "Time:              {:.3}s", summary.elapsed)?;
        writeln!(f, "Estimate:          {}", show(summary.estimate))?;
        writeln!(f, "Bias:              {:.6e}", self.bias())?;
        writeln!(f, "Statistical error: {:.6e}", self.statistical_error())?;
        writeln!(f, "Theta:             {:.3}", summary.theta)?;
        if let Some(fit) = summary.fit {
            writeln!(f, "Fit:               W={:.6e} S={:.6e}", fit.weak_constant, fit.strong_constant)?;
        }
        writeln!(
            f,
            "{:<12} | {:>13} | {:>13} | {:>10} | {:>13} | {:>8}",
            "Level", "E", "V", "M", "Time", "Var%"
        )?;
        for level in &summary.levels {
            // Relative standard deviation of the level difference
            let var_pct = level
                .mean
                .zip(level.variance)
                .map(|(e, v)| 100.0 * v.max(0.0).sqrt() / e.abs())
                .filter(|p| p.is_finite());
            writeln!(
                f,
                "{:<12} | {:>13} | {:>13} | {:>10} | {:>13} | {:>8}",
                level.level.to_string(),
                show(level.mean),
                show(level.variance),
                level.samples,
                show(level.average_time),
                var_pct.map_or_else(|| "-".to_string(), |p| format!("{p:.2}")),
            )?;
        }
        Ok(())
    }
}
