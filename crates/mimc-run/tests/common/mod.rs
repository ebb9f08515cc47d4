//! Shared utilities for integration tests

#![allow(dead_code)]

use mimc_core::{Error, Result};
use mimc_levels::MixedDifference;
use mimc_run::{MimcRun, RunObserver, SampleBatch, Sampler};

pub use approx::assert_relative_eq;

/// Deterministic sampler whose level `l` has mean and variance `2^-|l|`
/// and costs `2^|l|` per sample, where `|l|` is the component sum
#[derive(Debug, Default)]
pub struct GeometricSampler {
    pub calls: usize,
    pub drawn: u64,
}

impl Sampler for GeometricSampler {
    fn sample(
        &mut self,
        moments: &[u32],
        difference: &MixedDifference,
        count: u64,
    ) -> anyhow::Result<SampleBatch> {
        let degree = difference.level().total() as i32;
        let value = 0.5f64.powi(degree);
        let m = count as f64;
        let power_sums = moments
            .iter()
            .map(|&k| match k {
                1 => Ok(m * value),
                2 => Ok(m * (value + value * value)),
                other => Err(anyhow::anyhow!("moment {other} not supported")),
            })
            .collect::<anyhow::Result<Vec<f64>>>()?;
        self.calls += 1;
        self.drawn += count;
        Ok(SampleBatch::new(power_sums, m * 2f64.powi(degree)))
    }
}

/// Observer that records everything it sees
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub iterations: Vec<(usize, f64, f64)>,
    pub failed: Option<String>,
    pub succeeded: bool,
}

impl RunObserver for RecordingObserver {
    fn on_iteration_done(&mut self, run: &MimcRun, iteration: usize, tol: f64) -> Result<()> {
        self.iterations.push((iteration, tol, run.total_error()));
        Ok(())
    }

    fn on_run_failed(&mut self, _run: &MimcRun, error: &Error) {
        self.failed = Some(error.to_string());
    }

    fn on_run_succeeded(&mut self, _run: &MimcRun) {
        self.succeeded = true;
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
