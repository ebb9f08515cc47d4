//! # Geometric Brownian motion sampler
//!
//! A reference [`Sampler`] for `dS = mu S dt + sigma S dW` discretized with
//! forward Euler. Levels have a single axis, the time step: level `l` uses
//! `base_steps * 2^l` steps. Both corners of a level difference share one
//! Brownian path, sampled on the finest grid and summed onto the coarser one,
//! so level differences have small variance. Multi-index levels are rejected.
//!
//! Samples are drawn in fixed-size chunks, each with its own ChaCha stream
//! derived from the sampler seed, the call index and the chunk index. Results
//! do not depend on whether the `parallel` feature is enabled.

use mimc_core::{Error, Result};
use mimc_levels::MixedDifference;
use mimc_run::{SampleBatch, Sampler};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use std::time::Instant;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Samples per independently seeded chunk
const CHUNK_SIZE: u64 = 4096;

/// Quantity of interest computed from the terminal value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Payoff {
    /// `S(T)`
    Terminal,
    /// `max(S(T) - strike, 0)`
    Call { strike: f64 },
}

impl Payoff {
    fn apply(&self, terminal: f64) -> f64 {
        match *self {
            Payoff::Terminal => terminal,
            Payoff::Call { strike } => (terminal - strike).max(0.0),
        }
    }
}

/// Model and discretization parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GbmParams {
    pub s0: f64,
    pub mu: f64,
    pub sigma: f64,
    pub maturity: f64,
    /// Time steps on level 0
    pub base_steps: u64,
    pub payoff: Payoff,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            s0: 1.0,
            mu: 0.05,
            sigma: 0.2,
            maturity: 1.0,
            base_steps: 4,
            payoff: Payoff::Terminal,
        }
    }
}

impl GbmParams {
    pub fn with_payoff(mut self, payoff: Payoff) -> Self {
        self.payoff = payoff;
        self
    }

    /// Exact expectation of the quantity of interest, when known in closed form
    pub fn exact_mean(&self) -> Option<f64> {
        match self.payoff {
            Payoff::Terminal => Some(self.s0 * (self.mu * self.maturity).exp()),
            Payoff::Call { .. } => None,
        }
    }

    /// Expectation of the Euler approximation of `S(T)` with `steps` steps
    pub fn euler_mean(&self, steps: u64) -> f64 {
        let dt = self.maturity / steps as f64;
        self.s0 * (1.0 + self.mu * dt).powi(steps as i32)
    }

    fn validate(&self) -> Result<()> {
        let finite = [self.s0, self.mu, self.sigma, self.maturity]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.sigma < 0.0 || !(self.maturity > 0.0) || self.base_steps == 0 {
            return Err(Error::config(format!("invalid GBM parameters: {self:?}")));
        }
        Ok(())
    }

    fn steps(&self, max_component: u32) -> anyhow::Result<u64> {
        1u64.checked_shl(max_component)
            .and_then(|factor| factor.checked_mul(self.base_steps))
            .ok_or_else(|| anyhow::anyhow!("level {max_component} needs too many time steps"))
    }
}

/// Euler-Maruyama sampler for geometric Brownian motion
#[derive(Debug, Clone)]
pub struct GbmSampler {
    params: GbmParams,
    seed: u64,
    calls: u64,
}

impl GbmSampler {
    pub fn new(params: GbmParams, seed: u64) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            seed,
            calls: 0,
        })
    }

    pub fn params(&self) -> &GbmParams {
        &self.params
    }

    /// Number of completed `sample` calls
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn chunk_seed(&self, chunk: u64) -> u64 {
        self.seed
            .wrapping_add(self.calls.wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .wrapping_add(chunk)
    }
}

/// Time-step count and sign of each corner
struct Grid {
    corners: Vec<(u64, f64)>,
    finest: u64,
}

fn simulate_chunk(params: &GbmParams, grid: &Grid, moments: &[u32], count: u64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let fine_dt = params.maturity / grid.finest as f64;
    let fine_sd = fine_dt.sqrt();
    let mut increments = vec![0.0; grid.finest as usize];
    let mut sums = vec![0.0; moments.len()];

    for _ in 0..count {
        for dw in increments.iter_mut() {
            let z: f64 = StandardNormal.sample(&mut rng);
            *dw = fine_sd * z;
        }

        let mut delta = 0.0;
        for &(steps, sign) in &grid.corners {
            let ratio = (grid.finest / steps) as usize;
            let dt = params.maturity / steps as f64;
            let mut s = params.s0;
            for block in increments.chunks(ratio) {
                let dw: f64 = block.iter().sum();
                s *= 1.0 + params.mu * dt + params.sigma * dw;
            }
            delta += sign * params.payoff.apply(s);
        }

        for (acc, &k) in sums.iter_mut().zip(moments) {
            *acc += delta.powi(k as i32);
        }
    }
    sums
}

impl Sampler for GbmSampler {
    fn sample(
        &mut self,
        moments: &[u32],
        difference: &MixedDifference,
        count: u64,
    ) -> anyhow::Result<SampleBatch> {
        if moments.iter().any(|&k| k == 0) {
            anyhow::bail!("moments must be positive, got {moments:?}");
        }
        if difference.level().dim() != 1 {
            anyhow::bail!(
                "GBM levels have one time-step axis, got level {}",
                difference.level()
            );
        }
        let corners = difference
            .corners()
            .iter()
            .map(|c| Ok((self.params.steps(c.level.max_component())?, c.weight())))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let finest = corners.iter().map(|(n, _)| *n).max().unwrap_or(self.params.base_steps);
        let grid = Grid { corners, finest };

        let start = Instant::now();
        let chunks: Vec<(u64, u64)> = (0..count.div_ceil(CHUNK_SIZE))
            .map(|i| (self.chunk_seed(i), CHUNK_SIZE.min(count - i * CHUNK_SIZE)))
            .collect();

        #[cfg(feature = "parallel")]
        let partial: Vec<Vec<f64>> = chunks
            .par_iter()
            .map(|&(seed, n)| simulate_chunk(&self.params, &grid, moments, n, seed))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let partial: Vec<Vec<f64>> = chunks
            .iter()
            .map(|&(seed, n)| simulate_chunk(&self.params, &grid, moments, n, seed))
            .collect();

        let mut power_sums = vec![0.0; moments.len()];
        for sums in &partial {
            for (acc, s) in power_sums.iter_mut().zip(sums) {
                *acc += s;
            }
        }
        let elapsed = start.elapsed().as_secs_f64();
        self.calls += 1;

        debug!(level = %difference.level(), count, finest, elapsed, "simulated GBM paths");
        Ok(SampleBatch::new(power_sums, elapsed))
    }
}
