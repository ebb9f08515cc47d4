//! Sampler collaborator

use mimc_levels::MixedDifference;

/// Aggregated result of one sampler call
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    /// `sum(dQ^k)` for every requested moment `k`, in request order
    pub power_sums: Vec<f64>,
    /// Total compute time in seconds
    pub elapsed: f64,
}

impl SampleBatch {
    pub fn new(power_sums: Vec<f64>, elapsed: f64) -> Self {
        Self { power_sums, elapsed }
    }
}

/// Draws samples of a mixed difference
///
/// Results of disjoint calls must be additive: two batches of `a` and `b`
/// samples summed must be distributed like one batch of `a + b` samples.
/// Implementations are free to parallelize internally.
pub trait Sampler {
    /// Draw `count` samples of `sum(corner.sign * Q(corner.level))` and return
    /// the power sums for each exponent in `moments`
    fn sample(
        &mut self,
        moments: &[u32],
        difference: &MixedDifference,
        count: u64,
    ) -> anyhow::Result<SampleBatch>;
}

impl<F> Sampler for F
where
    F: FnMut(&[u32], &MixedDifference, u64) -> anyhow::Result<SampleBatch>,
{
    fn sample(
        &mut self,
        moments: &[u32],
        difference: &MixedDifference,
        count: u64,
    ) -> anyhow::Result<SampleBatch> {
        self(moments, difference, count)
    }
}
