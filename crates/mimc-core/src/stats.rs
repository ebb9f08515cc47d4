//! Per-level statistics store
//!
//! One row per level holds the sample count, the raw power sums of the first
//! and second moment and the accumulated compute time. Rows grow only through
//! [`LevelStatistics::add_levels`] and accumulate only through
//! [`LevelStatistics::add_samples`]; every derived statistic is recomputed on
//! demand.

use crate::error::{Error, Result};
use crate::level::{LevelIndex, LevelSet};

/// Number of raw moments tracked per level
pub const MOMENTS: usize = 2;

/// Raw power sums `[sum(x), sum(x^2)]` of one level
pub type PowerSums = [f64; MOMENTS];

/// Append-only accumulators for every level of a level set
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStatistics {
    levels: LevelSet,
    power_sums: Vec<PowerSums>,
    counts: Vec<u64>,
    times: Vec<f64>,
}

impl LevelStatistics {
    /// Create an empty store for levels of dimension `dim`
    pub fn new(dim: usize) -> Self {
        Self {
            levels: LevelSet::new(dim),
            power_sums: Vec::new(),
            counts: Vec::new(),
            times: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.levels.dim()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn power_sums(&self) -> &[PowerSums] {
        &self.power_sums
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Append new levels with zeroed rows and return the previous level count
    pub fn add_levels(&mut self, new_levels: Vec<LevelIndex>) -> Result<usize> {
        let previous = self.levels.extend(new_levels)?;
        let len = self.levels.len();
        self.power_sums.resize(len, [0.0; MOMENTS]);
        self.counts.resize(len, 0);
        self.times.resize(len, 0.0);
        Ok(previous)
    }

    /// Accumulate new samples into every row
    ///
    /// All three arguments must have exactly one entry per level. Shapes are
    /// checked before any row is touched.
    pub fn add_samples(
        &mut self,
        power_sums: &[PowerSums],
        counts: &[u64],
        times: &[f64],
    ) -> Result<()> {
        let len = self.len();
        if power_sums.len() != len {
            return Err(Error::size_mismatch(len, power_sums.len(), "power sums"));
        }
        if counts.len() != len {
            return Err(Error::size_mismatch(len, counts.len(), "sample counts"));
        }
        if times.len() != len {
            return Err(Error::size_mismatch(len, times.len(), "elapsed times"));
        }

        for (row, new) in self.power_sums.iter_mut().zip(power_sums) {
            for (acc, value) in row.iter_mut().zip(new) {
                *acc += value;
            }
        }
        for (acc, &m) in self.counts.iter_mut().zip(counts) {
            *acc += m;
        }
        for (acc, &t) in self.times.iter_mut().zip(times) {
            *acc += t;
        }
        Ok(())
    }

    /// Zero every row, keeping the level set
    pub fn reset_accumulators(&mut self) {
        self.power_sums.iter_mut().for_each(|row| *row = [0.0; MOMENTS]);
        self.counts.iter_mut().for_each(|m| *m = 0);
        self.times.iter_mut().for_each(|t| *t = 0.0);
    }

    /// Copy of the rows at `positions`, in the given order
    pub fn select(&self, positions: &[usize]) -> Result<Self> {
        let mut selected = Self::new(self.dim());
        let mut levels = Vec::with_capacity(positions.len());
        for &p in positions {
            let level = self.levels.get(p).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "level position {p} out of range for {} levels",
                    self.len()
                ))
            })?;
            levels.push(level.clone());
        }
        if levels.is_empty() {
            return Ok(selected);
        }
        selected.add_levels(levels)?;
        for (row, &p) in positions.iter().enumerate() {
            selected.power_sums[row] = self.power_sums[p];
            selected.counts[row] = self.counts[p];
            selected.times[row] = self.times[p];
        }
        Ok(selected)
    }

    /// Copy of the rows whose mask entry is `true`
    pub fn select_mask(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(Error::size_mismatch(self.len(), mask.len(), "selection mask"));
        }
        let positions: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &keep)| keep.then_some(i))
            .collect();
        self.select(&positions)
    }

    /// Copy of the rows from `start` to the end
    pub fn tail(&self, start: usize) -> Result<Self> {
        let positions: Vec<usize> = (start.min(self.len())..self.len()).collect();
        self.select(&positions)
    }

    fn per_sample(&self, values: impl Iterator<Item = f64>, statistic: &str) -> Result<Vec<f64>> {
        values
            .zip(&self.counts)
            .zip(self.levels.iter())
            .map(|((value, &m), level)| {
                if m == 0 {
                    Err(Error::zero_samples(level, statistic))
                } else {
                    Ok(value / m as f64)
                }
            })
            .collect()
    }

    /// Per-level mean, `sum(x) / M`
    pub fn mean(&self) -> Result<Vec<f64>> {
        self.moment(1)
    }

    /// Per-level raw moment `sum(x^k) / M` for `k` in `1..=MOMENTS`
    pub fn moment(&self, k: usize) -> Result<Vec<f64>> {
        if k == 0 || k > MOMENTS {
            return Err(Error::InvalidInput(format!(
                "moment {k} is not tracked (expected 1..={MOMENTS})"
            )));
        }
        self.per_sample(self.power_sums.iter().map(|row| row[k - 1]), "Moment")
    }

    /// Per-level variance, second raw moment minus squared mean
    ///
    /// Fails with a domain error if any row has no samples.
    pub fn variance(&self) -> Result<Vec<f64>> {
        let m1 = self.per_sample(self.power_sums.iter().map(|row| row[0]), "Variance")?;
        let m2 = self.per_sample(self.power_sums.iter().map(|row| row[1]), "Variance")?;
        Ok(m2.iter().zip(&m1).map(|(s, m)| s - m * m).collect())
    }

    /// Per-level average compute time per sample
    pub fn average_time(&self) -> Result<Vec<f64>> {
        self.per_sample(self.times.iter().copied(), "Average time")
    }

    /// Telescoping-sum estimate, the sum of all per-level means
    pub fn estimate(&self) -> Result<f64> {
        Ok(self.mean()?.iter().sum())
    }

    /// Total accumulated compute time
    pub fn total_time(&self) -> f64 {
        self.times.iter().sum()
    }

    /// Total number of samples over all levels
    pub fn total_samples(&self) -> u64 {
        self.counts.iter().sum()
    }
}
