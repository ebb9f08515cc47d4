//! Level-set growth policies
//!
//! A growth policy looks at the current level set and proposes the next batch
//! of levels together with the initial number of samples to draw on each.

use crate::enumerate::IndexSetEnumerator;
use mimc_core::{Error, LevelIndex, LevelSet, Result};
use std::collections::HashSet;
use tracing::debug;

/// New levels proposed by a growth policy
#[derive(Debug, Clone, PartialEq)]
pub struct LevelExtension {
    /// Levels absent from the current set, in insertion order
    pub levels: Vec<LevelIndex>,
    /// Initial sample request for each new level
    pub samples: Vec<u64>,
}

impl LevelExtension {
    fn with_baseline(levels: Vec<LevelIndex>, baseline: u64) -> Self {
        let samples = vec![baseline; levels.len()];
        Self { levels, samples }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Policy that decides which levels to add next
pub trait LevelGrowth {
    /// Propose levels to append to `levels`; never returns levels already present
    fn extend(&mut self, levels: &LevelSet) -> Result<LevelExtension>;

    /// Name of the policy for logging
    fn name(&self) -> &'static str;
}

/// Full tensor growth
///
/// Seeds an empty set with the zero level. Afterwards every level at the
/// current maximal degree is pushed to degree + 1 along every non-empty subset
/// of axes that lands exactly on degree + 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorGrowth {
    baseline: u64,
}

impl TensorGrowth {
    pub fn new(baseline: u64) -> Self {
        Self { baseline }
    }

    pub fn baseline(&self) -> u64 {
        self.baseline
    }
}

impl LevelGrowth for TensorGrowth {
    fn extend(&mut self, levels: &LevelSet) -> Result<LevelExtension> {
        let dim = levels.dim();
        let Some(degree) = levels.max_degree() else {
            return Ok(LevelExtension::with_baseline(
                vec![LevelIndex::zeros(dim)],
                self.baseline,
            ));
        };

        // Offsets are the non-zero corners of {0,1}^dim, in lexicographic order
        let offsets: Vec<Vec<u32>> = (1usize..(1 << dim))
            .map(|mask| {
                (0..dim)
                    .map(|axis| ((mask >> (dim - 1 - axis)) & 1) as u32)
                    .collect()
            })
            .collect();

        let mut seen = HashSet::new();
        let mut new_levels = Vec::new();
        for level in levels.iter().filter(|l| l.max_component() == degree) {
            for offset in &offsets {
                let candidate = level.offset_by(offset);
                if candidate.max_component() == degree + 1
                    && !levels.contains(&candidate)
                    && seen.insert(candidate.clone())
                {
                    new_levels.push(candidate);
                }
            }
        }

        debug!(degree = degree + 1, added = new_levels.len(), "tensor growth");
        Ok(LevelExtension::with_baseline(new_levels, self.baseline))
    }

    fn name(&self) -> &'static str {
        "tensor"
    }
}

/// Anisotropic total-degree growth
///
/// Raises the weighted degree threshold in steps of the smallest weight until
/// the admissible set contains at least one level not yet present, then
/// returns exactly those new levels.
#[derive(Debug, Clone)]
pub struct TotalDegreeGrowth<E> {
    weights: Vec<f64>,
    baseline: u64,
    enumerator: E,
    max_steps: usize,
}

impl<E: IndexSetEnumerator> TotalDegreeGrowth<E> {
    /// Create a total-degree policy; weights must be finite and strictly positive
    pub fn new(weights: Vec<f64>, baseline: u64, enumerator: E) -> Result<Self> {
        if weights.is_empty() || weights.iter().any(|&w| !(w > 0.0 && w.is_finite())) {
            return Err(Error::config(format!(
                "total-degree weights must be finite and positive, got {weights:?}"
            )));
        }
        Ok(Self {
            weights,
            baseline,
            enumerator,
            max_steps: 10_000,
        })
    }

    /// Cap on threshold increments before giving up on a single extension
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Largest weighted degree over the current levels, zero for an empty set
    fn current_degree(&self, levels: &LevelSet) -> f64 {
        levels
            .iter()
            .map(|l| {
                self.weights
                    .iter()
                    .zip(l.components())
                    .map(|(w, &c)| w * f64::from(c))
                    .sum::<f64>()
            })
            .fold(0.0, f64::max)
    }
}

impl<E: IndexSetEnumerator> LevelGrowth for TotalDegreeGrowth<E> {
    fn extend(&mut self, levels: &LevelSet) -> Result<LevelExtension> {
        if self.weights.len() != levels.dim() {
            return Err(Error::size_mismatch(
                levels.dim(),
                self.weights.len(),
                "total-degree weights",
            ));
        }
        let step = self.weights.iter().copied().fold(f64::INFINITY, f64::min);
        let mut threshold = self.current_degree(levels);

        for _ in 0..self.max_steps {
            threshold += step;
            let new_levels: Vec<LevelIndex> = self
                .enumerator
                .admissible_set(&self.weights, threshold)
                .into_iter()
                .filter(|l| !levels.contains(l))
                .collect();
            if !new_levels.is_empty() {
                debug!(threshold, added = new_levels.len(), "total-degree growth");
                return Ok(LevelExtension::with_baseline(new_levels, self.baseline));
            }
        }

        Err(Error::Computation(format!(
            "total-degree growth found no new level after {} threshold increments",
            self.max_steps
        )))
    }

    fn name(&self) -> &'static str {
        "total-degree"
    }
}
