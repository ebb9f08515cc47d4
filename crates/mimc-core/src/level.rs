//! Level indices and insertion-ordered level sets
//!
//! A level index selects one discretization per refinement axis. A level set
//! stores levels in insertion order; the insertion position is the row used by
//! every parallel accumulator array, so levels are never removed.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Multi-index of non-negative refinement depths, one per axis
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelIndex(Vec<u32>);

impl LevelIndex {
    /// Create a level from its components
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    /// The all-zero level of dimension `dim`
    pub fn zeros(dim: usize) -> Self {
        Self(vec![0; dim])
    }

    /// A one-dimensional level
    pub fn scalar(level: u32) -> Self {
        Self(vec![level])
    }

    /// Number of axes
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Component along `axis`
    pub fn get(&self, axis: usize) -> u32 {
        self.0[axis]
    }

    /// Largest component, zero for a zero-dimensional level
    pub fn max_component(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Sum of all components
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| u64::from(c)).sum()
    }

    /// Number of strictly positive components
    pub fn active_axes(&self) -> usize {
        self.0.iter().filter(|&&c| c > 0).count()
    }

    /// Forward neighbour along `axis`
    pub fn incremented(&self, axis: usize) -> Self {
        let mut next = self.0.clone();
        next[axis] += 1;
        Self(next)
    }

    /// Component-wise sum with a non-negative offset
    pub fn offset_by(&self, offset: &[u32]) -> Self {
        Self(self.0.iter().zip(offset).map(|(&a, &b)| a + b).collect())
    }

    /// Component-wise difference, `None` if any component would go negative
    pub fn checked_sub(&self, offset: &[u32]) -> Option<Self> {
        self.0
            .iter()
            .zip(offset)
            .map(|(&a, &b)| a.checked_sub(b))
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl From<Vec<u32>> for LevelIndex {
    fn from(components: Vec<u32>) -> Self {
        Self(components)
    }
}

impl fmt::Display for LevelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "]")
    }
}

/// Ordered, duplicate-free, append-only set of levels of a fixed dimension
///
/// Levels live in an arena addressed by insertion position; a hash map from
/// index to position gives constant-time membership checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSet {
    dim: usize,
    levels: Vec<LevelIndex>,
    positions: HashMap<LevelIndex, usize>,
}

impl LevelSet {
    /// Create an empty level set
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            levels: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Build a set from levels, rejecting duplicates and wrong dimensions
    pub fn from_levels(dim: usize, levels: Vec<LevelIndex>) -> Result<Self> {
        let mut set = Self::new(dim);
        if !levels.is_empty() {
            set.extend(levels)?;
        }
        Ok(set)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains(&self, level: &LevelIndex) -> bool {
        self.positions.contains_key(level)
    }

    /// Insertion position of `level`
    pub fn position(&self, level: &LevelIndex) -> Option<usize> {
        self.positions.get(level).copied()
    }

    pub fn get(&self, position: usize) -> Option<&LevelIndex> {
        self.levels.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LevelIndex> {
        self.levels.iter()
    }

    pub fn as_slice(&self) -> &[LevelIndex] {
        &self.levels
    }

    /// Largest component over all levels
    pub fn max_degree(&self) -> Option<u32> {
        self.levels.iter().map(LevelIndex::max_component).max()
    }

    /// Append new levels and return the previous level count
    ///
    /// The whole batch is validated before anything is inserted: it must be
    /// non-empty, match the set dimension and contain no level already present
    /// (in the set or earlier in the batch).
    pub fn extend(&mut self, new_levels: Vec<LevelIndex>) -> Result<usize> {
        if new_levels.is_empty() {
            return Err(Error::InvalidInput(
                "at least one new level is required".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::with_capacity(new_levels.len());
        for level in &new_levels {
            if level.dim() != self.dim {
                return Err(Error::DimensionMismatch {
                    level: level.clone(),
                    expected: self.dim,
                    actual: level.dim(),
                });
            }
            if self.contains(level) || !seen.insert(level) {
                return Err(Error::DuplicateLevel(level.clone()));
            }
        }

        let previous = self.levels.len();
        for level in new_levels {
            self.positions.insert(level.clone(), self.levels.len());
            self.levels.push(level);
        }
        Ok(previous)
    }
}

impl<'a> IntoIterator for &'a LevelSet {
    type Item = &'a LevelIndex;
    type IntoIter = std::slice::Iter<'a, LevelIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.levels.iter()
    }
}
