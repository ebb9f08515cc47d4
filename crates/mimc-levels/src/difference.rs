//! Mixed first-order difference operator
//!
//! The contribution of a level to the telescoping sum is the alternating sum of
//! the model evaluated at the corners of the hypercube `level - {0,1}^D`,
//! restricted to non-negative corners. A sampler must evaluate all corners of
//! one sample with coupled randomness.

use mimc_core::LevelIndex;

/// One corner of a mixed difference with its sign (+1 or -1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corner {
    pub level: LevelIndex,
    pub sign: i32,
}

impl Corner {
    /// Sign as a floating-point weight
    pub fn weight(&self) -> f64 {
        f64::from(self.sign)
    }
}

/// Signed corner decomposition of one level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixedDifference {
    level: LevelIndex,
    corners: Vec<Corner>,
}

impl MixedDifference {
    /// The level this difference belongs to
    pub fn level(&self) -> &LevelIndex {
        &self.level
    }

    pub fn corners(&self) -> &[Corner] {
        &self.corners
    }

    pub fn len(&self) -> usize {
        self.corners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_empty()
    }

    /// Finest corner, the level itself
    pub fn finest(&self) -> &Corner {
        &self.corners[0]
    }

    /// Largest component over all corners
    pub fn max_component(&self) -> u32 {
        self.level.max_component()
    }

    /// Combine corner evaluations (in corner order) into the difference value
    pub fn combine(&self, values: &[f64]) -> f64 {
        self.corners
            .iter()
            .zip(values)
            .map(|(c, v)| c.weight() * v)
            .sum()
    }
}

/// Decompose `level` into its `2^k` signed corners
///
/// `k` is the number of strictly positive components; zero components only
/// admit the zero offset. Corners follow the lexicographic order of the
/// offsets, so the first corner is `level` itself. A corner reached with `j`
/// unit offsets carries the sign `(-1)^j`.
pub fn corners_of(level: &LevelIndex) -> MixedDifference {
    let active: Vec<usize> = (0..level.dim()).filter(|&axis| level.get(axis) > 0).collect();
    let k = active.len();

    let mut corners = Vec::with_capacity(1 << k);
    for mask in 0usize..(1 << k) {
        let mut offset = vec![0u32; level.dim()];
        let mut ones = 0;
        for (bit, &axis) in active.iter().enumerate() {
            // The first active axis is the most significant bit
            if mask & (1 << (k - 1 - bit)) != 0 {
                offset[axis] = 1;
                ones += 1;
            }
        }
        if let Some(corner) = level.checked_sub(&offset) {
            let sign = if ones % 2 == 0 { 1 } else { -1 };
            corners.push(Corner { level: corner, sign });
        }
    }

    MixedDifference {
        level: level.clone(),
        corners,
    }
}
