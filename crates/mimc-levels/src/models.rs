//! Default cost and hierarchy models

use mimc_core::{Hierarchy, LevelIndex, WorkModel};

/// Exponential work proxy, `prod_i exp(gamma * l_i)`
///
/// Used when no measured or user-supplied cost is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialWork {
    gamma: f64,
}

impl ExponentialWork {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl WorkModel for ExponentialWork {
    fn work(&self, levels: &[LevelIndex]) -> Vec<f64> {
        levels
            .iter()
            .map(|l| {
                l.components()
                    .iter()
                    .map(|&c| (f64::from(c) * self.gamma).exp())
                    .product()
            })
            .collect()
    }
}

/// Geometric discretization parameter `h = h0 * beta^l`
///
/// Multi-dimensional levels use their largest component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricHierarchy {
    h0: f64,
    beta: f64,
}

impl GeometricHierarchy {
    pub fn new(h0: f64, beta: f64) -> Self {
        Self { h0, beta }
    }

    pub fn h0(&self) -> f64 {
        self.h0
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Step size of a single level
    pub fn step(&self, level: &LevelIndex) -> f64 {
        self.h0 * self.beta.powi(level.max_component() as i32)
    }
}

impl Hierarchy for GeometricHierarchy {
    fn hierarchy(&self, levels: &[LevelIndex]) -> Vec<f64> {
        levels.iter().map(|l| self.step(l)).collect()
    }
}
