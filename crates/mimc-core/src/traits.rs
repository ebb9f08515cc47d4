//! Collaborator traits shared by the estimators and the run coordinator

use crate::level::LevelIndex;

/// Per-level cost model
///
/// Returns one non-negative cost per requested level. Any
/// `Fn(&[LevelIndex]) -> Vec<f64>` closure is a work model.
pub trait WorkModel {
    fn work(&self, levels: &[LevelIndex]) -> Vec<f64>;
}

impl<F> WorkModel for F
where
    F: Fn(&[LevelIndex]) -> Vec<f64>,
{
    fn work(&self, levels: &[LevelIndex]) -> Vec<f64> {
        self(levels)
    }
}

/// Maps levels to a physical discretization parameter (e.g. a step size)
pub trait Hierarchy {
    fn hierarchy(&self, levels: &[LevelIndex]) -> Vec<f64>;
}

impl<F> Hierarchy for F
where
    F: Fn(&[LevelIndex]) -> Vec<f64>,
{
    fn hierarchy(&self, levels: &[LevelIndex]) -> Vec<f64> {
        self(levels)
    }
}
