//! Run progress hooks

use crate::run::MimcRun;
use mimc_core::{Error, Result};

/// Receives progress of a run, typically to persist it
pub trait RunObserver {
    /// Called once per converged tolerance; an error aborts the run
    fn on_iteration_done(&mut self, run: &MimcRun, iteration: usize, tol: f64) -> Result<()>;

    /// Called once when a run fails, before the error is returned
    fn on_run_failed(&mut self, _run: &MimcRun, _error: &Error) {}

    /// Called once when a run completes
    fn on_run_succeeded(&mut self, _run: &MimcRun) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl RunObserver for NullObserver {
    fn on_iteration_done(&mut self, _run: &MimcRun, _iteration: usize, _tol: f64) -> Result<()> {
        Ok(())
    }
}

impl<F> RunObserver for F
where
    F: FnMut(&MimcRun, usize, f64) -> Result<()>,
{
    fn on_iteration_done(&mut self, run: &MimcRun, iteration: usize, tol: f64) -> Result<()> {
        self(run, iteration, tol)
    }
}
