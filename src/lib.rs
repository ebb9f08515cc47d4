//! # mimc
//!
//! Adaptive multi-index Monte Carlo. Estimates `E[Q]` of a quantity computed
//! by a hierarchy of discretized models to a target tolerance at near-minimal
//! cost, controlling discretization bias and sampling error separately.
//!
//! This crate re-exports the workspace crates:
//!
//! - [`core`]: level indices, statistics stores, collaborator traits, errors
//! - [`levels`]: mixed differences, boundaries, growth policies
//! - [`estimate`]: tolerance schedules, bias/variance estimators, allocation
//! - [`run`]: configuration and the run coordinator
//! - `gbm` (feature `gbm`): a geometric Brownian motion reference sampler
//!
//! # Example
//!
//! ```rust
//! use mimc::prelude::*;
//!
//! let mut sampler = |_: &[u32], diff: &MixedDifference, m: u64| {
//!     let v = 0.5f64.powi(diff.max_component() as i32);
//!     let m = m as f64;
//!     Ok::<_, anyhow::Error>(SampleBatch::new(vec![m * v, m * (v + v * v)], m))
//! };
//!
//! let config = MimcConfig::builder()
//!     .dim(1)
//!     .final_tol(0.1)
//!     .start_tol(0.2)
//!     .constant_theta(true)
//!     .gamma(2f64.ln())
//!     .build()?;
//! let mut run = MimcRun::new(config);
//! run.run(&mut sampler)?;
//! assert!(run.total_error() < 0.1);
//! # Ok::<(), mimc::core::Error>(())
//! ```

pub use mimc_core as core;
pub use mimc_estimate as estimate;
pub use mimc_levels as levels;
pub use mimc_run as run;

#[cfg(feature = "gbm")]
pub use mimc_gbm as gbm;

/// Commonly used types
pub mod prelude {
    pub use mimc_core::{Error, Hierarchy, LevelIndex, LevelSet, LevelStatistics, Result, WorkModel};
    pub use mimc_estimate::{SampleAllocation, SampleAllocator, ToleranceSchedule};
    pub use mimc_levels::{
        corners_of, ExponentialWork, GeometricHierarchy, IndexSetEnumerator, LevelGrowth,
        MixedDifference, TensorGrowth, TotalDegreeGrowth, WeightedTotalDegree,
    };
    pub use mimc_run::{
        MimcConfig, MimcConfigBuilder, MimcRun, NullObserver, RunObserver, RunSummary,
        SampleBatch, Sampler,
    };

    #[cfg(feature = "gbm")]
    pub use mimc_gbm::{GbmParams, GbmSampler, Payoff};
}
