//! # Estimators for multi-index Monte Carlo
//!
//! Everything a run needs to turn accumulated level statistics into decisions:
//!
//! - **Tolerance sequences**: geometric schedules ending below the target
//! - **Classical estimates**: boundary bias and statistical error
//! - **Bayesian estimates**: fitted bias/variance models for 1D hierarchies
//! - **Sample allocation**: work-optimal per-level sample counts
//!
//! # Example
//!
//! ```rust
//! use mimc_estimate::{build_sequence, SampleAllocator};
//!
//! let tols = build_sequence(0.1, 1.0, 1, 2.0, 1.1).unwrap();
//! assert_eq!(tols.len(), 5);
//!
//! let allocator = SampleAllocator::new(3.0, 0.5, true);
//! let alloc = allocator.theoretical_samples(0.1, 0.0, &[4.0], &[1.0]).unwrap();
//! assert!((alloc.optimal[0] - 14400.0).abs() < 1e-6);
//! ```

pub mod allocation;
pub mod bayesian;
pub mod classical;
pub mod regression;
pub mod tolerance;

pub use allocation::{SampleAllocation, SampleAllocator};
pub use bayesian::{BayesianEstimator, BayesianFit, BayesianInputs};
pub use classical::{statistical_error, ClassicalEstimator};
pub use regression::weighted_least_squares;
pub use tolerance::{build_sequence, ensure_non_increasing, ToleranceSchedule};
