//! Core types for multi-index Monte Carlo
//!
//! This crate provides the foundation shared by every mimc crate:
//!
//! - [`LevelIndex`] and [`LevelSet`]: multi-indices and the insertion-ordered
//!   set that addresses every per-level array
//! - [`LevelStatistics`]: append-only per-level accumulators (count, power
//!   sums, time) and the statistics derived from them
//! - [`WorkModel`] and [`Hierarchy`]: collaborator traits for per-level cost
//!   and physical discretization parameters
//! - [`Error`] and [`Result`]: the unified error type
//!
//! # Example
//!
//! ```rust
//! use mimc_core::{LevelIndex, LevelStatistics};
//!
//! let mut stats = LevelStatistics::new(1);
//! stats.add_levels(vec![LevelIndex::scalar(0)]).unwrap();
//! stats.add_samples(&[[50.0, 300.0]], &[10], &[1.0]).unwrap();
//!
//! assert_eq!(stats.mean().unwrap(), vec![5.0]);
//! assert_eq!(stats.variance().unwrap(), vec![5.0]);
//! ```

pub mod error;
pub mod level;
pub mod stats;
pub mod traits;

// Re-export core types
pub use error::{Error, Result};
pub use level::{LevelIndex, LevelSet};
pub use stats::{LevelStatistics, PowerSums, MOMENTS};
pub use traits::{Hierarchy, WorkModel};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
