//! # Multi-index Monte Carlo runs
//!
//! Configuration, collaborator traits and the coordinator that drives a run
//! through a tolerance sequence:
//!
//! - [`MimcConfig`]: validated run settings, built from code or JSON
//! - [`Sampler`]: draws samples of a level's mixed difference
//! - [`RunObserver`]: per-tolerance and end-of-run hooks
//! - [`MimcRun`]: the coordinator and its results
//!
//! # Example
//!
//! ```rust
//! use mimc_levels::MixedDifference;
//! use mimc_run::{MimcConfig, MimcRun, SampleBatch};
//!
//! // Level l has mean and variance 2^-l
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
//!     .build()
//!     .unwrap();
//! let mut run = MimcRun::new(config);
//! run.run(&mut sampler).unwrap();
//! assert!(run.total_error() < 0.1);
//! ```

pub mod config;
pub mod observer;
pub mod report;
pub mod run;
pub mod sampler;

pub use config::{confidence_multiplier, MimcConfig, MimcConfigBuilder};
pub use observer::{NullObserver, RunObserver};
pub use report::{LevelSummary, RunSummary};
pub use run::MimcRun;
pub use sampler::{SampleBatch, Sampler};
