//! # Level algebra for multi-index Monte Carlo
//!
//! Pure functions and small policies over level indices:
//!
//! - **Mixed differences**: the signed corners a sampler evaluates per level
//! - **Boundary detection**: the outer shell used for classical bias estimates
//! - **Growth policies**: tensor and anisotropic total-degree extension
//! - **Default models**: exponential work proxy and geometric step sizes

pub mod boundary;
pub mod difference;
pub mod enumerate;
pub mod growth;
pub mod models;

// Re-exports
pub use boundary::{boundary_mask, boundary_positions};
pub use difference::{corners_of, Corner, MixedDifference};
pub use enumerate::{IndexSetEnumerator, WeightedTotalDegree};
pub use growth::{LevelExtension, LevelGrowth, TensorGrowth, TotalDegreeGrowth};
pub use models::{ExponentialWork, GeometricHierarchy};
