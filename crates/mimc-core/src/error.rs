//! Error types for multi-index Monte Carlo
//!
//! Provides a unified error type for all mimc crates.

use crate::level::LevelIndex;
use thiserror::Error;

/// Core error type for MIMC operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or inconsistent configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A required parameter has no default and was not provided
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Requested functionality exists in the model but is not implemented
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Argument shapes disagree with the current level count
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// A level index has a different dimension than its level set
    #[error("Dimension mismatch: level {level} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        level: LevelIndex,
        expected: usize,
        actual: usize,
    },

    /// A level was inserted twice
    #[error("Duplicate level {0}")]
    DuplicateLevel(LevelIndex),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Mathematical domain violation (e.g. variance of an empty level)
    #[error("Domain error: {0}")]
    Domain(String),

    /// Not enough levels for the requested estimate
    #[error("Insufficient levels: expected at least {expected} levels beyond the zero level, got {actual}")]
    InsufficientLevels { expected: usize, actual: usize },

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// A tolerance was not met within the allowed refinements
    #[error("Tolerance {tol} not reached: estimated error {total_error} after {attempts} refinements")]
    NotConverged {
        tol: f64,
        total_error: f64,
        attempts: usize,
    },

    /// The external sampler failed while producing samples for a level
    #[error("Sampler failed on level {level}: {source}")]
    Sampler {
        level: LevelIndex,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration or summary (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error for disagreeing argument lengths
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::ShapeMismatch {
            context: context.to_string(),
            expected,
            actual,
        }
    }

    /// Create an error for a statistic requested on a level without samples
    pub fn zero_samples(level: &LevelIndex, statistic: &str) -> Self {
        Self::Domain(format!("{statistic} of level {level} requires at least one sample"))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} contains NaN or infinite values"))
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
