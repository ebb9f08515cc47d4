//! Run configuration
//!
//! [`MimcConfigBuilder`] collects optional settings (directly or from JSON)
//! and resolves them into a validated [`MimcConfig`]. Parameters fall into
//! three groups:
//!
//! - required: `dim`, `final_tol`
//! - defaulted silently: everything with a conventional value
//! - defaulted with a warning: `confidence` and `theta`, which strongly
//!   affect cost and are listed in [`MimcConfig::defaulted`]

use mimc_core::{Error, Result};
use mimc_estimate::{SampleAllocator, ToleranceSchedule};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::warn;

const DEFAULT_CONFIDENCE: f64 = 3.0;
const DEFAULT_THETA: f64 = 0.5;

/// Fully resolved run configuration
///
/// Deserializing goes through [`MimcConfigBuilder`], so defaults and
/// validation apply to JSON input as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MimcConfigBuilder")]
pub struct MimcConfig {
    /// Number of level axes
    pub dim: usize,
    /// Tolerance that ends the run
    pub final_tol: f64,
    /// Approximate tolerance of the first iteration
    pub start_tol: f64,
    pub r1: f64,
    pub r2: f64,
    /// Iterations scheduled below `final_tol`
    pub extra_iterations: usize,

    /// Use the Bayesian bias/variance model (one-dimensional only)
    pub bayesian: bool,
    /// Keep samples across inner iterations of one tolerance
    pub reuse_samples: bool,
    /// Sum absolute boundary means for the bias
    pub conservative_boundary: bool,
    /// Always split the tolerance with `theta`
    pub constant_theta: bool,

    /// Confidence multiplier `Ca`
    pub confidence: f64,
    /// Default statistical share of the tolerance
    pub theta: f64,

    /// Largest level-count increase per Bayesian refit
    pub max_level_increment: usize,
    pub kappa0: f64,
    pub kappa1: f64,
    pub fit_exponents: bool,
    pub weak_exponent: Option<f64>,
    pub strong_exponent: Option<f64>,

    /// Geometric hierarchy `h0 * beta^l`
    pub h0: f64,
    pub beta: f64,
    /// Exponent of the exponential work proxy
    pub gamma: Option<f64>,

    /// Samples drawn on every newly added level
    pub baseline_samples: u64,
    /// Levels created before the first tolerance
    pub min_levels: usize,
    /// Bias-driven level extensions allowed per tolerance
    pub max_extension_retries: usize,

    #[serde(skip)]
    defaulted: Vec<String>,
}

impl TryFrom<MimcConfigBuilder> for MimcConfig {
    type Error = Error;

    fn try_from(builder: MimcConfigBuilder) -> Result<Self> {
        builder.build()
    }
}

impl MimcConfig {
    pub fn builder() -> MimcConfigBuilder {
        MimcConfigBuilder::default()
    }

    /// Parse a JSON object of builder settings and resolve it
    pub fn from_json(json: &str) -> Result<Self> {
        let builder: MimcConfigBuilder = serde_json::from_str(json)?;
        builder.build()
    }

    /// Names of parameters that fell back to a default with a warning
    pub fn defaulted(&self) -> &[String] {
        &self.defaulted
    }

    pub fn tolerance_schedule(&self) -> ToleranceSchedule {
        ToleranceSchedule {
            final_tol: self.final_tol,
            start_tol: self.start_tol,
            extra_iterations: self.extra_iterations,
            r1: self.r1,
            r2: self.r2,
        }
    }

    pub fn allocator(&self) -> SampleAllocator {
        SampleAllocator::new(self.confidence, self.theta, self.constant_theta)
    }
}

/// Unresolved settings; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MimcConfigBuilder {
    dim: Option<usize>,
    final_tol: Option<f64>,
    start_tol: Option<f64>,
    r1: Option<f64>,
    r2: Option<f64>,
    extra_iterations: Option<usize>,
    bayesian: Option<bool>,
    reuse_samples: Option<bool>,
    conservative_boundary: Option<bool>,
    constant_theta: Option<bool>,
    confidence: Option<f64>,
    confidence_level: Option<f64>,
    theta: Option<f64>,
    max_level_increment: Option<usize>,
    kappa0: Option<f64>,
    kappa1: Option<f64>,
    fit_exponents: Option<bool>,
    weak_exponent: Option<f64>,
    strong_exponent: Option<f64>,
    h0: Option<f64>,
    beta: Option<f64>,
    gamma: Option<f64>,
    baseline_samples: Option<u64>,
    min_levels: Option<usize>,
    max_extension_retries: Option<usize>,
}

macro_rules! setter {
    ($($(#[$doc:meta])* $name:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $name(mut self, value: $ty) -> Self {
                self.$name = Some(value);
                self
            }
        )*
    };
}

impl MimcConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    setter! {
        dim: usize,
        final_tol: f64,
        start_tol: f64,
        r1: f64,
        r2: f64,
        extra_iterations: usize,
        bayesian: bool,
        reuse_samples: bool,
        conservative_boundary: bool,
        constant_theta: bool,
        /// Set `Ca` directly
        confidence: f64,
        /// Derive `Ca` from a two-sided confidence level in `(0, 1)`
        confidence_level: f64,
        theta: f64,
        max_level_increment: usize,
        kappa0: f64,
        kappa1: f64,
        fit_exponents: bool,
        weak_exponent: f64,
        strong_exponent: f64,
        h0: f64,
        beta: f64,
        gamma: f64,
        baseline_samples: u64,
        min_levels: usize,
        max_extension_retries: usize,
    }

    /// Resolve defaults and validate
    pub fn build(self) -> Result<MimcConfig> {
        let dim = self.dim.ok_or(Error::MissingParameter("dim"))?;
        let final_tol = self.final_tol.ok_or(Error::MissingParameter("final_tol"))?;

        let mut defaulted = Vec::new();
        let confidence = match (self.confidence, self.confidence_level) {
            (Some(_), Some(_)) => {
                return Err(Error::config(
                    "set either confidence or confidence_level, not both",
                ))
            }
            (Some(ca), None) => ca,
            (None, Some(level)) => confidence_multiplier(level)?,
            (None, None) => {
                warn!(default = DEFAULT_CONFIDENCE, "confidence not set, using default");
                defaulted.push("confidence".to_string());
                DEFAULT_CONFIDENCE
            }
        };
        let theta = self.theta.unwrap_or_else(|| {
            warn!(default = DEFAULT_THETA, "theta not set, using default");
            defaulted.push("theta".to_string());
            DEFAULT_THETA
        });

        let config = MimcConfig {
            dim,
            final_tol,
            start_tol: self.start_tol.unwrap_or(0.1),
            r1: self.r1.unwrap_or(2.0),
            r2: self.r2.unwrap_or(1.1),
            extra_iterations: self.extra_iterations.unwrap_or(2),
            bayesian: self.bayesian.unwrap_or(false),
            reuse_samples: self.reuse_samples.unwrap_or(true),
            conservative_boundary: self.conservative_boundary.unwrap_or(false),
            constant_theta: self.constant_theta.unwrap_or(false),
            confidence,
            theta,
            max_level_increment: self.max_level_increment.unwrap_or(2),
            kappa0: self.kappa0.unwrap_or(0.1),
            kappa1: self.kappa1.unwrap_or(0.1),
            fit_exponents: self.fit_exponents.unwrap_or(false),
            weak_exponent: self.weak_exponent,
            strong_exponent: self.strong_exponent,
            h0: self.h0.unwrap_or(2.0),
            beta: self.beta.unwrap_or(2.0),
            gamma: self.gamma,
            baseline_samples: self.baseline_samples.unwrap_or(10),
            min_levels: self.min_levels.unwrap_or(2),
            max_extension_retries: self.max_extension_retries.unwrap_or(10),
            defaulted,
        };
        validate(&config)?;
        Ok(config)
    }
}

/// Two-sided standard-normal quantile for confidence `level`
pub fn confidence_multiplier(level: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(Error::config(format!(
            "confidence level must be in (0, 1), got {level}"
        )));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| Error::Computation(format!("failed to create normal distribution: {e}")))?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}

fn validate(config: &MimcConfig) -> Result<()> {
    let positive = |name: &str, value: f64| {
        if value > 0.0 && value.is_finite() {
            Ok(())
        } else {
            Err(Error::config(format!("{name} must be finite and positive, got {value}")))
        }
    };

    if config.dim == 0 {
        return Err(Error::config("dim must be at least 1"));
    }
    positive("final_tol", config.final_tol)?;
    positive("start_tol", config.start_tol)?;
    positive("confidence", config.confidence)?;
    positive("h0", config.h0)?;
    positive("beta", config.beta)?;
    if !(config.r1 > 1.0) || !(config.r2 > 1.0) {
        return Err(Error::config(format!(
            "r1 and r2 must exceed 1, got r1={}, r2={}",
            config.r1, config.r2
        )));
    }
    if !(config.theta > 0.0 && config.theta < 1.0) {
        return Err(Error::config(format!("theta must be in (0, 1), got {}", config.theta)));
    }
    if config.baseline_samples == 0 {
        return Err(Error::config("baseline_samples must be at least 1"));
    }
    if let Some(gamma) = config.gamma {
        if !gamma.is_finite() {
            return Err(Error::config(format!("gamma must be finite, got {gamma}")));
        }
    }

    if config.bayesian {
        if config.dim > 1 {
            return Err(Error::config(format!(
                "Bayesian estimation supports one-dimensional problems only, got dim={}",
                config.dim
            )));
        }
        if config.fit_exponents {
            return Err(Error::NotImplemented(
                "fitting the weak and strong rates".to_string(),
            ));
        }
        if config.weak_exponent.is_none() {
            return Err(Error::MissingParameter("weak_exponent"));
        }
        if config.strong_exponent.is_none() {
            return Err(Error::MissingParameter("strong_exponent"));
        }
        if config.min_levels < 3 {
            return Err(Error::config(format!(
                "Bayesian estimation needs min_levels >= 3, got {}",
                config.min_levels
            )));
        }
    }
    Ok(())
}
