//! Run coordinator
//!
//! A [`MimcRun`] walks a sequence of tolerances. For each tolerance it
//! repeatedly allocates samples from the current bias and variance estimates,
//! draws the missing samples, and re-estimates, adding levels whenever the
//! bias alone exceeds its share of the tolerance.

use crate::config::MimcConfig;
use crate::observer::{NullObserver, RunObserver};
use crate::sampler::Sampler;
use mimc_core::{
    Error, Hierarchy, LevelIndex, LevelStatistics, PowerSums, Result, WorkModel, MOMENTS,
};
use mimc_estimate::{
    ensure_non_increasing, statistical_error, BayesianEstimator, BayesianFit,
    BayesianInputs, ClassicalEstimator, SampleAllocator,
};
use mimc_levels::{corners_of, ExponentialWork, GeometricHierarchy, LevelGrowth, TensorGrowth};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Power sums requested from the sampler
const REQUESTED_MOMENTS: [u32; MOMENTS] = [1, 2];

/// Per-level cost used by the allocator
enum WorkSource {
    Model(Box<dyn WorkModel>),
    MeasuredTime,
}

/// State and results of one multi-index Monte Carlo run
pub struct MimcRun {
    id: Uuid,
    config: MimcConfig,
    /// Samples for the current tolerance; reset between passes without reuse
    active: LevelStatistics,
    /// Every sample drawn since the run started
    cumulative: LevelStatistics,
    classical: ClassicalEstimator,
    bayesian: Option<BayesianEstimator>,
    work: WorkSource,
    hierarchy: Box<dyn Hierarchy>,
    bias: f64,
    stat_error: f64,
    theta: f64,
    elapsed: f64,
}

impl fmt::Debug for MimcRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MimcRun")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("levels", &self.active.len())
            .field("bias", &self.bias)
            .field("stat_error", &self.stat_error)
            .field("theta", &self.theta)
            .finish_non_exhaustive()
    }
}

impl MimcRun {
    /// Create a run with the configured default collaborators
    ///
    /// Work defaults to the exponential proxy when `gamma` is set and to the
    /// measured time per sample otherwise. The hierarchy defaults to
    /// `h0 * beta^l`.
    pub fn new(config: MimcConfig) -> Self {
        let work = match config.gamma {
            Some(gamma) => WorkSource::Model(Box::new(ExponentialWork::new(gamma))),
            None => WorkSource::MeasuredTime,
        };
        let hierarchy = Box::new(GeometricHierarchy::new(config.h0, config.beta));
        Self {
            id: Uuid::new_v4(),
            active: LevelStatistics::new(config.dim),
            cumulative: LevelStatistics::new(config.dim),
            classical: ClassicalEstimator::new(config.conservative_boundary),
            bayesian: None,
            work,
            hierarchy,
            bias: f64::INFINITY,
            stat_error: f64::INFINITY,
            theta: config.theta,
            elapsed: 0.0,
            config,
        }
    }

    /// Replace the per-level work model
    pub fn with_work_model(mut self, model: impl WorkModel + 'static) -> Self {
        self.work = WorkSource::Model(Box::new(model));
        self
    }

    /// Replace the hierarchy used by the Bayesian model
    pub fn with_hierarchy(mut self, hierarchy: impl Hierarchy + 'static) -> Self {
        self.hierarchy = Box::new(hierarchy);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &MimcConfig {
        &self.config
    }

    /// Statistics of the current tolerance
    pub fn active(&self) -> &LevelStatistics {
        &self.active
    }

    /// Statistics of every sample drawn
    pub fn cumulative(&self) -> &LevelStatistics {
        &self.cumulative
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    pub fn statistical_error(&self) -> f64 {
        self.stat_error
    }

    /// Estimated total error, bias plus statistical error
    pub fn total_error(&self) -> f64 {
        self.bias + self.stat_error
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Wall-clock seconds since the current execution started
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Latest fitted Bayesian constants
    pub fn fit(&self) -> Option<BayesianFit> {
        self.bayesian.as_ref().and_then(|b| b.fit())
    }

    /// Telescoping-sum estimate of the quantity of interest
    pub fn estimate(&self) -> Result<f64> {
        self.active.estimate()
    }

    /// Total work `sum(W_l * M_l)` of the samples held in the active store
    pub fn total_work(&self) -> Result<f64> {
        let work = self.work_per_level()?;
        Ok(work
            .iter()
            .zip(self.active.counts())
            .map(|(w, &m)| w * m as f64)
            .sum())
    }

    /// Run over the configured tolerance sequence with tensor growth and no observer
    pub fn run<S: Sampler + ?Sized>(&mut self, sampler: &mut S) -> Result<()> {
        let mut growth = TensorGrowth::new(self.config.baseline_samples);
        self.execute(sampler, &mut growth, &mut NullObserver, None)
    }

    /// Run to completion
    ///
    /// `tolerances` overrides the configured sequence and must be
    /// non-increasing. The observer sees every converged tolerance and the
    /// final outcome; any error aborts the run and is returned after
    /// `on_run_failed`.
    #[instrument(skip_all, fields(run_id = %self.id, dim = self.config.dim))]
    pub fn execute<S, G, O>(
        &mut self,
        sampler: &mut S,
        growth: &mut G,
        observer: &mut O,
        tolerances: Option<&[f64]>,
    ) -> Result<()>
    where
        S: Sampler + ?Sized,
        G: LevelGrowth + ?Sized,
        O: RunObserver + ?Sized,
    {
        match self.drive(sampler, growth, observer, tolerances) {
            Ok(()) => {
                info!(
                    bias = self.bias,
                    stat_error = self.stat_error,
                    elapsed = self.elapsed,
                    "run finished"
                );
                observer.on_run_succeeded(self);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "run failed");
                observer.on_run_failed(self, &error);
                Err(error)
            }
        }
    }

    fn drive<S, G, O>(
        &mut self,
        sampler: &mut S,
        growth: &mut G,
        observer: &mut O,
        tolerances: Option<&[f64]>,
    ) -> Result<()>
    where
        S: Sampler + ?Sized,
        G: LevelGrowth + ?Sized,
        O: RunObserver + ?Sized,
    {
        let tols = match tolerances {
            Some(tols) => {
                ensure_non_increasing(tols)?;
                tols.to_vec()
            }
            None => self.config.tolerance_schedule().build()?,
        };
        self.prepare()?;

        let start = Instant::now();
        self.seed_levels(sampler, growth)?;
        self.elapsed = start.elapsed().as_secs_f64();

        let allocator = self.config.allocator();
        for (iteration, &tol) in tols.iter().enumerate() {
            info!(iteration, tol, levels = self.active.len(), "refining");
            self.refine(sampler, growth, &allocator, tol, start)?;
            self.elapsed = start.elapsed().as_secs_f64();
            observer.on_iteration_done(self, iteration, tol)?;
            if tol <= self.config.final_tol {
                break;
            }
        }
        Ok(())
    }

    /// Reset state from a previous execution and set up the estimators
    fn prepare(&mut self) -> Result<()> {
        if !self.active.is_empty() || !self.cumulative.is_empty() {
            warn!(run_id = %self.id, "run executed before, discarding previous levels and samples");
            self.active = LevelStatistics::new(self.config.dim);
            self.cumulative = LevelStatistics::new(self.config.dim);
        }
        self.bias = f64::INFINITY;
        self.stat_error = f64::INFINITY;
        self.theta = self.config.theta;

        self.bayesian = if self.config.bayesian {
            if matches!(self.work, WorkSource::MeasuredTime) {
                return Err(Error::config(
                    "Bayesian estimation needs a work model or gamma",
                ));
            }
            let (w, s) = match (self.config.weak_exponent, self.config.strong_exponent) {
                (Some(w), Some(s)) => (w, s),
                (None, _) => return Err(Error::MissingParameter("weak_exponent")),
                (_, None) => return Err(Error::MissingParameter("strong_exponent")),
            };
            Some(
                BayesianEstimator::new(w, s)?
                    .with_prior(self.config.kappa0, self.config.kappa1)
                    .with_exponent_fitting(self.config.fit_exponents),
            )
        } else {
            None
        };

        if matches!(self.work, WorkSource::MeasuredTime) {
            warn!("no work model configured, using measured time per sample");
        }
        Ok(())
    }

    /// Grow until `min_levels` levels exist, then draw the baseline samples
    fn seed_levels<S, G>(&mut self, sampler: &mut S, growth: &mut G) -> Result<()>
    where
        S: Sampler + ?Sized,
        G: LevelGrowth + ?Sized,
    {
        let target = self.config.min_levels.max(1);
        let mut todo = Vec::new();
        while self.active.len() < target {
            let extension = growth.extend(self.active.levels())?;
            if extension.is_empty() {
                return Err(Error::Computation(format!(
                    "{} growth proposed no levels",
                    growth.name()
                )));
            }
            if extension.samples.len() != extension.levels.len() {
                return Err(Error::size_mismatch(
                    extension.levels.len(),
                    extension.samples.len(),
                    "initial samples of new levels",
                ));
            }
            self.add_levels(extension.levels)?;
            todo.extend(extension.samples);
        }
        debug!(levels = self.active.len(), "seeded level set");
        self.draw_samples(sampler, &todo)
    }

    /// Inner loop for one tolerance
    ///
    /// Ends once the estimated error is below `tol`. Bias-driven extensions
    /// and sample top-ups after a stalled allocation are each limited by
    /// `max_extension_retries`; running out is an [`Error::NotConverged`].
    fn refine<S, G>(
        &mut self,
        sampler: &mut S,
        growth: &mut G,
        allocator: &SampleAllocator,
        tol: f64,
        start: Instant,
    ) -> Result<()>
    where
        S: Sampler + ?Sized,
        G: LevelGrowth + ?Sized,
    {
        let retries = self.config.max_extension_retries;
        let mut extensions = 0;
        let mut top_ups = 0;
        let mut previous: Option<Vec<u64>> = None;
        loop {
            self.refit_bayesian(allocator, tol)?;

            let bias = self.estimate_bias()?;
            let variances = self.variances()?;
            let work = self.work_per_level()?;
            let allocation = allocator.theoretical_samples(tol, bias, &variances, &work)?;
            let todo: Vec<u64> = allocation.counts().into_iter().map(|m| m.max(1)).collect();
            debug!(theta = allocation.theta, ?todo, "allocated samples");

            if !self.config.reuse_samples {
                self.active.reset_accumulators();
            }
            self.draw_samples(sampler, &todo)?;
            self.theta = allocation.theta;
            self.update_estimates(start)?;

            if self.converged(tol) {
                info!(tol, total_error = self.total_error(), "converged");
                return Ok(());
            }

            // Relative slack keeps rounding in theta from triggering an extension
            if self.bias > (1.0 - self.theta) * tol * (1.0 + 1e-12) {
                if extensions >= retries {
                    warn!(tol, extensions, bias = self.bias, "bias still too large after extensions");
                    return Err(self.not_converged(tol, extensions + top_ups));
                }
                extensions += 1;
                let extension = growth.extend(self.active.levels())?;
                if !extension.is_empty() {
                    let mut carried = self.active.counts().to_vec();
                    carried.extend(&extension.samples);
                    debug!(added = extension.len(), policy = growth.name(), "extending levels");
                    self.add_levels(extension.levels)?;
                    self.draw_samples(sampler, &carried)?;
                    previous = None;
                    continue;
                }
            }

            // Floored counts can leave the statistical error just above its share
            if previous.as_ref() == Some(&todo) {
                let budget = tol - self.bias;
                if top_ups >= retries || !(budget > 0.0) || !self.stat_error.is_finite() {
                    warn!(tol, top_ups, total_error = self.total_error(), "sample allocation stalled");
                    return Err(self.not_converged(tol, extensions + top_ups));
                }
                top_ups += 1;
                self.top_up(sampler, (self.stat_error / budget).powi(2))?;
                self.update_estimates(start)?;
                if self.converged(tol) {
                    info!(tol, total_error = self.total_error(), top_ups, "converged after top-up");
                    return Ok(());
                }
            }
            previous = Some(todo);
        }
    }

    fn converged(&self, tol: f64) -> bool {
        self.bayesian.is_some() || self.bias + self.stat_error < tol
    }

    fn not_converged(&self, tol: f64, attempts: usize) -> Error {
        Error::NotConverged {
            tol,
            total_error: self.total_error(),
            attempts,
        }
    }

    fn update_estimates(&mut self, start: Instant) -> Result<()> {
        self.stat_error = statistical_error(
            self.config.confidence,
            &self.variances()?,
            self.active.counts(),
        )?;
        self.bias = self.estimate_bias()?;
        self.elapsed = start.elapsed().as_secs_f64();
        debug!(bias = self.bias, stat_error = self.stat_error, "updated estimates");
        Ok(())
    }

    /// Scale every level's sample count by at least `factor`
    ///
    /// With fixed variances, scaling all counts by `factor` divides the
    /// statistical error by `sqrt(factor)`; one extra sample per level makes
    /// the decrease strict.
    fn top_up<S: Sampler + ?Sized>(&mut self, sampler: &mut S, factor: f64) -> Result<()> {
        let totals: Vec<u64> = self
            .active
            .counts()
            .iter()
            .map(|&m| (m as f64 * factor).ceil() as u64 + 1)
            .collect();
        debug!(factor, ?totals, "topping up samples");
        self.draw_samples(sampler, &totals)
    }

    /// Refit the Bayesian model and add placeholder levels up to the optimal count
    fn refit_bayesian(&mut self, allocator: &SampleAllocator, tol: f64) -> Result<()> {
        let Some(estimator) = self.bayesian.as_mut() else {
            return Ok(());
        };
        let WorkSource::Model(work_model) = &self.work else {
            return Err(Error::config("Bayesian estimation needs a work model or gamma"));
        };

        estimator.estimate_params(&self.cumulative, self.hierarchy.as_ref())?;
        let inputs = BayesianInputs {
            active: &self.active,
            cumulative: &self.cumulative,
            hierarchy: self.hierarchy.as_ref(),
        };
        let optimal = estimator.optimal_level_count(
            inputs,
            work_model.as_ref(),
            allocator,
            tol,
            self.config.max_level_increment,
        )?;

        let current = self.active.len();
        if optimal > current {
            debug!(current, optimal, "adding levels for Bayesian optimum");
            let new_levels = (current as u32..optimal as u32).map(LevelIndex::scalar).collect();
            self.add_levels(new_levels)?;
        }
        Ok(())
    }

    fn add_levels(&mut self, levels: Vec<LevelIndex>) -> Result<()> {
        self.active.add_levels(levels.clone())?;
        self.cumulative.add_levels(levels)?;
        Ok(())
    }

    /// Draw samples until each level holds `totals[l]` in the active store
    ///
    /// Results are merged into both stores only after every sampler call succeeded.
    fn draw_samples<S: Sampler + ?Sized>(&mut self, sampler: &mut S, totals: &[u64]) -> Result<()> {
        let len = self.active.len();
        if totals.len() != len {
            return Err(Error::size_mismatch(len, totals.len(), "requested sample totals"));
        }

        let mut sums: Vec<PowerSums> = vec![[0.0; MOMENTS]; len];
        let mut counts = vec![0u64; len];
        let mut times = vec![0.0; len];
        for (position, level) in self.active.levels().iter().enumerate() {
            let held = self.active.counts()[position];
            let wanted = totals[position];
            if wanted <= held {
                continue;
            }
            let count = wanted - held;
            let difference = corners_of(level);
            let batch = sampler
                .sample(&REQUESTED_MOMENTS, &difference, count)
                .map_err(|source| Error::Sampler {
                    level: level.clone(),
                    source,
                })?;
            if batch.power_sums.len() != MOMENTS {
                return Err(Error::size_mismatch(
                    MOMENTS,
                    batch.power_sums.len(),
                    "sampler power sums",
                ));
            }
            if batch.power_sums.iter().any(|s| !s.is_finite()) || !batch.elapsed.is_finite() {
                return Err(Error::non_finite("sampler output"));
            }
            debug!(level = %level, count, "sampled level");
            sums[position] = [batch.power_sums[0], batch.power_sums[1]];
            counts[position] = count;
            times[position] = batch.elapsed;
        }

        self.active.add_samples(&sums, &counts, &times)?;
        self.cumulative.add_samples(&sums, &counts, &times)
    }

    fn estimate_bias(&self) -> Result<f64> {
        match &self.bayesian {
            Some(estimator) => estimator.bias(self.hierarchy.as_ref(), self.max_level()),
            None => self.classical.bias(&self.active),
        }
    }

    /// Per-level variance estimates used for allocation
    ///
    /// Sample variances of the active store, or the posterior variances
    /// once a Bayesian fit exists.
    pub fn variances(&self) -> Result<Vec<f64>> {
        match &self.bayesian {
            Some(estimator) => {
                let inputs = BayesianInputs {
                    active: &self.active,
                    cumulative: &self.cumulative,
                    hierarchy: self.hierarchy.as_ref(),
                };
                estimator.variances(inputs, self.max_level())
            }
            None => self.classical.variances(&self.active),
        }
    }

    fn max_level(&self) -> usize {
        self.active.len().saturating_sub(1)
    }

    fn work_per_level(&self) -> Result<Vec<f64>> {
        match &self.work {
            WorkSource::Model(model) => {
                let work = model.work(self.active.levels().as_slice());
                if work.len() != self.active.len() {
                    return Err(Error::size_mismatch(
                        self.active.len(),
                        work.len(),
                        "work model output",
                    ));
                }
                Ok(work)
            }
            // Timers can report zero for very cheap samples
            WorkSource::MeasuredTime => Ok(self
                .cumulative
                .average_time()?
                .into_iter()
                .map(|t| t.max(f64::EPSILON))
                .collect()),
        }
    }
}
