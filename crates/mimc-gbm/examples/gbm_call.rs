//! Estimate E[S(T)] and a call price under geometric Brownian motion
//!
//! Run with `RUST_LOG=info cargo run -p mimc-gbm --example gbm_call`.

use mimc_core::Result;
use mimc_gbm::{GbmParams, GbmSampler, Payoff};
use mimc_levels::TensorGrowth;
use mimc_run::{MimcConfig, MimcRun};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = MimcConfig::builder()
        .dim(1)
        .final_tol(0.005)
        .start_tol(0.05)
        .confidence_level(0.95)
        .theta(0.5)
        .gamma(2f64.ln())
        .build()?;

    let params = GbmParams::default();
    let mut sampler = GbmSampler::new(params, 2024)?;
    let mut run = MimcRun::new(config.clone());
    let mut growth = TensorGrowth::new(config.baseline_samples);
    let mut progress = |run: &MimcRun, iteration: usize, tol: f64| -> Result<()> {
        println!(
            "iteration {iteration}: TOL={tol:.4} error={:.4} levels={}",
            run.total_error(),
            run.active().len()
        );
        Ok(())
    };
    run.execute(&mut sampler, &mut growth, &mut progress, None)?;
    println!("{run}");
    if let Some(exact) = params.exact_mean() {
        println!("exact E[S(T)] = {exact:.6}, estimate = {:.6}", run.estimate()?);
    }

    let call = params.with_payoff(Payoff::Call { strike: 1.0 });
    let mut run = MimcRun::new(config);
    run.run(&mut GbmSampler::new(call, 7)?)?;
    println!("{}", describe(&run));
    Ok(())
}

fn describe(run: &MimcRun) -> String {
    let summary = run.summary();
    format!(
        "call price {:.6} (bias {:?}, statistical error {:?}) on {} levels",
        summary.estimate.unwrap_or(f64::NAN),
        summary.bias,
        summary.stat_error,
        summary.levels.len()
    )
}
