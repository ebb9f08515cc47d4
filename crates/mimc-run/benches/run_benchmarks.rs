use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mimc_core::{LevelIndex, LevelStatistics};
use mimc_estimate::{ClassicalEstimator, SampleAllocator};
use mimc_levels::{LevelGrowth, MixedDifference, TensorGrowth};
use mimc_run::{MimcConfig, MimcRun, SampleBatch};

/// Level difference with mean and variance `2^-|l|`
fn synthetic(_: &[u32], diff: &MixedDifference, count: u64) -> anyhow::Result<SampleBatch> {
    let value = 0.5f64.powi(diff.level().total() as i32);
    let m = count as f64;
    Ok(SampleBatch::new(vec![m * value, m * (value + value * value)], m))
}

/// Tensor level set of `steps^dim` levels with synthetic statistics
fn tensor_store(dim: usize, steps: usize) -> LevelStatistics {
    let mut growth = TensorGrowth::new(100);
    let mut stats = LevelStatistics::new(dim);
    for _ in 0..steps {
        let ext = growth.extend(stats.levels()).unwrap();
        stats.add_levels(ext.levels).unwrap();
    }
    let sums: Vec<[f64; 2]> = stats
        .levels()
        .iter()
        .map(|l: &LevelIndex| {
            let v = 0.5f64.powi(l.total() as i32);
            [100.0 * v, 100.0 * (v + v * v)]
        })
        .collect();
    let n = stats.len();
    stats.add_samples(&sums, &vec![100; n], &vec![1.0; n]).unwrap();
    stats
}

fn bench_coordinator(c: &mut Criterion) {
    let mut group = c.benchmark_group("Coordinator");
    for dim in [1usize, 2] {
        let config = MimcConfig::builder()
            .dim(dim)
            .final_tol(0.02)
            .start_tol(0.2)
            .constant_theta(true)
            .confidence(3.0)
            .theta(0.5)
            .gamma(2f64.ln())
            .build()
            .unwrap();
        group.bench_with_input(BenchmarkId::new("classical", dim), &config, |b, config| {
            b.iter(|| {
                let mut run = MimcRun::new(config.clone());
                let mut sampler = synthetic;
                run.run(&mut sampler).unwrap();
                black_box(run.total_error())
            })
        });
    }
    group.finish();
}

fn bench_estimators(c: &mut Criterion) {
    let mut group = c.benchmark_group("Estimators");
    for steps in [4usize, 8, 16] {
        let stats = tensor_store(2, steps);
        let estimator = ClassicalEstimator::new(false);
        group.bench_with_input(BenchmarkId::new("boundary_bias", stats.len()), &stats, |b, stats| {
            b.iter(|| estimator.bias(black_box(stats)).unwrap())
        });

        let variances = stats.variance().unwrap();
        let work: Vec<f64> = stats.levels().iter().map(|l| 2f64.powi(l.total() as i32)).collect();
        let allocator = SampleAllocator::new(3.0, 0.5, false);
        group.bench_with_input(BenchmarkId::new("allocation", stats.len()), &variances, |b, v| {
            b.iter(|| allocator.theoretical_samples(0.01, 0.001, black_box(v), &work).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_coordinator, bench_estimators);
criterion_main!(benches);
