//! Property-based tests for the level statistics store

use mimc_core::{Error, LevelIndex, LevelStatistics, PowerSums};
use proptest::prelude::*;

fn store(levels: usize) -> LevelStatistics {
    let mut stats = LevelStatistics::new(1);
    stats
        .add_levels((0..levels as u32).map(LevelIndex::scalar).collect())
        .unwrap();
    stats
}

fn batch(levels: usize) -> impl Strategy<Value = (Vec<PowerSums>, Vec<u64>, Vec<f64>)> {
    (
        prop::collection::vec((-100.0..100.0f64, 0.0..100.0f64), levels),
        prop::collection::vec(0u64..1000, levels),
        prop::collection::vec(0.0..10.0f64, levels),
    )
        .prop_map(|(sums, counts, times)| {
            (sums.into_iter().map(|(a, b)| [a, b]).collect(), counts, times)
        })
}

proptest! {
    // Property: accumulation is the elementwise sum of every call
    #[test]
    fn prop_accumulation_is_elementwise_sum(
        batches in (1usize..6).prop_flat_map(|l| prop::collection::vec(batch(l), 1..8))
    ) {
        let levels = batches[0].1.len();
        let mut stats = store(levels);

        let mut expected_sums = vec![[0.0; 2]; levels];
        let mut expected_counts = vec![0u64; levels];
        let mut expected_times = vec![0.0; levels];

        for (sums, counts, times) in &batches {
            stats.add_samples(sums, counts, times).unwrap();
            for i in 0..levels {
                expected_sums[i][0] += sums[i][0];
                expected_sums[i][1] += sums[i][1];
                expected_counts[i] += counts[i];
                expected_times[i] += times[i];
            }
        }

        prop_assert_eq!(stats.counts(), expected_counts.as_slice());
        for i in 0..levels {
            prop_assert!((stats.power_sums()[i][0] - expected_sums[i][0]).abs() < 1e-9);
            prop_assert!((stats.power_sums()[i][1] - expected_sums[i][1]).abs() < 1e-9);
            prop_assert!((stats.times()[i] - expected_times[i]).abs() < 1e-9);
        }
    }

    // Property: a shape mismatch fails before any row is mutated
    #[test]
    fn prop_shape_mismatch_never_mutates(
        levels in 1usize..6,
        extra in 1usize..3,
        (sums, counts, times) in batch(3),
    ) {
        let mut stats = store(levels);
        stats.add_samples(&vec![[1.0, 1.0]; levels], &vec![1; levels], &vec![1.0; levels]).unwrap();
        let before = stats.clone();

        let wrong = levels + extra;
        let sums: Vec<_> = sums.into_iter().cycle().take(wrong).collect();
        let counts: Vec<_> = counts.into_iter().cycle().take(wrong).collect();
        let times: Vec<_> = times.into_iter().cycle().take(wrong).collect();

        let result = stats.add_samples(&sums, &counts, &times);
        let is_shape_mismatch = matches!(result, Err(Error::ShapeMismatch { .. }));
        prop_assert!(is_shape_mismatch);
        prop_assert_eq!(stats, before);
    }

    // Property: growing L levels by k yields L+k rows, zero new rows, old rows intact
    #[test]
    fn prop_add_levels_preserves_old_rows(
        existing in 1u32..6,
        added in 1u32..6,
        (sums, counts, times) in batch(1),
    ) {
        let mut stats = store(existing as usize);
        let n = existing as usize;
        let sums = vec![sums[0]; n];
        let counts = vec![counts[0]; n];
        let times = vec![times[0]; n];
        stats.add_samples(&sums, &counts, &times).unwrap();

        let previous = stats
            .add_levels((existing..existing + added).map(LevelIndex::scalar).collect())
            .unwrap();

        prop_assert_eq!(previous, n);
        prop_assert_eq!(stats.len(), n + added as usize);
        prop_assert_eq!(&stats.counts()[..n], counts.as_slice());
        prop_assert_eq!(&stats.power_sums()[..n], sums.as_slice());
        prop_assert!(stats.counts()[n..].iter().all(|&m| m == 0));
        prop_assert!(stats.times()[n..].iter().all(|&t| t == 0.0));
        prop_assert!(stats.power_sums()[n..].iter().all(|row| *row == [0.0, 0.0]));
    }
}

#[test]
fn test_duplicate_insertion_is_rejected() {
    let mut stats = store(2);
    let err = stats.add_levels(vec![LevelIndex::scalar(1)]).unwrap_err();
    assert!(matches!(err, Error::DuplicateLevel(_)));
    assert_eq!(stats.len(), 2);
}
