//! Property tests for configuration resolution

use mimc_core::Error;
use mimc_run::{confidence_multiplier, MimcConfig};
use proptest::prelude::*;

proptest! {
    #[test]
    fn confidence_multiplier_increases_with_level(a in 0.01f64..0.98, step in 0.001f64..0.01) {
        let lo = confidence_multiplier(a).unwrap();
        let hi = confidence_multiplier(a + step).unwrap();
        prop_assert!(lo > 0.0);
        prop_assert!(hi > lo);
    }

    #[test]
    fn theta_outside_unit_interval_rejected(theta in prop_oneof![-2.0f64..=0.0, 1.0f64..3.0]) {
        let result = MimcConfig::builder()
            .dim(1)
            .final_tol(0.1)
            .confidence(3.0)
            .theta(theta)
            .build();
        prop_assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn schedule_ends_at_final_tolerance(final_tol in 1e-4f64..0.1, extra in 0usize..4) {
        let config = MimcConfig::builder()
            .dim(1)
            .final_tol(final_tol)
            .start_tol(0.5)
            .extra_iterations(extra)
            .confidence(3.0)
            .theta(0.5)
            .build()
            .unwrap();
        let tols = config.tolerance_schedule().build().unwrap();
        let last_regular = tols.len() - 1 - extra;
        prop_assert!((tols[last_regular] - final_tol).abs() <= 1e-12 * final_tol);
        prop_assert!(tols[0] <= 0.5 * (1.0 + 1e-9));
        prop_assert!(tols.windows(2).all(|w| w[1] <= w[0]));
    }
}

#[test]
fn test_confidence_level_matches_normal_quantiles() {
    approx::assert_relative_eq!(confidence_multiplier(0.95).unwrap(), 1.959964, epsilon = 1e-5);
    assert!(confidence_multiplier(1.0).is_err());
    assert!(confidence_multiplier(0.0).is_err());
}
