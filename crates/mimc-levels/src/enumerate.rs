//! Admissible index-set enumeration for total-degree growth

use mimc_core::LevelIndex;

/// Enumerates the levels whose weighted total degree is within a threshold
pub trait IndexSetEnumerator {
    /// All levels `l` with `sum_i weights[i] * l[i] <= threshold`
    fn admissible_set(&self, weights: &[f64], threshold: f64) -> Vec<LevelIndex>;
}

/// Reference enumerator for anisotropic total-degree sets
///
/// The returned set is downward closed and ordered lexicographically. Weights
/// must be strictly positive for the set to be finite.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedTotalDegree;

impl WeightedTotalDegree {
    // Absorbs rounding when the threshold is a sum of weights
    const SLACK: f64 = 1e-12;

    fn collect(
        weights: &[f64],
        budget: f64,
        prefix: &mut Vec<u32>,
        out: &mut Vec<LevelIndex>,
    ) {
        let axis = prefix.len();
        if axis == weights.len() {
            out.push(LevelIndex::new(prefix.clone()));
            return;
        }
        let mut k = 0u32;
        loop {
            let used = weights[axis] * f64::from(k);
            if used > budget + Self::SLACK {
                break;
            }
            prefix.push(k);
            Self::collect(weights, budget - used, prefix, out);
            prefix.pop();
            k += 1;
        }
    }
}

impl IndexSetEnumerator for WeightedTotalDegree {
    fn admissible_set(&self, weights: &[f64], threshold: f64) -> Vec<LevelIndex> {
        if threshold < 0.0 || weights.iter().any(|&w| !(w > 0.0)) {
            return Vec::new();
        }
        let mut out = Vec::new();
        Self::collect(weights, threshold, &mut Vec::with_capacity(weights.len()), &mut out);
        out
    }
}

impl<F> IndexSetEnumerator for F
where
    F: Fn(&[f64], f64) -> Vec<LevelIndex>,
{
    fn admissible_set(&self, weights: &[f64], threshold: f64) -> Vec<LevelIndex> {
        self(weights, threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lvl(c: &[u32]) -> LevelIndex {
        LevelIndex::new(c.to_vec())
    }

    #[test]
    fn test_isotropic_total_degree() {
        let set = WeightedTotalDegree.admissible_set(&[1.0, 1.0], 1.0);
        assert_eq!(set, vec![lvl(&[0, 0]), lvl(&[0, 1]), lvl(&[1, 0])]);

        let set = WeightedTotalDegree.admissible_set(&[1.0, 1.0], 2.0);
        assert_eq!(set.len(), 6);
    }

    #[test]
    fn test_anisotropic_weights() {
        let set = WeightedTotalDegree.admissible_set(&[1.0, 2.0], 2.0);
        assert_eq!(
            set,
            vec![lvl(&[0, 0]), lvl(&[0, 1]), lvl(&[1, 0]), lvl(&[2, 0])]
        );
    }

    #[test]
    fn test_threshold_at_sum_of_weights_is_inclusive() {
        let set = WeightedTotalDegree.admissible_set(&[0.1], 0.1 + 0.1 + 0.1);
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_invalid_inputs_give_empty_set() {
        assert!(WeightedTotalDegree.admissible_set(&[1.0], -1.0).is_empty());
        assert!(WeightedTotalDegree.admissible_set(&[0.0, 1.0], 1.0).is_empty());
    }
}
