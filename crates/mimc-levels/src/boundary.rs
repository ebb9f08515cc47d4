//! Boundary detection on level sets
//!
//! The outer shell of a downward-closed level set approximates the tail of the
//! multi-index expansion; the classical estimator sums the contributions of
//! these levels to estimate the discretization bias.

use mimc_core::LevelSet;

/// Flag every level of `levels` that lies on the boundary
///
/// A level is on the boundary when, along at least one axis, its component is
/// strictly positive and its forward neighbour along that axis is not in the
/// set. The single level of a singleton set is always on the boundary.
pub fn boundary_mask(levels: &LevelSet) -> Vec<bool> {
    if levels.len() == 1 {
        return vec![true];
    }
    levels
        .iter()
        .map(|level| {
            (0..levels.dim()).any(|axis| {
                level.get(axis) > 0 && !levels.contains(&level.incremented(axis))
            })
        })
        .collect()
}

/// Positions of the boundary levels, in insertion order
pub fn boundary_positions(levels: &LevelSet) -> Vec<usize> {
    boundary_mask(levels)
        .into_iter()
        .enumerate()
        .filter_map(|(i, on_boundary)| on_boundary.then_some(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimc_core::LevelIndex;

    fn set(dim: usize, levels: &[&[u32]]) -> LevelSet {
        LevelSet::from_levels(
            dim,
            levels.iter().map(|c| LevelIndex::new(c.to_vec())).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_singleton_is_boundary() {
        assert_eq!(boundary_mask(&set(1, &[&[0]])), vec![true]);
        assert_eq!(boundary_mask(&set(2, &[&[3, 1]])), vec![true]);
    }

    #[test]
    fn test_one_dimensional_chain_has_last_level_on_boundary() {
        let levels = set(1, &[&[0], &[1], &[2]]);
        assert_eq!(boundary_mask(&levels), vec![false, false, true]);
        assert_eq!(boundary_positions(&levels), vec![2]);
    }

    #[test]
    fn test_tensor_square_boundary() {
        let levels = set(2, &[&[0, 0], &[0, 1], &[1, 0], &[1, 1]]);
        assert_eq!(boundary_mask(&levels), vec![false, true, true, true]);
    }

    #[test]
    fn test_total_degree_triangle_boundary() {
        let levels = set(2, &[&[0, 0], &[1, 0], &[0, 1], &[2, 0], &[1, 1], &[0, 2]]);
        assert_eq!(
            boundary_mask(&levels),
            vec![false, false, false, true, true, true]
        );
    }
}
