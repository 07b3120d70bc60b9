//! Derived fairness statistics over cumulative face counts.

use serde::{Deserialize, Serialize};

use crate::constants::{EXPECTED_PROPORTION, FACE_COUNT};
use crate::face::{Face, FaceCounts};
use crate::numbers::count_to_f64;

/// Proportions, chi-square and maximum deviation for one `(counts, n)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub proportions: [f64; FACE_COUNT],
    pub chi2: f64,
    pub max_abs_dev: f64,
}

impl DerivedStats {
    /// Compute every statistic from `counts` against a total of `n`.
    ///
    /// `n` is taken as given rather than recomputed from `counts`; at
    /// `n == 0` every statistic is zero.
    #[must_use]
    pub fn compute(counts: &FaceCounts, n: u64) -> Self {
        let proportions = proportions(counts, n);
        Self {
            proportions,
            chi2: chi_square(counts, n),
            max_abs_dev: max_abs_deviation(&proportions),
        }
    }

    #[must_use]
    pub const fn proportion(&self, face: Face) -> f64 {
        self.proportions[face.index()]
    }
}

/// `counts[f] / n` per face; all zero when `n == 0`.
#[must_use]
pub fn proportions(counts: &FaceCounts, n: u64) -> [f64; FACE_COUNT] {
    let mut out = [0.0; FACE_COUNT];
    if n == 0 {
        return out;
    }
    let total = count_to_f64(n);
    for (face, count) in counts.iter() {
        out[face.index()] = count_to_f64(count) / total;
    }
    out
}

/// Pearson goodness-of-fit statistic against a uniform six-outcome null.
#[must_use]
pub fn chi_square(counts: &FaceCounts, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let expected = count_to_f64(n) / 6.0;
    counts
        .iter()
        .map(|(_, count)| {
            let diff = count_to_f64(count) - expected;
            diff * diff / expected
        })
        .sum()
}

/// Largest `|p - 1/6|` across faces; zero for an empty slice.
#[must_use]
pub fn max_abs_deviation(proportions: &[f64]) -> f64 {
    proportions
        .iter()
        .map(|p| (p - EXPECTED_PROPORTION).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn empty_counts_yield_zero_statistics() {
        let stats = DerivedStats::compute(&FaceCounts::default(), 0);
        assert_eq!(stats.proportions, [0.0; 6]);
        assert!(stats.chi2.abs() < TOLERANCE);
        assert!(stats.max_abs_dev.abs() < TOLERANCE);
    }

    #[test]
    fn proportions_sum_to_one() {
        let counts = FaceCounts::new([3, 7, 1, 0, 12, 4]);
        let stats = DerivedStats::compute(&counts, counts.total());
        let sum: f64 = stats.proportions.iter().sum();
        assert!((sum - 1.0).abs() < TOLERANCE);
        assert!((stats.proportion(Face::Five) - 12.0 / 27.0).abs() < TOLERANCE);
    }

    #[test]
    fn perfectly_uniform_counts_have_zero_chi_square() {
        let counts = FaceCounts::new([10; 6]);
        let stats = DerivedStats::compute(&counts, 60);
        assert!(stats.chi2.abs() < TOLERANCE);
        assert!(stats.max_abs_dev.abs() < TOLERANCE);
    }

    #[test]
    fn chi_square_matches_hand_computation() {
        // n = 12, so each face expects 2
        let counts = FaceCounts::new([6, 2, 2, 2, 0, 0]);
        let expected = ((6.0_f64 - 2.0).powi(2)
            + 3.0 * (2.0_f64 - 2.0).powi(2)
            + 2.0 * (0.0_f64 - 2.0).powi(2))
            / 2.0;
        assert!((chi_square(&counts, 12) - expected).abs() < TOLERANCE);
        assert!((expected - 12.0).abs() < TOLERANCE);
    }

    #[test]
    fn single_face_hits_maximum_deviation() {
        let counts = FaceCounts::new([0, 0, 0, 0, 0, 9]);
        let stats = DerivedStats::compute(&counts, 9);
        assert!((stats.max_abs_dev - 5.0 / 6.0).abs() < TOLERANCE);
        assert!((stats.chi2 - 45.0).abs() < TOLERANCE);
    }

    #[test]
    fn max_abs_deviation_of_empty_slice_is_zero() {
        assert!(max_abs_deviation(&[]).abs() < TOLERANCE);
    }
}
