use std::fmt::Debug;

/// Distance metric abstraction for descriptor comparison.
///
/// Smaller distances mean more similar descriptors. Both descriptors must have the
/// same length; comparing descriptors of different lengths is a caller bug and
/// panics.
pub trait DistanceMetric: Clone + Copy + Debug + Default + Send + Sync + 'static {
    /// Calculates the distance between two descriptors.
    fn distance(a: &[f32], b: &[f32]) -> f32;

    /// Whether [`DistanceMetric::distance`] is only valid for unit-norm descriptors.
    fn requires_normalized_descriptors() -> bool;
}

/// Scaled squared L2 distance between unit-norm descriptors.
///
/// For unit vectors `|a - b|² = 2 (1 - a·b)`. The constant factor does not change
/// the ordering of distances so it is dropped and the metric computes `1 - a·b`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScaledL2Distance;

impl DistanceMetric for ScaledL2Distance {
    #[inline(always)]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(
            a.len(),
            b.len(),
            "descriptor lengths differ: {} != {}",
            a.len(),
            b.len()
        );
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        // rounding can push the dot product of equal unit vectors above one
        (1.0 - dot).max(0.0)
    }

    #[inline(always)]
    fn requires_normalized_descriptors() -> bool {
        true
    }
}

/// Squared L2 (Euclidean) distance for floating-point descriptors.
#[derive(Clone, Copy, Debug, Default)]
pub struct L2Distance;

impl DistanceMetric for L2Distance {
    #[inline(always)]
    fn distance(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(
            a.len(),
            b.len(),
            "descriptor lengths differ: {} != {}",
            a.len(),
            b.len()
        );
        let mut dist_sq = 0.0;
        for (x, y) in a.iter().zip(b.iter()) {
            let diff = x - y;
            dist_sq += diff * diff;
        }
        dist_sq
    }

    #[inline(always)]
    fn requires_normalized_descriptors() -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scaled_l2_distance() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        assert_relative_eq!(ScaledL2Distance::distance(&a, &a), 0.0);
        assert_relative_eq!(ScaledL2Distance::distance(&a, &b), 1.0);

        let c = [-1.0, 0.0, 0.0];
        assert_relative_eq!(ScaledL2Distance::distance(&a, &c), 2.0);
        assert!(ScaledL2Distance::requires_normalized_descriptors());
    }

    #[test]
    fn test_scaled_l2_is_never_negative() {
        // the squared components of a rounded unit vector rarely sum to exactly one
        for n in [3usize, 7, 31, 100, 128] {
            let a = vec![1.0 / (n as f32).sqrt(); n];
            let d = ScaledL2Distance::distance(&a, &a);
            assert!((0.0..1e-6).contains(&d), "n = {n}, distance = {d}");
        }
        let a = [0.6f32, 0.8, 0.0];
        let b = [0.6f32, 0.8 + f32::EPSILON, 0.0];
        assert!(ScaledL2Distance::distance(&a, &b) >= 0.0);
    }

    #[test]
    fn test_scaled_l2_is_half_squared_l2_on_unit_vectors() {
        let s = 0.5f32.sqrt();
        let a = [s, s, 0.0];
        let b = [0.0, s, s];
        assert_relative_eq!(
            2.0 * ScaledL2Distance::distance(&a, &b),
            L2Distance::distance(&a, &b),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_l2_distance() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 6.0, 3.0];
        // (4-1)^2 + (6-2)^2 + (3-3)^2 = 25
        assert_eq!(L2Distance::distance(&a, &b), 25.0);
        assert!(!L2Distance::requires_normalized_descriptors());
    }

    #[test]
    #[should_panic(expected = "descriptor lengths differ")]
    fn test_mismatched_lengths_panic() {
        ScaledL2Distance::distance(&[1.0, 0.0], &[1.0, 0.0, 0.0]);
    }
}
