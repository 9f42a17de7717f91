use crate::error::GeometryError;
use crate::linalg::{frobenius_norm, mat3_from_rows, svd3};
use epipolar_matching::FeatureMatch;
use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// Minimum number of correspondences of the eight-point solver.
pub const MIN_CORRESPONDENCES: usize = 8;

/// Options of the eight-point solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundamentalMatrixSolverOptions {
    /// Condition the linear system with Hartley normalization of both point sets.
    pub normalize_features: bool,
    /// Project the solution onto the rank-2 matrices.
    pub enforce_rank2: bool,
}

impl Default for FundamentalMatrixSolverOptions {
    fn default() -> Self {
        Self {
            normalize_features: true,
            enforce_rank2: true,
        }
    }
}

/// Estimate a fundamental matrix with the eight-point algorithm.
///
/// Solves `x2ᵗ · F · x1 = 0` in the least squares sense over all correspondences.
/// The result has unit Frobenius norm; its overall sign is arbitrary.
///
/// # Errors
///
/// - [`GeometryError::InsufficientCorrespondences`] for fewer than eight matches.
/// - [`GeometryError::DegenerateConfiguration`] when the points do not determine `F`.
/// - [`GeometryError::SvdFailed`] when a decomposition is not finite.
pub fn solve_eight_point(
    matches: &[FeatureMatch],
    options: &FundamentalMatrixSolverOptions,
) -> Result<DMat3, GeometryError> {
    if matches.len() < MIN_CORRESPONDENCES {
        return Err(GeometryError::InsufficientCorrespondences {
            found: matches.len(),
            required: MIN_CORRESPONDENCES,
        });
    }

    let points1 = matches
        .iter()
        .map(|m| DVec3::new(m.feature1.u, m.feature1.v, 1.0))
        .collect::<Vec<_>>();
    let points2 = matches
        .iter()
        .map(|m| DVec3::new(m.feature2.u, m.feature2.v, 1.0))
        .collect::<Vec<_>>();

    let (t1, t2) = if options.normalize_features {
        (hartley_transform(&points1)?, hartley_transform(&points2)?)
    } else {
        (DMat3::IDENTITY, DMat3::IDENTITY)
    };

    // one row per correspondence of the system A · vec(F) = 0, F stored row-major
    let mut a = faer::Mat::<f64>::zeros(matches.len(), 9);
    for (i, (p1, p2)) in points1.iter().zip(&points2).enumerate() {
        let x1 = t1 * *p1;
        let x2 = t2 * *p2;
        let row = [
            x2.x * x1.x,
            x2.x * x1.y,
            x2.x,
            x2.y * x1.x,
            x2.y * x1.y,
            x2.y,
            x1.x,
            x1.y,
            1.0,
        ];
        for (j, value) in row.into_iter().enumerate() {
            a.write(i, j, value);
        }
    }

    let svd = a.svd();
    let v = svd.v();
    let f = v.col(8);
    let mut fundamental = mat3_from_rows([
        [f.read(0), f.read(1), f.read(2)],
        [f.read(3), f.read(4), f.read(5)],
        [f.read(6), f.read(7), f.read(8)],
    ]);
    if !fundamental.is_finite() {
        return Err(GeometryError::SvdFailed);
    }

    if options.enforce_rank2 {
        let svd = svd3(&fundamental)?;
        fundamental = svd.recompose(DVec3::new(svd.s.x, svd.s.y, 0.0));
    }

    let fundamental = t2.transpose() * fundamental * t1;
    let norm = frobenius_norm(&fundamental);
    if !norm.is_finite() || norm < f64::EPSILON {
        return Err(GeometryError::DegenerateConfiguration);
    }

    Ok(fundamental / norm)
}

// Similarity moving the centroid to the origin with mean distance sqrt(2).
fn hartley_transform(points: &[DVec3]) -> Result<DMat3, GeometryError> {
    let n = points.len() as f64;
    let centroid = points.iter().fold(DVec3::ZERO, |acc, p| acc + *p) / n;
    let mean_dist = points
        .iter()
        .map(|p| (p.x - centroid.x).hypot(p.y - centroid.y))
        .sum::<f64>()
        / n;

    if !mean_dist.is_finite() || mean_dist < f64::EPSILON {
        return Err(GeometryError::DegenerateConfiguration);
    }

    let scale = std::f64::consts::SQRT_2 / mean_dist;
    Ok(mat3_from_rows([
        [scale, 0.0, -scale * centroid.x],
        [0.0, scale, -scale * centroid.y],
        [0.0, 0.0, 1.0],
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::skew;
    use approx::assert_relative_eq;
    use glam::DVec2;

    // Projects a fixed cloud through two cameras with K = diag(500, 500, 1) + (320, 240).
    fn scene() -> (Vec<FeatureMatch>, DMat3) {
        let k = mat3_from_rows([[500.0, 0.0, 320.0], [0.0, 500.0, 240.0], [0.0, 0.0, 1.0]]);
        let rotation = DMat3::from_rotation_y(0.2) * DMat3::from_rotation_z(0.05);
        let translation = DVec3::new(1.0, 0.1, 0.2).normalize();

        let project = |p: DVec3| {
            let h = k * (p / p.z);
            DVec2::new(h.x, h.y)
        };

        let mut matches = Vec::new();
        for i in 0..20 {
            let t = i as f64;
            let world = DVec3::new(
                (t * 0.7).sin() * 1.5,
                (t * 1.3).cos() * 1.2,
                5.0 + (t * 0.9).sin() * 1.5,
            );
            let x1 = project(world);
            let x2 = project(rotation * world + translation);
            matches.push(FeatureMatch::from_coords(x1.x, x1.y, x2.x, x2.y));
        }

        let k_inv = k.inverse();
        let f = k_inv.transpose() * skew(translation) * rotation * k_inv;
        (matches, f / frobenius_norm(&f))
    }

    fn epipolar_residual(f: &DMat3, m: &FeatureMatch) -> f64 {
        let x1 = DVec3::new(m.feature1.u, m.feature1.v, 1.0);
        let x2 = DVec3::new(m.feature2.u, m.feature2.v, 1.0);
        x2.dot(*f * x1)
    }

    fn assert_same_up_to_sign(a: &DMat3, b: &DMat3) {
        let sign = if a.to_cols_array()[8] * b.to_cols_array()[8] < 0.0 {
            -1.0
        } else {
            1.0
        };
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array()) {
            assert_relative_eq!(*x, sign * y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_recovers_fundamental_matrix() -> Result<(), GeometryError> {
        let (matches, f_true) = scene();
        let f = solve_eight_point(&matches, &FundamentalMatrixSolverOptions::default())?;

        assert_relative_eq!(frobenius_norm(&f), 1.0, epsilon = 1e-12);
        assert_same_up_to_sign(&f, &f_true);
        for m in &matches {
            assert!(epipolar_residual(&f, m).abs() < 1e-8);
        }
        Ok(())
    }

    #[test]
    fn test_minimal_sample_is_rank_two() -> Result<(), GeometryError> {
        let (matches, f_true) = scene();
        let f = solve_eight_point(&matches[..8], &FundamentalMatrixSolverOptions::default())?;

        assert!(svd3(&f)?.s.z.abs() < 1e-12);
        assert_same_up_to_sign(&f, &f_true);
        Ok(())
    }

    #[test]
    fn test_without_normalization() -> Result<(), GeometryError> {
        let (matches, _) = scene();
        let options = FundamentalMatrixSolverOptions {
            normalize_features: false,
            enforce_rank2: false,
        };
        let f = solve_eight_point(&matches, &options)?;
        for m in &matches {
            assert!(epipolar_residual(&f, m).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_too_few_correspondences() {
        let (matches, _) = scene();
        let result = solve_eight_point(&matches[..7], &FundamentalMatrixSolverOptions::default());
        assert_eq!(
            result.unwrap_err(),
            GeometryError::InsufficientCorrespondences {
                found: 7,
                required: 8
            }
        );
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        let matches = vec![FeatureMatch::from_coords(10.0, 10.0, 20.0, 20.0); 8];
        let result = solve_eight_point(&matches, &FundamentalMatrixSolverOptions::default());
        assert_eq!(result.unwrap_err(), GeometryError::DegenerateConfiguration);
    }
}
