use crate::camera::{Camera, CameraExtrinsics, CameraIntrinsics, Pose};
use crate::error::GeometryError;
use crate::linalg::{mat3_from_rows, svd3};
use crate::triangulation::{DltTriangulator, Triangulate};
use epipolar_matching::FeatureMatch;
use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

/// Build an essential matrix from a fundamental matrix and camera intrinsics.
///
/// E = K2ᵗ · F · K1
pub fn essential_from_fundamental(
    fundamental: &DMat3,
    intrinsics1: &CameraIntrinsics,
    intrinsics2: &CameraIntrinsics,
) -> DMat3 {
    intrinsics2.k().transpose() * *fundamental * intrinsics1.k()
}

/// Project a matrix onto the essential manifold, forcing its singular values to (1, 1, 0).
pub fn enforce_essential_constraints(essential: &DMat3) -> Result<DMat3, GeometryError> {
    let svd = svd3(essential)?;
    Ok(svd.recompose(DVec3::new(1.0, 1.0, 0.0)))
}

/// Decompose an essential matrix into its four candidate poses.
///
/// The matrix is first projected onto the essential manifold. Candidates are returned
/// in the order `(R1, t)`, `(R1, -t)`, `(R2, t)`, `(R2, -t)` with `R1 = U·W·Vᵗ`,
/// `R2 = U·Wᵗ·Vᵗ` and `t` the unit third column of `U`. A rotation with negative
/// determinant is negated.
pub fn decompose_essential(essential: &DMat3) -> Result<[Pose; 4], GeometryError> {
    let refined = enforce_essential_constraints(essential)?;
    let svd = svd3(&refined)?;

    let w = mat3_from_rows([[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
    let vt = svd.v.transpose();
    let r1 = proper_rotation(svd.u * w * vt);
    let r2 = proper_rotation(svd.u * w.transpose() * vt);
    let t = svd.u.z_axis;

    Ok([
        Pose::new(r1, t),
        Pose::new(r1, -t),
        Pose::new(r2, t),
        Pose::new(r2, -t),
    ])
}

fn proper_rotation(rotation: DMat3) -> DMat3 {
    if rotation.determinant() < 0.0 {
        -rotation
    } else {
        rotation
    }
}

/// Options of the essential matrix pose recovery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EssentialMatrixSolverOptions {
    /// Fraction of correspondences that must triangulate in front of both cameras
    /// under the chosen pose.
    pub min_points_visible_ratio: f64,
}

impl Default for EssentialMatrixSolverOptions {
    fn default() -> Self {
        Self {
            min_points_visible_ratio: 0.3,
        }
    }
}

/// Relative pose recovery from an essential matrix.
#[derive(Clone, Debug)]
pub struct EssentialMatrixSolver {
    options: EssentialMatrixSolverOptions,
}

impl EssentialMatrixSolver {
    /// Create a solver, checking that the visible ratio lies in [0, 1].
    pub fn new(options: EssentialMatrixSolverOptions) -> Result<Self, GeometryError> {
        let ratio = options.min_points_visible_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(GeometryError::InvalidVisibleRatio(ratio));
        }
        Ok(Self { options })
    }

    /// The options this solver runs with.
    pub fn options(&self) -> &EssentialMatrixSolverOptions {
        &self.options
    }

    /// See [`essential_from_fundamental`].
    pub fn compute_essential_matrix(
        &self,
        fundamental: &DMat3,
        intrinsics1: &CameraIntrinsics,
        intrinsics2: &CameraIntrinsics,
    ) -> DMat3 {
        essential_from_fundamental(fundamental, intrinsics1, intrinsics2)
    }

    /// Recover the pose of the second camera relative to the first, using linear
    /// triangulation for the visibility vote.
    pub fn compute_extrinsics(
        &self,
        essential: &DMat3,
        matches: &[FeatureMatch],
        intrinsics1: &CameraIntrinsics,
        intrinsics2: &CameraIntrinsics,
    ) -> Result<Pose, GeometryError> {
        self.compute_extrinsics_with(&DltTriangulator, essential, matches, intrinsics1, intrinsics2)
    }

    /// Recover the pose of the second camera relative to the first.
    ///
    /// The first camera is placed at the identity pose. Each of the four candidates of
    /// [`decompose_essential`] becomes the pose of the second camera, and a candidate
    /// scores one vote per correspondence that `triangulator` places in front of both
    /// cameras. The candidate with the most votes wins, the earliest on ties. The
    /// translation has unit length.
    ///
    /// # Errors
    ///
    /// - [`GeometryError::InsufficientCorrespondences`] for an empty match list.
    /// - [`GeometryError::SvdFailed`] when the essential matrix cannot be decomposed.
    /// - [`GeometryError::InsufficientVisiblePoints`] when the winner's votes are
    ///   below `min_points_visible_ratio` of the matches.
    pub fn compute_extrinsics_with<T: Triangulate + ?Sized>(
        &self,
        triangulator: &T,
        essential: &DMat3,
        matches: &[FeatureMatch],
        intrinsics1: &CameraIntrinsics,
        intrinsics2: &CameraIntrinsics,
    ) -> Result<Pose, GeometryError> {
        if matches.is_empty() {
            return Err(GeometryError::InsufficientCorrespondences {
                found: 0,
                required: 1,
            });
        }

        let candidates = decompose_essential(essential)?;
        let camera1 = Camera::new(*intrinsics1, CameraExtrinsics::default());

        let mut best_pose = candidates[0];
        let mut best_visible = 0;
        for (index, pose) in candidates.iter().enumerate() {
            let camera2 = Camera::new(*intrinsics2, CameraExtrinsics::new(*pose));
            let visible = matches
                .iter()
                .filter(|m| triangulator.triangulate(m, &camera1, &camera2).is_ok())
                .count();
            log::debug!("pose candidate {index}: {visible}/{} points visible", matches.len());

            if index == 0 || visible > best_visible {
                best_pose = *pose;
                best_visible = visible;
            }
        }

        let min_ratio = self.options.min_points_visible_ratio;
        if (best_visible as f64) < min_ratio * matches.len() as f64 {
            return Err(GeometryError::InsufficientVisiblePoints {
                visible: best_visible,
                total: matches.len(),
                min_ratio,
            });
        }

        Ok(best_pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::skew;
    use crate::triangulation::{Triangulation, TriangulationError};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::from_focal_length(520.0, 510.0, 320.0, 240.0)
    }

    fn observe(pose: &Pose, count: usize) -> Vec<FeatureMatch> {
        let camera1 = Camera::new(intrinsics(), CameraExtrinsics::default());
        let camera2 = Camera::new(intrinsics(), CameraExtrinsics::new(*pose));
        let mut rng = StdRng::seed_from_u64(4);

        let mut matches = Vec::with_capacity(count);
        while matches.len() < count {
            let world = DVec3::new(
                rng.random_range(-2.0..2.0),
                rng.random_range(-1.5..1.5),
                rng.random_range(4.0..9.0),
            );
            if let (Some(x1), Some(x2)) = (camera1.project(world), camera2.project(world)) {
                matches.push(FeatureMatch::from_coords(x1.x, x1.y, x2.x, x2.y));
            }
        }
        matches
    }

    fn assert_pose_eq(actual: &Pose, expected: &Pose) {
        assert!(
            actual.rotation.abs_diff_eq(expected.rotation, 1e-6),
            "rotation {:?} != {:?}",
            actual.rotation,
            expected.rotation
        );
        assert!(
            actual.translation.abs_diff_eq(expected.translation, 1e-6),
            "translation {:?} != {:?}",
            actual.translation,
            expected.translation
        );
    }

    #[test]
    fn test_essential_from_fundamental() {
        let f = mat3_from_rows([[0.0, -0.001, 0.01], [0.0015, 0.0, -0.02], [-0.01, 0.02, 1.0]]);
        let k1 = intrinsics();
        let k2 = CameraIntrinsics::from_focal_length(480.0, 480.0, 300.0, 200.0);

        let e = essential_from_fundamental(&f, &k1, &k2);
        assert_eq!(e, k2.k().transpose() * f * k1.k());
        assert_eq!(e, essential_from_fundamental(&f, &k1, &k2));
    }

    #[test]
    fn test_enforce_essential_constraints() -> Result<(), GeometryError> {
        let e = mat3_from_rows([[0.1, 0.4, -0.2], [0.2, -0.1, 0.5], [-0.3, 0.2, 0.3]]);
        let s = svd3(&enforce_essential_constraints(&e)?)?.s;
        assert_relative_eq!(s.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(s.y, 1.0, epsilon = 1e-12);
        assert!(s.z.abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_candidates_are_proper_rotations() -> Result<(), GeometryError> {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let cols = [(); 9].map(|_| rng.random_range(-1.0..1.0));
            for pose in decompose_essential(&DMat3::from_cols_array(&cols))? {
                assert_relative_eq!(pose.rotation.determinant(), 1.0, epsilon = 1e-9);
                let rrt = pose.rotation * pose.rotation.transpose();
                assert!(rrt.abs_diff_eq(DMat3::IDENTITY, 1e-9));
                assert_relative_eq!(pose.translation.length(), 1.0, epsilon = 1e-12);
            }
        }
        Ok(())
    }

    #[test]
    fn test_recovers_ground_truth_pose() -> Result<(), GeometryError> {
        let solver = EssentialMatrixSolver::new(EssentialMatrixSolverOptions::default())?;
        let rotations = [
            DMat3::IDENTITY,
            DMat3::from_rotation_y(0.15),
            DMat3::from_rotation_x(-0.1) * DMat3::from_rotation_z(0.3),
            DMat3::from_euler(glam::EulerRot::XYZ, 0.05, -0.2, 0.1),
        ];
        let translations = [
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(-0.3, 0.2, 0.1),
            DVec3::new(0.1, -0.5, -0.2),
        ];

        for rotation in rotations {
            for translation in translations {
                let truth = Pose::new(rotation, translation.normalize());
                let matches = observe(&truth, 40);
                let essential = skew(truth.translation) * truth.rotation;

                let pose =
                    solver.compute_extrinsics(&essential, &matches, &intrinsics(), &intrinsics())?;
                assert_pose_eq(&pose, &truth);
            }
        }
        Ok(())
    }

    #[test]
    fn test_recovers_pose_through_fundamental() -> Result<(), GeometryError> {
        let truth = Pose::new(
            DMat3::from_rotation_y(-0.2),
            DVec3::new(0.8, 0.1, -0.1).normalize(),
        );
        let matches = observe(&truth, 30);
        let k_inv = intrinsics().k().inverse();
        let fundamental = k_inv.transpose() * skew(truth.translation) * truth.rotation * k_inv;

        let solver = EssentialMatrixSolver::new(EssentialMatrixSolverOptions::default())?;
        // Scale and sign of F do not matter.
        let essential =
            solver.compute_essential_matrix(&(-3.0 * fundamental), &intrinsics(), &intrinsics());
        let pose = solver.compute_extrinsics(&essential, &matches, &intrinsics(), &intrinsics())?;
        assert_pose_eq(&pose, &truth);
        Ok(())
    }

    // Only correspondences with u1 < 2 triangulate.
    struct FirstTwoVisible;

    impl Triangulate for FirstTwoVisible {
        fn triangulate(
            &self,
            feature_match: &FeatureMatch,
            _camera1: &Camera,
            _camera2: &Camera,
        ) -> Result<Triangulation, TriangulationError> {
            if feature_match.feature1.u < 2.0 {
                Ok(Triangulation {
                    point: DVec3::Z,
                    reprojection_error: 0.0,
                })
            } else {
                Err(TriangulationError::PointAtInfinity)
            }
        }
    }

    #[test]
    fn test_too_few_visible_points() -> Result<(), GeometryError> {
        let matches = (0..10)
            .map(|i| FeatureMatch::from_coords(i as f64, 0.0, i as f64, 1.0))
            .collect::<Vec<_>>();
        let essential = skew(DVec3::X);
        let solver = EssentialMatrixSolver::new(EssentialMatrixSolverOptions {
            min_points_visible_ratio: 0.3,
        })?;

        let result = solver.compute_extrinsics_with(
            &FirstTwoVisible,
            &essential,
            &matches,
            &intrinsics(),
            &intrinsics(),
        );
        assert_eq!(
            result.unwrap_err(),
            GeometryError::InsufficientVisiblePoints {
                visible: 2,
                total: 10,
                min_ratio: 0.3
            }
        );

        let lenient = EssentialMatrixSolver::new(EssentialMatrixSolverOptions {
            min_points_visible_ratio: 0.2,
        })?;
        let pose = lenient.compute_extrinsics_with(
            &FirstTwoVisible,
            &essential,
            &matches,
            &intrinsics(),
            &intrinsics(),
        )?;
        // Every candidate ties, the first one wins.
        assert_eq!(pose, decompose_essential(&essential)?[0]);
        Ok(())
    }

    #[test]
    fn test_empty_matches_fail() -> Result<(), GeometryError> {
        let solver = EssentialMatrixSolver::new(EssentialMatrixSolverOptions::default())?;
        let result = solver.compute_extrinsics(&skew(DVec3::X), &[], &intrinsics(), &intrinsics());
        assert_eq!(
            result.unwrap_err(),
            GeometryError::InsufficientCorrespondences {
                found: 0,
                required: 1
            }
        );
        Ok(())
    }

    #[test]
    fn test_non_finite_essential_fails() -> Result<(), GeometryError> {
        let solver = EssentialMatrixSolver::new(EssentialMatrixSolverOptions::default())?;
        let mut essential = skew(DVec3::X);
        essential.y_axis.z = f64::NAN;
        let matches = observe(&Pose::new(DMat3::IDENTITY, DVec3::X), 10);
        let result = solver.compute_extrinsics(&essential, &matches, &intrinsics(), &intrinsics());
        assert_eq!(result.unwrap_err(), GeometryError::SvdFailed);
        Ok(())
    }

    #[test]
    fn test_invalid_ratio() {
        let result = EssentialMatrixSolver::new(EssentialMatrixSolverOptions {
            min_points_visible_ratio: 1.5,
        });
        assert_eq!(result.unwrap_err(), GeometryError::InvalidVisibleRatio(1.5));
    }

    #[test]
    fn test_options_from_json() {
        let options: EssentialMatrixSolverOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, EssentialMatrixSolverOptions::default());
    }
}
