use epipolar_geometry::{
    solve_eight_point, CameraIntrinsics, EpipolarResidual, EssentialMatrixSolver,
    EssentialMatrixSolverOptions, FundamentalMatrixRansacModel, FundamentalMatrixRansacProblem,
    FundamentalMatrixSolverOptions, GeometryError, Pose,
};
use epipolar_matching::{
    DistanceMetric, Feature, FeatureMatch, FeatureMatcher, FeatureMatcherOptions, MatchingError,
    NaiveFeatureMatcher,
};
use epipolar_ransac::{Ransac, RansacError, RansacOptions};
use glam::DMat3;
use serde::{Deserialize, Serialize};

/// Errors returned by the two-view pipeline.
#[derive(Debug, thiserror::Error)]
pub enum TwoViewError {
    /// Feature matching failed.
    #[error("Feature matching failed: {0}")]
    Matching(#[from] MatchingError),

    /// Robust fundamental matrix estimation failed.
    #[error("Fundamental matrix estimation failed: {0}")]
    Ransac(#[from] RansacError),

    /// Essential matrix or pose recovery failed.
    #[error("Pose recovery failed: {0}")]
    Geometry(#[from] GeometryError),
}

/// Configuration of every stage of the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwoViewOptions {
    /// Feature matching.
    pub matcher: FeatureMatcherOptions,
    /// The consensus loop. `acceptable_error` is in units of `residual`.
    pub ransac: RansacOptions,
    /// The eight-point solver run on each sample.
    pub solver: FundamentalMatrixSolverOptions,
    /// Pose recovery.
    pub essential: EssentialMatrixSolverOptions,
    /// Number of correspondences per RANSAC sample.
    pub subsample_size: usize,
    /// Per-correspondence error of a fundamental matrix.
    pub residual: EpipolarResidual,
    /// Maximum number of eight-point refits of the RANSAC winner on its own inliers.
    /// Zero keeps the minimal-sample fundamental matrix.
    pub refinement_rounds: usize,
}

impl Default for TwoViewOptions {
    fn default() -> Self {
        Self {
            matcher: FeatureMatcherOptions::default(),
            ransac: RansacOptions::default(),
            solver: FundamentalMatrixSolverOptions::default(),
            essential: EssentialMatrixSolverOptions::default(),
            subsample_size: 8,
            residual: EpipolarResidual::default(),
            refinement_rounds: 3,
        }
    }
}

/// Output of the two-view pipeline.
#[derive(Clone, Debug)]
pub struct TwoViewResult {
    /// Fundamental matrix with unit Frobenius norm, `x2ᵗ · F · x1 = 0`.
    pub fundamental: DMat3,
    /// Essential matrix `K2ᵗ · F · K1`.
    pub essential: DMat3,
    /// World-to-camera pose of the second camera, the first camera at the identity.
    /// The translation has unit length.
    pub pose: Pose,
    /// Correspondences consistent with the fundamental matrix.
    pub inliers: Vec<FeatureMatch>,
}

/// Estimate the relative pose of two cameras from putative correspondences.
///
/// Runs RANSAC over the eight-point solver, refits the best fundamental matrix on
/// every correspondence it explains, and recovers the pose from the essential matrix
/// with a visibility vote over the final inliers.
pub fn estimate_pose_from_matches(
    matches: &[FeatureMatch],
    intrinsics1: &CameraIntrinsics,
    intrinsics2: &CameraIntrinsics,
    options: &TwoViewOptions,
) -> Result<TwoViewResult, TwoViewError> {
    let ransac = Ransac::new(options.ransac.clone())?;
    let essential_solver = EssentialMatrixSolver::new(options.essential.clone())?;

    let mut problem = FundamentalMatrixRansacProblem::new(
        matches.to_vec(),
        options.subsample_size,
        options.solver.clone(),
    )?
    .with_residual(options.residual);
    let estimate = ransac.run(&mut problem)?;

    let (model, inliers) = refine_on_inliers(
        estimate.model,
        matches,
        options.ransac.acceptable_error,
        options,
    );
    log::debug!(
        "fundamental matrix explains {}/{} matches after {} iterations",
        inliers.len(),
        matches.len(),
        estimate.num_iterations
    );

    let fundamental = model.fundamental();
    let essential = essential_solver.compute_essential_matrix(&fundamental, intrinsics1, intrinsics2);
    let pose = essential_solver.compute_extrinsics(&essential, &inliers, intrinsics1, intrinsics2)?;

    Ok(TwoViewResult {
        fundamental,
        essential,
        pose,
        inliers,
    })
}

/// Refit a fundamental matrix on its inliers until the inlier set stops changing.
///
/// RANSAC only scores the data outside each sample, so the winning sample may hold
/// an outlier that happens to lie near an epipolar line. A least-squares fit over the
/// whole consensus set removes its influence. A refit that explains fewer matches
/// than the current model is discarded.
fn refine_on_inliers(
    mut model: FundamentalMatrixRansacModel,
    matches: &[FeatureMatch],
    error_tolerance: f64,
    options: &TwoViewOptions,
) -> (FundamentalMatrixRansacModel, Vec<FeatureMatch>) {
    let mut inliers = model.select_inliers(matches, error_tolerance);
    for round in 0..options.refinement_rounds {
        let refit = match solve_eight_point(&inliers, &options.solver) {
            Ok(fundamental) => {
                FundamentalMatrixRansacModel::with_residual(fundamental, options.residual)
            }
            Err(err) => {
                log::debug!("refit {round} on {} inliers failed: {err}", inliers.len());
                break;
            }
        };
        let refit_inliers = refit.select_inliers(matches, error_tolerance);
        if refit_inliers.len() < inliers.len() {
            log::debug!(
                "refit {round} explains {} matches, keeping {}",
                refit_inliers.len(),
                inliers.len()
            );
            break;
        }

        let converged = refit_inliers == inliers;
        model = refit;
        inliers = refit_inliers;
        if converged {
            break;
        }
    }
    (model, inliers)
}

/// Match two feature lists by brute force under metric `D` and estimate the relative
/// pose of the cameras that observed them.
///
/// Descriptors are normalized in place when `D` requires it.
pub fn estimate_two_view<D: DistanceMetric>(
    features1: &mut [Feature],
    features2: &mut [Feature],
    intrinsics1: &CameraIntrinsics,
    intrinsics2: &CameraIntrinsics,
    options: &TwoViewOptions,
) -> Result<TwoViewResult, TwoViewError> {
    let matcher = NaiveFeatureMatcher::<D>::new(options.matcher.clone())?;
    estimate_two_view_with(&matcher, features1, features2, intrinsics1, intrinsics2, options)
}

/// Same as [`estimate_two_view`] with any matching strategy.
///
/// `options.matcher` is ignored; the matcher carries its own options.
pub fn estimate_two_view_with<M: FeatureMatcher + ?Sized>(
    matcher: &M,
    features1: &mut [Feature],
    features2: &mut [Feature],
    intrinsics1: &CameraIntrinsics,
    intrinsics2: &CameraIntrinsics,
    options: &TwoViewOptions,
) -> Result<TwoViewResult, TwoViewError> {
    let matches = matcher.match_image_pair(features1, features2)?;
    log::debug!(
        "{} matches between {} and {} features",
        matches.len(),
        features1.len(),
        features2.len()
    );
    estimate_pose_from_matches(&matches, intrinsics1, intrinsics2, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = TwoViewOptions::default();
        assert_eq!(options.subsample_size, 8);
        assert_eq!(options.matcher.min_num_feature_matches, 8);
        assert_eq!(options.ransac.iterations, 1000);
        assert_eq!(options.essential.min_points_visible_ratio, 0.3);
        assert_eq!(options.residual, EpipolarResidual::Algebraic);
        assert_eq!(options.refinement_rounds, 3);
    }

    #[test]
    fn test_partial_json_config() -> Result<(), serde_json::Error> {
        let options: TwoViewOptions = serde_json::from_str(
            r#"{
                "ransac": { "iterations": 200, "acceptable_error": 0.5 },
                "residual": "Sampson",
                "matcher": { "lowes_ratio": 0.8 }
            }"#,
        )?;
        assert_eq!(options.ransac.iterations, 200);
        assert_eq!(options.ransac.acceptable_error, 0.5);
        assert_eq!(options.ransac.minimum_num_inliers, 8);
        assert_eq!(options.residual, EpipolarResidual::Sampson);
        assert_eq!(options.matcher.lowes_ratio, 0.8);
        assert!(options.matcher.ensure_symmetric_matches);
        assert_eq!(options.subsample_size, 8);
        Ok(())
    }

    #[test]
    fn test_too_few_matches_is_an_error() {
        let matches = vec![FeatureMatch::from_coords(1.0, 2.0, 3.0, 4.0); 5];
        let intrinsics = CameraIntrinsics::default();
        let result =
            estimate_pose_from_matches(&matches, &intrinsics, &intrinsics, &TwoViewOptions::default());
        assert!(matches!(
            result,
            Err(TwoViewError::Ransac(RansacError::NoValidModel(1000)))
        ));
    }

    #[test]
    fn test_invalid_subsample_size() {
        let options = TwoViewOptions {
            subsample_size: 4,
            ..Default::default()
        };
        let intrinsics = CameraIntrinsics::default();
        let result = estimate_pose_from_matches(&[], &intrinsics, &intrinsics, &options);
        assert!(matches!(
            result,
            Err(TwoViewError::Geometry(GeometryError::InvalidSubsampleSize { found: 4, .. }))
        ));
    }
}
