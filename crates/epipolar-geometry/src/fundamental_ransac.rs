use crate::eight_point::{solve_eight_point, FundamentalMatrixSolverOptions, MIN_CORRESPONDENCES};
use crate::error::GeometryError;
use epipolar_matching::FeatureMatch;
use epipolar_ransac::{RansacModel, RansacProblem, ShuffledDataset};
use glam::{DMat3, DVec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Per-correspondence error of a fundamental matrix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpipolarResidual {
    /// Squared algebraic residual `(x2ᵗ · F · x1)²`.
    #[default]
    Algebraic,
    /// First-order geometric (Sampson) error, in squared pixels.
    Sampson,
}

impl EpipolarResidual {
    /// Evaluate the residual of one correspondence.
    pub fn evaluate(&self, fundamental: &DMat3, feature_match: &FeatureMatch) -> f64 {
        let x1 = DVec3::new(feature_match.feature1.u, feature_match.feature1.v, 1.0);
        let x2 = DVec3::new(feature_match.feature2.u, feature_match.feature2.v, 1.0);
        let fx1 = *fundamental * x1;
        let r = x2.dot(fx1);

        match self {
            EpipolarResidual::Algebraic => r * r,
            EpipolarResidual::Sampson => {
                let ftx2 = fundamental.transpose() * x2;
                let denom = fx1.x * fx1.x + fx1.y * fx1.y + ftx2.x * ftx2.x + ftx2.y * ftx2.y;
                if denom <= f64::EPSILON {
                    return f64::INFINITY;
                }
                r * r / denom
            }
        }
    }
}

/// A fundamental matrix hypothesis scored one correspondence at a time.
///
/// The default model is the identity matrix, which explains no real correspondence.
#[derive(Clone, Debug)]
pub struct FundamentalMatrixRansacModel {
    fundamental: DMat3,
    residual: EpipolarResidual,
    error: f64,
}

impl Default for FundamentalMatrixRansacModel {
    fn default() -> Self {
        Self::new(DMat3::IDENTITY)
    }
}

impl FundamentalMatrixRansacModel {
    /// Wrap a fundamental matrix, scored with the algebraic residual.
    pub fn new(fundamental: DMat3) -> Self {
        Self::with_residual(fundamental, EpipolarResidual::default())
    }

    /// Wrap a fundamental matrix, scored with the given residual.
    pub fn with_residual(fundamental: DMat3, residual: EpipolarResidual) -> Self {
        Self {
            fundamental,
            residual,
            error: 0.0,
        }
    }

    /// The fundamental matrix.
    pub fn fundamental(&self) -> DMat3 {
        self.fundamental
    }

    /// The residual this model is scored with.
    pub fn residual(&self) -> EpipolarResidual {
        self.residual
    }

    /// Every correspondence whose residual is below `error_tolerance`, in input order.
    pub fn select_inliers(
        &self,
        matches: &[FeatureMatch],
        error_tolerance: f64,
    ) -> Vec<FeatureMatch> {
        matches
            .iter()
            .filter(|m| self.residual.evaluate(&self.fundamental, m) < error_tolerance)
            .copied()
            .collect()
    }
}

impl RansacModel for FundamentalMatrixRansacModel {
    type Datum = FeatureMatch;

    fn error(&self) -> f64 {
        self.error
    }

    fn is_good_fit(&mut self, datum: &FeatureMatch, error_tolerance: f64) -> bool {
        self.error = self.residual.evaluate(&self.fundamental, datum);
        self.error < error_tolerance
    }
}

/// Robust fundamental matrix estimation over a set of correspondences.
///
/// Each round fits the eight-point solver to the first `subsample_size`
/// correspondences of a fresh permutation.
#[derive(Clone, Debug)]
pub struct FundamentalMatrixRansacProblem {
    dataset: ShuffledDataset<FeatureMatch>,
    solver_options: FundamentalMatrixSolverOptions,
    residual: EpipolarResidual,
}

impl FundamentalMatrixRansacProblem {
    /// Create a problem over `matches`.
    ///
    /// Fails when `subsample_size` is below the eight correspondences the solver needs.
    pub fn new(
        matches: Vec<FeatureMatch>,
        subsample_size: usize,
        solver_options: FundamentalMatrixSolverOptions,
    ) -> Result<Self, GeometryError> {
        if subsample_size < MIN_CORRESPONDENCES {
            return Err(GeometryError::InvalidSubsampleSize {
                found: subsample_size,
                minimum: MIN_CORRESPONDENCES,
            });
        }
        Ok(Self {
            dataset: ShuffledDataset::new(matches, subsample_size),
            solver_options,
            residual: EpipolarResidual::default(),
        })
    }

    /// Score fitted models with `residual`.
    pub fn with_residual(mut self, residual: EpipolarResidual) -> Self {
        self.residual = residual;
        self
    }

    /// All correspondences, in the order of the last permutation.
    pub fn matches(&self) -> &[FeatureMatch] {
        self.dataset.data()
    }

    /// Give back the correspondences.
    pub fn into_matches(self) -> Vec<FeatureMatch> {
        self.dataset.into_inner()
    }
}

impl RansacProblem for FundamentalMatrixRansacProblem {
    type Datum = FeatureMatch;
    type Model = FundamentalMatrixRansacModel;

    fn shuffle_data<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.dataset.shuffle(rng);
    }

    fn sample_data(&self) -> &[FeatureMatch] {
        self.dataset.sample()
    }

    fn remaining_data(&self) -> &[FeatureMatch] {
        self.dataset.remaining()
    }

    fn fit_model(&self, sample: &[FeatureMatch]) -> Option<FundamentalMatrixRansacModel> {
        match solve_eight_point(sample, &self.solver_options) {
            Ok(fundamental) => Some(FundamentalMatrixRansacModel::with_residual(
                fundamental,
                self.residual,
            )),
            Err(err) => {
                log::trace!("eight-point solver failed on sample: {err}");
                None
            }
        }
    }
}
