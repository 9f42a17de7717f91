use crate::problem::{RansacModel, RansacProblem};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Error types for the RANSAC engine.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RansacError {
    /// The iteration budget is zero.
    #[error("RANSAC needs at least one iteration")]
    ZeroIterations,

    /// The inlier tolerance is negative or not finite.
    #[error("Invalid acceptable error {0}, expected a finite non-negative value")]
    InvalidAcceptableError(f64),

    /// The confidence is outside (0, 1).
    #[error("Invalid confidence {0}, expected a value in (0, 1)")]
    InvalidConfidence(f64),

    /// Every sample drawn was degenerate.
    #[error("No model could be fitted in {0} iterations")]
    NoValidModel(usize),

    /// The best model did not reach the inlier floor.
    #[error("Best model has {found} inliers, at least {required} are required")]
    InsufficientSupport {
        /// Number of inliers of the best model.
        found: usize,
        /// Minimum number of inliers required.
        required: usize,
    },
}

/// Parameters of the consensus loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacOptions {
    /// Maximum number of sample/fit/score iterations.
    pub iterations: usize,
    /// A data point is an inlier when its model error is strictly below this value.
    pub acceptable_error: f64,
    /// Minimum number of inliers the best model must have.
    pub minimum_num_inliers: usize,
    /// Desired probability that at least one sample is outlier free.
    ///
    /// When set, the iteration budget shrinks as better models are found.
    /// `iterations` stays the hard ceiling.
    pub confidence: Option<f64>,
    /// Optional fixed seed for reproducible sampling.
    pub random_seed: Option<u64>,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            iterations: 1000,
            acceptable_error: 1e-3,
            minimum_num_inliers: 8,
            confidence: None,
            random_seed: None,
        }
    }
}

impl RansacOptions {
    /// Check that the options describe a runnable search.
    pub fn validate(&self) -> Result<(), RansacError> {
        if self.iterations == 0 {
            return Err(RansacError::ZeroIterations);
        }
        if !self.acceptable_error.is_finite() || self.acceptable_error < 0.0 {
            return Err(RansacError::InvalidAcceptableError(self.acceptable_error));
        }
        if let Some(confidence) = self.confidence {
            if !(confidence > 0.0 && confidence < 1.0) {
                return Err(RansacError::InvalidConfidence(confidence));
            }
        }
        Ok(())
    }
}

/// Outcome of a successful run.
#[derive(Clone, Debug)]
pub struct RansacResult<M> {
    /// The model with the largest support.
    pub model: M,
    /// Number of remaining data points the model explains.
    pub num_inliers: usize,
    /// Sum of the model errors over its inliers.
    pub inlier_error: f64,
    /// Number of iterations actually run.
    pub num_iterations: usize,
}

/// Number of iterations needed to draw one outlier-free sample with probability
/// `confidence`, given the fraction of inliers and the sample size.
///
/// Returns `usize::MAX` when no finite bound exists (no inliers, or a sample that is
/// too unlikely to be clean to be representable).
pub fn required_iterations(confidence: f64, inlier_ratio: f64, sample_size: usize) -> usize {
    if inlier_ratio <= 0.0 {
        return usize::MAX;
    }
    if inlier_ratio >= 1.0 {
        return 1;
    }

    let clean_sample = inlier_ratio.powi(sample_size as i32);
    let log_denom = (1.0 - clean_sample).ln();
    if !log_denom.is_finite() || log_denom >= 0.0 {
        return usize::MAX;
    }

    let estimate = ((1.0 - confidence).ln() / log_denom).ceil();
    if estimate.is_finite() && estimate >= 1.0 {
        estimate as usize
    } else if estimate.is_finite() {
        1
    } else {
        usize::MAX
    }
}

/// The random sample consensus engine.
#[derive(Clone, Debug)]
pub struct Ransac {
    options: RansacOptions,
}

impl Ransac {
    /// Create an engine from validated options.
    pub fn new(options: RansacOptions) -> Result<Self, RansacError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// The options this engine runs with.
    pub fn options(&self) -> &RansacOptions {
        &self.options
    }

    /// Run the search, drawing samples from a generator seeded by
    /// [`RansacOptions::random_seed`] or, if unset, from the thread-local generator.
    pub fn run<P: RansacProblem>(
        &self,
        problem: &mut P,
    ) -> Result<RansacResult<P::Model>, RansacError> {
        let mut rng = match self.options.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        self.run_with_rng(problem, &mut rng)
    }

    /// Run the search with a caller-supplied generator.
    ///
    /// Each iteration shuffles the problem, fits a model to the minimal sample and
    /// counts the remaining data points it explains. The model with the most inliers
    /// wins; among equal counts the lower summed inlier error wins, and among equal
    /// errors the earliest model is kept.
    pub fn run_with_rng<P, R>(
        &self,
        problem: &mut P,
        rng: &mut R,
    ) -> Result<RansacResult<P::Model>, RansacError>
    where
        P: RansacProblem,
        R: Rng + ?Sized,
    {
        let tolerance = self.options.acceptable_error;
        let mut best: Option<(P::Model, usize, f64)> = None;
        let mut max_iterations = self.options.iterations;
        let mut iteration = 0;

        while iteration < max_iterations {
            iteration += 1;

            problem.shuffle_data(rng);
            let Some(mut model) = problem.fit_model(problem.sample_data()) else {
                log::trace!("iteration {iteration}: degenerate sample");
                continue;
            };

            let remaining = problem.remaining_data();
            let mut num_inliers = 0;
            let mut inlier_error = 0.0;
            for datum in remaining {
                if model.is_good_fit(datum, tolerance) {
                    num_inliers += 1;
                    inlier_error += model.error();
                }
            }
            log::trace!("iteration {iteration}: {num_inliers} inliers, error {inlier_error}");

            let improved = match &best {
                None => true,
                Some((_, best_inliers, best_error)) => {
                    num_inliers > *best_inliers
                        || (num_inliers == *best_inliers && inlier_error < *best_error)
                }
            };
            if !improved {
                continue;
            }

            if let Some(confidence) = self.options.confidence {
                if !remaining.is_empty() {
                    let inlier_ratio = num_inliers as f64 / remaining.len() as f64;
                    let sample_size = problem.sample_data().len();
                    let needed = required_iterations(confidence, inlier_ratio, sample_size);
                    max_iterations = max_iterations.min(needed.max(iteration));
                }
            }
            best = Some((model, num_inliers, inlier_error));
        }

        let Some((model, num_inliers, inlier_error)) = best else {
            log::debug!("RANSAC found no valid model in {iteration} iterations");
            return Err(RansacError::NoValidModel(iteration));
        };

        log::debug!(
            "RANSAC best model: {num_inliers} inliers, error {inlier_error}, {iteration} iterations"
        );

        if num_inliers < self.options.minimum_num_inliers {
            return Err(RansacError::InsufficientSupport {
                found: num_inliers,
                required: self.options.minimum_num_inliers,
            });
        }

        Ok(RansacResult {
            model,
            num_inliers,
            inlier_error,
            num_iterations: iteration,
        })
    }
}
