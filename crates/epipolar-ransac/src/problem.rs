use rand::Rng;

/// A candidate model that can score one data point at a time.
pub trait RansacModel {
    /// The data point type the model is evaluated on.
    type Datum;

    /// Error of the last data point passed to [`RansacModel::is_good_fit`].
    fn error(&self) -> f64;

    /// Evaluate the model on one data point and record its error.
    ///
    /// Returns `true` iff the error is below `error_tolerance`.
    fn is_good_fit(&mut self, datum: &Self::Datum, error_tolerance: f64) -> bool;
}

/// A dataset together with a minimal solver for one model type.
///
/// [`RansacProblem::sample_data`] and [`RansacProblem::remaining_data`] must be
/// derived from the same permutation, set by the last call to
/// [`RansacProblem::shuffle_data`]: they never overlap and together cover the
/// whole dataset.
pub trait RansacProblem {
    /// The data point type.
    type Datum;

    /// The model fitted by this problem.
    type Model: RansacModel<Datum = Self::Datum>;

    /// Draw a new random permutation of the dataset.
    fn shuffle_data<R: Rng + ?Sized>(&mut self, rng: &mut R);

    /// The minimal sample of the current permutation.
    fn sample_data(&self) -> &[Self::Datum];

    /// Every data point of the current permutation that is not in the sample.
    fn remaining_data(&self) -> &[Self::Datum];

    /// Fit a model to a sample.
    ///
    /// Returns `None` when the sample is degenerate; the engine counts it as a
    /// candidate with no support.
    fn fit_model(&self, sample: &[Self::Datum]) -> Option<Self::Model>;
}
