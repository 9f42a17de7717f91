/// Failures of the fundamental and essential matrix stages.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    /// The singular value decomposition produced non-finite values.
    #[error("Singular value decomposition produced non-finite values")]
    SvdFailed,

    /// Not enough correspondences for the requested computation.
    #[error("Need at least {required} correspondences, got {found}")]
    InsufficientCorrespondences {
        /// Number of correspondences given.
        found: usize,
        /// Minimum number of correspondences required.
        required: usize,
    },

    /// The correspondences do not constrain the model.
    #[error("Degenerate correspondence configuration")]
    DegenerateConfiguration,

    /// The minimal sample size cannot fit a model.
    #[error("Invalid subsample size {found}, at least {minimum} is required")]
    InvalidSubsampleSize {
        /// The configured subsample size.
        found: usize,
        /// The smallest usable subsample size.
        minimum: usize,
    },

    /// The minimum visible ratio is outside [0, 1].
    #[error("Invalid minimum visible points ratio {0}, expected a value in [0, 1]")]
    InvalidVisibleRatio(f64),

    /// No candidate pose explains enough correspondences.
    #[error("Only {visible} of {total} points are in front of both cameras (minimum ratio {min_ratio})")]
    InsufficientVisiblePoints {
        /// Visible points of the best candidate pose.
        visible: usize,
        /// Number of correspondences voted on.
        total: usize,
        /// Configured minimum visible ratio.
        min_ratio: f64,
    },
}
