#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Feature matching
//!
//! Turns two lists of keypoints with descriptors into a list of validated
//! correspondences, the raw input of the two-view geometry stage.
//!
//! - [`metric`]: descriptor distances and their normalization requirement
//! - [`feature`]: keypoints, features and the match types
//! - [`matcher`]: the [`FeatureMatcher`] capability and its options
//! - [`naive`]: brute-force nearest-neighbor matching
//!
//! ## Example
//!
//! ```rust
//! use epipolar_matching::{
//!     Feature, FeatureMatcher, FeatureMatcherOptions, NaiveFeatureMatcher, ScaledL2Distance,
//! };
//!
//! let mut features1 = vec![
//!     Feature::new(10.0, 20.0, vec![1.0, 0.0, 0.0]),
//!     Feature::new(30.0, 40.0, vec![0.0, 1.0, 0.0]),
//! ];
//! let mut features2 = vec![
//!     Feature::new(12.0, 21.0, vec![0.0, 2.0, 0.1]),
//!     Feature::new(11.0, 19.0, vec![3.0, 0.1, 0.0]),
//! ];
//!
//! let options = FeatureMatcherOptions {
//!     min_num_feature_matches: 2,
//!     ..Default::default()
//! };
//! let matcher = NaiveFeatureMatcher::<ScaledL2Distance>::new(options)?;
//! let matches = matcher.match_image_pair(&mut features1, &mut features2)?;
//! assert_eq!(matches.len(), 2);
//! # Ok::<(), epipolar_matching::MatchingError>(())
//! ```

/// Keypoints, features and correspondence types.
pub mod feature;

/// The feature matcher capability shared by all matching strategies.
pub mod matcher;

/// Descriptor distance metrics.
pub mod metric;

/// Brute-force feature matching.
pub mod naive;

pub use feature::{
    Descriptor, Feature, FeatureList, FeatureMatch, FeatureMatchList, Keypoint,
    LightFeatureMatch, LightFeatureMatchList,
};
pub use matcher::{symmetric_matches, FeatureMatcher, FeatureMatcherOptions, MatchingError};
pub use metric::{DistanceMetric, L2Distance, ScaledL2Distance};
pub use naive::NaiveFeatureMatcher;
