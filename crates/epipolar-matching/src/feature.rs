use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A feature descriptor vector.
pub type Descriptor = Vec<f32>;

/// A 2d image location in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// Horizontal image coordinate.
    pub u: f64,
    /// Vertical image coordinate.
    pub v: f64,
}

impl Keypoint {
    /// Create a keypoint from its image coordinates.
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// A keypoint together with its descriptor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Location of the feature in its image.
    pub keypoint: Keypoint,
    /// Appearance descriptor of the feature.
    pub descriptor: Descriptor,
}

/// The features extracted from one image, in extraction order.
pub type FeatureList = Vec<Feature>;

impl Feature {
    /// Create a feature from its image coordinates and descriptor.
    pub fn new(u: f64, v: f64, descriptor: Descriptor) -> Self {
        Self {
            keypoint: Keypoint::new(u, v),
            descriptor,
        }
    }

    /// Scale the descriptor in place to unit L2 norm.
    ///
    /// Idempotent: normalizing an already normalized descriptor leaves it unchanged.
    /// A zero descriptor is left untouched.
    pub fn normalize_descriptor(&mut self) {
        let norm = self
            .descriptor
            .iter()
            .map(|x| x * x)
            .sum::<f32>()
            .sqrt();
        if norm > f32::EPSILON {
            self.descriptor.iter_mut().for_each(|x| *x /= norm);
        }
    }
}

/// A validated correspondence between a feature in image 1 and one in image 2.
///
/// Holds copies of both image locations and no reference back to the source images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatch {
    /// Location of the matched feature in image 1.
    pub feature1: Keypoint,
    /// Location of the matched feature in image 2.
    pub feature2: Keypoint,
}

/// A list of correspondences between two images.
pub type FeatureMatchList = Vec<FeatureMatch>;

impl FeatureMatch {
    /// Create a correspondence from a pair of keypoints.
    pub fn new(feature1: Keypoint, feature2: Keypoint) -> Self {
        Self { feature1, feature2 }
    }

    /// Create a correspondence from raw image coordinates.
    pub fn from_coords(u1: f64, v1: f64, u2: f64, v2: f64) -> Self {
        Self::new(Keypoint::new(u1, v1), Keypoint::new(u2, v2))
    }
}

/// Index-only match used while matching, before promotion to [`FeatureMatch`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightFeatureMatch {
    /// Index into the features of the query image.
    pub feature_index1: usize,
    /// Index into the features of the train image.
    pub feature_index2: usize,
    /// Descriptor distance between the two features.
    pub distance: f32,
}

/// A list of index-only matches.
pub type LightFeatureMatchList = Vec<LightFeatureMatch>;

impl LightFeatureMatch {
    /// Create an index-only match.
    pub fn new(feature_index1: usize, feature_index2: usize, distance: f32) -> Self {
        Self {
            feature_index1,
            feature_index2,
            distance,
        }
    }

    /// Total order by distance, ties broken by the train index and then the query index.
    ///
    /// Used with partial sorts so that the two closest candidates are the same on every run.
    pub fn sort_by_distance(a: &Self, b: &Self) -> Ordering {
        a.distance
            .total_cmp(&b.distance)
            .then(a.feature_index2.cmp(&b.feature_index2))
            .then(a.feature_index1.cmp(&b.feature_index1))
    }

    /// The same match seen from the other image.
    pub fn reversed(&self) -> Self {
        Self::new(self.feature_index2, self.feature_index1, self.distance)
    }
}
