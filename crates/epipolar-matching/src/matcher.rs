use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::feature::{Feature, FeatureMatchList, LightFeatureMatch, LightFeatureMatchList};

/// Errors returned by feature matchers.
#[derive(Debug, Error, PartialEq)]
pub enum MatchingError {
    /// Too few one-directional matches survived the nearest neighbor search.
    #[error("found {found} putative matches, at least {required} are required")]
    InsufficientMatches {
        /// Number of matches found.
        found: usize,
        /// Minimum number of matches configured.
        required: usize,
    },

    /// Too few matches survived the symmetry check.
    #[error("found {found} symmetric matches, at least {required} are required")]
    InsufficientSymmetricMatches {
        /// Number of matches found.
        found: usize,
        /// Minimum number of matches configured.
        required: usize,
    },

    /// The configured Lowe's ratio is outside of (0, 1).
    #[error("lowes ratio must be in (0, 1), got {0}")]
    InvalidLowesRatio(f64),
}

/// Options shared by all feature matchers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureMatcherOptions {
    /// Image pairs with fewer matches than this are rejected.
    pub min_num_feature_matches: usize,
    /// Only keep matches that are mutual nearest neighbors.
    pub ensure_symmetric_matches: bool,
    /// Apply Lowe's ratio test to the two closest candidates.
    pub use_lowes_ratio: bool,
    /// Ratio between best and second best descriptor distance, in (0, 1).
    pub lowes_ratio: f64,
}

impl Default for FeatureMatcherOptions {
    fn default() -> Self {
        Self {
            min_num_feature_matches: 8,
            ensure_symmetric_matches: true,
            use_lowes_ratio: true,
            lowes_ratio: 0.75,
        }
    }
}

impl FeatureMatcherOptions {
    /// Check that the options describe a usable matcher.
    pub fn validate(&self) -> Result<(), MatchingError> {
        if self.use_lowes_ratio && !(self.lowes_ratio > 0.0 && self.lowes_ratio < 1.0) {
            return Err(MatchingError::InvalidLowesRatio(self.lowes_ratio));
        }
        Ok(())
    }
}

/// Capability shared by all feature matching strategies.
///
/// Implementations differ in how nearest neighbors are searched, not in the
/// contract: same ordering, same ratio test, same symmetry check.
pub trait FeatureMatcher {
    /// The options the matcher was configured with.
    fn options(&self) -> &FeatureMatcherOptions;

    /// Match the features of two images.
    ///
    /// The returned matches are ordered by the index of their feature in image 1.
    ///
    /// NOTE: descriptors of both feature lists are normalized in place when the
    /// distance metric requires it, so the caller's feature store is modified.
    fn match_image_pair(
        &self,
        features1: &mut [Feature],
        features2: &mut [Feature],
    ) -> Result<FeatureMatchList, MatchingError>;
}

/// Keep only the forward matches whose reverse counterpart was also found.
///
/// A forward match `(i, j)` survives iff `reverse` contains the match `(j, i)`.
pub fn symmetric_matches(
    forward: &[LightFeatureMatch],
    reverse: &[LightFeatureMatch],
) -> LightFeatureMatchList {
    let reverse_lookup: HashMap<usize, usize> = reverse
        .iter()
        .map(|m| (m.feature_index1, m.feature_index2))
        .collect();

    forward
        .iter()
        .filter(|m| reverse_lookup.get(&m.feature_index2) == Some(&m.feature_index1))
        .copied()
        .collect()
}

/// Keep at most one match per feature of image 2, the closest one.
pub(crate) fn unique_matches(matches: &[LightFeatureMatch]) -> LightFeatureMatchList {
    let mut best: HashMap<usize, LightFeatureMatch> = HashMap::with_capacity(matches.len());
    for m in matches {
        best.entry(m.feature_index2)
            .and_modify(|b| {
                if LightFeatureMatch::sort_by_distance(m, b).is_lt() {
                    *b = *m;
                }
            })
            .or_insert(*m);
    }

    matches
        .iter()
        .filter(|m| {
            best.get(&m.feature_index2)
                .is_some_and(|b| b.feature_index1 == m.feature_index1)
        })
        .copied()
        .collect()
}
