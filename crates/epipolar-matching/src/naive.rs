use std::marker::PhantomData;

use rayon::prelude::*;

use crate::feature::{Feature, FeatureMatch, FeatureMatchList, LightFeatureMatch, LightFeatureMatchList};
use crate::matcher::{
    symmetric_matches, unique_matches, FeatureMatcher, FeatureMatcherOptions, MatchingError,
};
use crate::metric::DistanceMetric;

/// Brute-force matcher comparing every descriptor of one image to every
/// descriptor of the other, `O(n * m)` per direction.
#[derive(Clone, Debug)]
pub struct NaiveFeatureMatcher<M: DistanceMetric> {
    options: FeatureMatcherOptions,
    _metric: PhantomData<M>,
}

impl<M: DistanceMetric> NaiveFeatureMatcher<M> {
    /// Create a matcher, validating the options.
    pub fn new(options: FeatureMatcherOptions) -> Result<Self, MatchingError> {
        options.validate()?;
        Ok(Self {
            options,
            _metric: PhantomData,
        })
    }

    /// Find the best match in `features2` for every feature of `features1`.
    ///
    /// Features without an acceptable match (empty `features2`, or a failed ratio
    /// test) are skipped. The output is ordered by the index into `features1`.
    pub fn compute_putative_matches(
        &self,
        features1: &[Feature],
        features2: &[Feature],
    ) -> LightFeatureMatchList {
        let use_lowes_ratio = self.options.use_lowes_ratio;
        let lowes_ratio_squared = (self.options.lowes_ratio * self.options.lowes_ratio) as f32;

        // each outer feature owns its candidate buffer, so the loop is data parallel
        let best_matches: Vec<Option<LightFeatureMatch>> = features1
            .par_iter()
            .enumerate()
            .map(|(ii, feature1)| {
                let mut one_way_matches = features2
                    .iter()
                    .enumerate()
                    .map(|(jj, feature2)| {
                        let dist = M::distance(&feature1.descriptor, &feature2.descriptor);
                        LightFeatureMatch::new(ii, jj, dist)
                    })
                    .collect::<Vec<_>>();
                best_match(&mut one_way_matches, use_lowes_ratio, lowes_ratio_squared)
            })
            .collect();

        best_matches.into_iter().flatten().collect()
    }
}

impl<M: DistanceMetric> FeatureMatcher for NaiveFeatureMatcher<M> {
    fn options(&self) -> &FeatureMatcherOptions {
        &self.options
    }

    fn match_image_pair(
        &self,
        features1: &mut [Feature],
        features2: &mut [Feature],
    ) -> Result<FeatureMatchList, MatchingError> {
        if M::requires_normalized_descriptors() {
            features1.iter_mut().for_each(Feature::normalize_descriptor);
            features2.iter_mut().for_each(Feature::normalize_descriptor);
        }

        let required = self.options.min_num_feature_matches;

        let putative = self.compute_putative_matches(features1, features2);
        let mut light_matches = unique_matches(&putative);
        log::debug!(
            "putative matches: {} ({} before uniqueness) from {}x{} features",
            light_matches.len(),
            putative.len(),
            features1.len(),
            features2.len()
        );

        // reverse matches cannot add anything once the forward pass is short
        if light_matches.len() < required {
            return Err(MatchingError::InsufficientMatches {
                found: light_matches.len(),
                required,
            });
        }

        if self.options.ensure_symmetric_matches {
            let reverse = self.compute_putative_matches(features2, features1);
            light_matches = symmetric_matches(&light_matches, &reverse);
            log::debug!("symmetric matches: {}", light_matches.len());

            if light_matches.len() < required {
                return Err(MatchingError::InsufficientSymmetricMatches {
                    found: light_matches.len(),
                    required,
                });
            }
        }

        Ok(light_matches
            .iter()
            .map(|m| {
                FeatureMatch::new(
                    features1[m.feature_index1].keypoint,
                    features2[m.feature_index2].keypoint,
                )
            })
            .collect())
    }
}

/// Select the closest candidate, optionally subject to Lowe's ratio test.
///
/// With a single candidate there is nothing to be ambiguous with and it is accepted.
fn best_match(
    one_way_matches: &mut [LightFeatureMatch],
    use_lowes_ratio: bool,
    lowes_ratio_squared: f32,
) -> Option<LightFeatureMatch> {
    if one_way_matches.len() < 2 {
        return one_way_matches.first().copied();
    }

    if !use_lowes_ratio {
        return one_way_matches
            .iter()
            .min_by(|a, b| LightFeatureMatch::sort_by_distance(a, b))
            .copied();
    }

    // only the two closest candidates matter for the ratio test
    one_way_matches.select_nth_unstable_by(1, LightFeatureMatch::sort_by_distance);
    let (best, second_best) = (one_way_matches[0], one_way_matches[1]);

    if best.distance < lowes_ratio_squared * second_best.distance {
        Some(best)
    } else {
        None
    }
}
