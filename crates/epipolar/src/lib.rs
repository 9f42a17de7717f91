#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use epipolar_matching as matching;

#[doc(inline)]
pub use epipolar_ransac as ransac;

#[doc(inline)]
pub use epipolar_geometry as geometry;

/// End-to-end two-view estimation.
pub mod twoview;

pub use twoview::{
    estimate_pose_from_matches, estimate_two_view, estimate_two_view_with, TwoViewError,
    TwoViewOptions, TwoViewResult,
};
