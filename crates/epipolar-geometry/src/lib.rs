#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Two-view geometry
//!
//! Conventions used throughout the crate:
//!
//! - image points are pixel coordinates `(u, v)`, extended to `(u, v, 1)`;
//! - a fundamental matrix `F` satisfies `x2ᵗ · F · x1 = 0` for a point `x1` in the
//!   first image and its correspondence `x2` in the second;
//! - a [`Pose`] maps world points into the camera frame, `x_cam = R · x_world + t`;
//! - the first camera of a pair sits at the identity pose, so the essential matrix is
//!   `E = [t]ₓ · R` with `(R, t)` the pose of the second camera.

/// Pinhole camera model and rigid poses.
pub mod camera;

/// Error types for the geometry stages.
pub mod error;

/// Normalized eight-point fundamental matrix solver.
pub mod eight_point;

/// Essential matrix computation, decomposition and pose recovery.
pub mod essential;

/// The fundamental matrix as a RANSAC problem.
pub mod fundamental_ransac;

/// Small fixed-size linear algebra helpers.
pub mod linalg;

/// Two-view point triangulation.
pub mod triangulation;

pub use camera::{Camera, CameraExtrinsics, CameraIntrinsics, ImageSize, Pose};
pub use eight_point::{solve_eight_point, FundamentalMatrixSolverOptions, MIN_CORRESPONDENCES};
pub use error::GeometryError;
pub use essential::{
    decompose_essential, enforce_essential_constraints, essential_from_fundamental,
    EssentialMatrixSolver, EssentialMatrixSolverOptions,
};
pub use fundamental_ransac::{
    EpipolarResidual, FundamentalMatrixRansacModel, FundamentalMatrixRansacProblem,
};
pub use linalg::{svd3, Svd3};
pub use triangulation::{DltTriangulator, Triangulate, Triangulation, TriangulationError};
