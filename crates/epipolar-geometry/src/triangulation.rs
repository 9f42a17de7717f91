use crate::camera::Camera;
use epipolar_matching::FeatureMatch;
use glam::{DVec2, DVec3};

/// Failures of the triangulation of one correspondence.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TriangulationError {
    /// The rays are parallel or the solution is not finite.
    #[error("Triangulated point is at infinity")]
    PointAtInfinity,

    /// The point is not in front of both cameras.
    #[error("Triangulated point is behind a camera (depths {depth1}, {depth2})")]
    BehindCamera {
        /// Depth in the first camera.
        depth1: f64,
        /// Depth in the second camera.
        depth2: f64,
    },
}

/// A triangulated world point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangulation {
    /// The point in world coordinates.
    pub point: DVec3,
    /// Mean reprojection error over both views, in pixels.
    pub reprojection_error: f64,
}

/// Recover the world point seen by a correspondence between two cameras.
///
/// Success means the point lies in front of both cameras.
pub trait Triangulate {
    /// Triangulate `feature_match`, with `feature1` observed by `camera1`.
    fn triangulate(
        &self,
        feature_match: &FeatureMatch,
        camera1: &Camera,
        camera2: &Camera,
    ) -> Result<Triangulation, TriangulationError>;
}

/// Linear triangulation by direct linear transform.
///
/// Each view contributes two rows `u · P₃ - P₁` and `v · P₃ - P₂` of a 4x4 homogeneous
/// system solved by SVD.
#[derive(Clone, Copy, Debug, Default)]
pub struct DltTriangulator;

impl Triangulate for DltTriangulator {
    fn triangulate(
        &self,
        feature_match: &FeatureMatch,
        camera1: &Camera,
        camera2: &Camera,
    ) -> Result<Triangulation, TriangulationError> {
        let p1 = camera1.projection_matrix();
        let p2 = camera2.projection_matrix();
        let (x1, x2) = (feature_match.feature1, feature_match.feature2);

        let mut a = faer::Mat::<f64>::zeros(4, 4);
        write_dlt_row(&mut a, 0, x1.u, &p1[2], &p1[0]);
        write_dlt_row(&mut a, 1, x1.v, &p1[2], &p1[1]);
        write_dlt_row(&mut a, 2, x2.u, &p2[2], &p2[0]);
        write_dlt_row(&mut a, 3, x2.v, &p2[2], &p2[1]);

        let svd = a.svd();
        let xh = svd.v().col(3);
        let w = xh.read(3);
        if !w.is_finite() || w.abs() < 1e-12 {
            return Err(TriangulationError::PointAtInfinity);
        }
        let point = DVec3::new(xh.read(0) / w, xh.read(1) / w, xh.read(2) / w);
        if !point.is_finite() {
            return Err(TriangulationError::PointAtInfinity);
        }

        let depth1 = camera1.world_to_camera(point).z;
        let depth2 = camera2.world_to_camera(point).z;
        if depth1 <= 0.0 || depth2 <= 0.0 {
            return Err(TriangulationError::BehindCamera { depth1, depth2 });
        }

        let reprojection_error = match (camera1.project(point), camera2.project(point)) {
            (Some(r1), Some(r2)) => {
                0.5 * (r1.distance(DVec2::new(x1.u, x1.v)) + r2.distance(DVec2::new(x2.u, x2.v)))
            }
            _ => return Err(TriangulationError::BehindCamera { depth1, depth2 }),
        };

        Ok(Triangulation {
            point,
            reprojection_error,
        })
    }
}

fn write_dlt_row(a: &mut faer::Mat<f64>, row: usize, x: f64, p3: &[f64; 4], p: &[f64; 4]) {
    for j in 0..4 {
        a.write(row, j, x * p3[j] - p[j]);
    }
}
