use glam::{DMat3, DVec2, DVec3};
use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
}

/// Intrinsic parameters of a pinhole camera.
///
/// Owns the calibration matrix
///
/// ```text
/// K = | f_u  s   c_u |
///     | 0    f_v c_v |
///     | 0    0   1   |
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    k: DMat3,
    image_size: Option<ImageSize>,
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::new(DMat3::IDENTITY)
    }
}

impl CameraIntrinsics {
    /// Create intrinsics from a calibration matrix.
    pub fn new(k: DMat3) -> Self {
        Self {
            k,
            image_size: None,
        }
    }

    /// Create intrinsics from focal lengths and principal point, without skew.
    pub fn from_focal_length(f_u: f64, f_v: f64, c_u: f64, c_v: f64) -> Self {
        Self::new(DMat3::from_cols(
            DVec3::new(f_u, 0.0, 0.0),
            DVec3::new(0.0, f_v, 0.0),
            DVec3::new(c_u, c_v, 1.0),
        ))
    }

    /// Attach image dimensions.
    pub fn with_image_size(mut self, width: usize, height: usize) -> Self {
        self.image_size = Some(ImageSize { width, height });
        self
    }

    /// The calibration matrix.
    pub fn k(&self) -> DMat3 {
        self.k
    }

    /// Horizontal focal length in pixels.
    pub fn f_u(&self) -> f64 {
        self.k.x_axis.x
    }

    /// Vertical focal length in pixels.
    pub fn f_v(&self) -> f64 {
        self.k.y_axis.y
    }

    /// Horizontal principal point in pixels.
    pub fn c_u(&self) -> f64 {
        self.k.z_axis.x
    }

    /// Vertical principal point in pixels.
    pub fn c_v(&self) -> f64 {
        self.k.z_axis.y
    }

    /// Image dimensions, if known.
    pub fn image_size(&self) -> Option<ImageSize> {
        self.image_size
    }

    /// Whether a pixel lies inside the image. Always true when the size is unknown.
    pub fn is_in_image(&self, u: f64, v: f64) -> bool {
        match self.image_size {
            Some(size) => u >= 0.0 && v >= 0.0 && u < size.width as f64 && v < size.height as f64,
            None => true,
        }
    }

    /// Project a point in the camera frame to pixel coordinates.
    ///
    /// Returns `None` for points on or behind the image plane.
    pub fn camera_to_image(&self, point: DVec3) -> Option<DVec2> {
        if point.z <= 0.0 {
            return None;
        }
        let p = self.k * (point / point.z);
        Some(DVec2::new(p.x, p.y))
    }

    /// Back-project a pixel to the ray through it, scaled to unit depth.
    pub fn image_to_camera(&self, u: f64, v: f64) -> DVec3 {
        let ray = self.k.inverse() * DVec3::new(u, v, 1.0);
        ray / ray.z
    }
}

/// A rigid transform `x ↦ R · x + t`.
///
/// Used as a world-to-camera transform: `rotation` rotates world points into the
/// camera frame, `translation` is the world origin expressed in the camera frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Orthonormal rotation with determinant +1.
    pub rotation: DMat3,
    /// Translation.
    pub translation: DVec3,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Create a pose from a rotation and a translation.
    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The pose of a camera at the world origin with no rotation.
    pub fn identity() -> Self {
        Self::new(DMat3::IDENTITY, DVec3::ZERO)
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    /// The transform that applies `other` first and then `self`.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose::new(
            self.rotation * other.rotation,
            self.rotation * other.translation + self.translation,
        )
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.transpose();
        Pose::new(rotation, -(rotation * self.translation))
    }
}

/// Extrinsic parameters of a camera, stored as a world-to-camera transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraExtrinsics {
    world_to_camera: Pose,
}

impl CameraExtrinsics {
    /// Create extrinsics from a world-to-camera transform.
    pub fn new(world_to_camera: Pose) -> Self {
        Self { world_to_camera }
    }

    /// The world-to-camera transform.
    pub fn world_to_camera(&self) -> Pose {
        self.world_to_camera
    }

    /// Replace the world-to-camera transform.
    pub fn set_world_to_camera(&mut self, world_to_camera: Pose) {
        self.world_to_camera = world_to_camera;
    }

    /// The camera-to-world transform.
    pub fn camera_to_world(&self) -> Pose {
        self.world_to_camera.inverse()
    }

    /// The camera center in world coordinates.
    pub fn center(&self) -> DVec3 {
        self.camera_to_world().translation
    }
}

/// A calibrated camera placed in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Camera {
    intrinsics: CameraIntrinsics,
    extrinsics: CameraExtrinsics,
}

impl Camera {
    /// Compose a camera from its intrinsics and extrinsics.
    pub fn new(intrinsics: CameraIntrinsics, extrinsics: CameraExtrinsics) -> Self {
        Self {
            intrinsics,
            extrinsics,
        }
    }

    /// The intrinsic parameters.
    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// The extrinsic parameters.
    pub fn extrinsics(&self) -> &CameraExtrinsics {
        &self.extrinsics
    }

    /// Transform a world point into the camera frame.
    pub fn world_to_camera(&self, point: DVec3) -> DVec3 {
        self.extrinsics.world_to_camera.transform_point(point)
    }

    /// Project a world point to pixel coordinates, `None` if it is behind the camera.
    pub fn project(&self, point: DVec3) -> Option<DVec2> {
        self.intrinsics.camera_to_image(self.world_to_camera(point))
    }

    /// The 3x4 projection matrix `K · [R | t]`, row by row.
    pub fn projection_matrix(&self) -> [[f64; 4]; 3] {
        let pose = self.extrinsics.world_to_camera;
        let kr = self.intrinsics.k * pose.rotation;
        let kt = self.intrinsics.k * pose.translation;
        let mut p = [[0.0; 4]; 3];
        for (i, row) in p.iter_mut().enumerate() {
            let r = kr.row(i);
            *row = [r.x, r.y, r.z, kt[i]];
        }
        p
    }
}
