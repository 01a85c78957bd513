//! Pinhole camera used by the primary pass and by every light view.
//!
//! The camera looks down its `forward` axis; view space is right-handed with
//! the camera looking down -Z. The projection maps the near plane
//! (`focal_length` away) to NDC z = +1 and the far plane to z = -1, with
//! clip-space w equal to the view distance.

use hypox_core::CameraConfig;
use hypox_math::{Mat4, UVec2, Vec3, Vec4};
use thiserror::Error;

/// World up used to build the camera basis.
pub const REF_UP: Vec3 = Vec3::Z;

/// Right vector used when looking straight along `REF_UP`.
pub const REF_RIGHT: Vec3 = Vec3::X;

/// Minimum distance between the camera and its target.
pub const LENGTH_EPS: f32 = 1e-8;

/// Cross-product length below which two unit vectors count as parallel.
pub const PARALLEL_EPS: f32 = 1e-8;

/// Distance to the far clipping plane.
pub const DEFAULT_FAR: f32 = 100.0;

pub const DEFAULT_FOCAL_LENGTH: f32 = 1.0;
pub const DEFAULT_FOV: f32 = 90.0;

/// Errors raised while orienting a camera.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    #[error("Camera at {position:?} cannot look at itself")]
    DegenerateLookAt { position: Vec3 },
}

/// A perspective camera.
#[derive(Clone, Debug)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,

    /// Distance to the near plane
    focal_length: f32,
    /// Vertical field of view in degrees
    fov: f32,
    resolution: UVec2,
    far: f32,

    /// Near/far distances used instead when projecting for a shadow pass
    shadow_clip: Option<(f32, f32)>,
}

impl Camera {
    /// Create a camera at the origin looking down -Z.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            focal_length: DEFAULT_FOCAL_LENGTH,
            fov: DEFAULT_FOV,
            resolution: UVec2::new(width, height),
            far: DEFAULT_FAR,
            shadow_clip: None,
        }
    }

    /// Build a camera from its scene configuration.
    pub fn from_config(config: &CameraConfig) -> Result<Self, CameraError> {
        let mut camera = Self::new(config.resolution.x, config.resolution.y)
            .with_lens(config.focal_length, config.fov);
        camera.move_to(config.position);
        camera.look_at(config.target)?;
        Ok(camera)
    }

    /// Set image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = UVec2::new(width, height);
        self
    }

    /// Set focal length (near-plane distance) and vertical fov in degrees.
    pub fn with_lens(mut self, focal_length: f32, fov: f32) -> Self {
        self.focal_length = focal_length;
        self.fov = fov;
        self
    }

    /// Set the far-plane distance.
    pub fn with_far(mut self, far: f32) -> Self {
        self.far = far;
        self
    }

    /// Use different near/far distances when projecting for a shadow pass.
    pub fn with_shadow_clip(mut self, near: f32, far: f32) -> Self {
        self.shadow_clip = Some((near, far));
        self
    }

    /// Move the camera without changing its orientation.
    pub fn move_to(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Orient the camera toward `target`.
    ///
    /// The basis is rebuilt as a whole: right = forward x up_ref, up = right x forward.
    pub fn look_at(&mut self, target: Vec3) -> Result<(), CameraError> {
        let offset = target - self.position;
        if offset.length() < LENGTH_EPS {
            return Err(CameraError::DegenerateLookAt {
                position: self.position,
            });
        }

        let (forward, right, up) = look_basis(offset.normalize());
        self.forward = forward;
        self.right = right;
        self.up = up;
        Ok(())
    }

    /// World-to-view transform: rotation rows (right, up, -forward) after
    /// translating by -position.
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = Mat4::from_cols(
            Vec4::new(self.right.x, self.up.x, -self.forward.x, 0.0),
            Vec4::new(self.right.y, self.up.y, -self.forward.y, 0.0),
            Vec4::new(self.right.z, self.up.z, -self.forward.z, 0.0),
            Vec4::W,
        );
        rotation * Mat4::from_translation(-self.position)
    }

    /// View-to-clip transform.
    pub fn projection_matrix(&self, is_shadow_pass: bool) -> Mat4 {
        let (near_dist, far_dist) = match self.shadow_clip {
            Some(clip) if is_shadow_pass => clip,
            _ => (self.focal_length, self.far),
        };

        // Planes sit on the negative z axis of view space
        let n = -near_dist;
        let f = -far_dist;
        let aspect = self.aspect_ratio();
        let top = n * (self.fov.to_radians() / 2.0).tan();
        let bottom = -top;
        let right = top * aspect;
        let left = -right;

        let persp_to_ortho = Mat4::from_cols_array_2d(&[
            [-n, 0.0, 0.0, 0.0],
            [0.0, -n, 0.0, 0.0],
            [0.0, 0.0, -(n + f), n * f],
            [0.0, 0.0, -1.0, 0.0],
        ])
        .transpose();

        let ortho = Mat4::from_cols_array_2d(&[
            [-2.0 / (right - left), 0.0, 0.0, -(right + left) / (right - left)],
            [0.0, -2.0 / (top - bottom), 0.0, -(top + bottom) / (top - bottom)],
            [0.0, 0.0, 2.0 / (n - f), -(n + f) / (n - f)],
            [0.0, 0.0, 0.0, 1.0],
        ])
        .transpose();

        ortho * persp_to_ortho
    }

    /// Combined world-to-clip transform.
    pub fn view_projection(&self, is_shadow_pass: bool) -> Mat4 {
        self.projection_matrix(is_shadow_pass) * self.view_matrix()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    pub fn width(&self) -> u32 {
        self.resolution.x
    }

    pub fn height(&self) -> u32 {
        self.resolution.y
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.resolution.x as f32 / self.resolution.y as f32
    }
}

/// Orthonormal (forward, right, up) basis for a unit view direction.
///
/// Shared with area lights, which lay out their samples in the same basis.
pub fn look_basis(forward: Vec3) -> (Vec3, Vec3, Vec3) {
    let side = forward.cross(REF_UP);
    let right = if side.length() >= PARALLEL_EPS {
        side.normalize()
    } else if forward.dot(REF_UP) > 0.0 {
        REF_RIGHT
    } else {
        -REF_RIGHT
    };
    let up = right.cross(forward).normalize();
    (forward, right, up)
}
