// Transform utilities for Mat4
//
// Extends glam::Mat4 with the homogeneous helpers the rasterizer needs.

use glam::{Mat4, Vec3, Vec4};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a direction (applies rotation and scale, but NOT translation).
    /// Directions have an implicit w=0 component.
    fn transform_direction(&self, direction: Vec3) -> Vec3;

    /// Transform a point into homogeneous clip space without the perspective divide.
    fn transform_homogeneous(&self, point: Vec3) -> Vec4;
}

impl Mat4Ext for Mat4 {
    fn transform_direction(&self, direction: Vec3) -> Vec3 {
        let transformed = *self * direction.extend(0.0);
        transformed.truncate()
    }

    fn transform_homogeneous(&self, point: Vec3) -> Vec4 {
        *self * point.extend(1.0)
    }
}

/// Build a model matrix as translation * rotation * scale.
///
/// `rotation_degrees` holds Euler angles in degrees, applied X first, then Y, then Z
/// (the rotation part is `Rz * Ry * Rx`).
pub fn model_matrix(translation: Vec3, rotation_degrees: Vec3, scale: Vec3) -> Mat4 {
    let rotation = Mat4::from_rotation_z(rotation_degrees.z.to_radians())
        * Mat4::from_rotation_y(rotation_degrees.y.to_radians())
        * Mat4::from_rotation_x(rotation_degrees.x.to_radians());
    Mat4::from_translation(translation) * rotation * Mat4::from_scale(scale)
}
