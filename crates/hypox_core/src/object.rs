//! Renderable objects: a triangle list in local space plus its placement.

use hypox_math::{model_matrix, Aabb, Mat4, Mat4Ext, Vec3};

use crate::geometry::{Triangle, Vertex};
use crate::material::MaterialId;
use crate::mesh::Mesh;

/// Transform components that can be composed into a model matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,

    /// Euler rotation in degrees (applied X, then Y, then Z)
    pub rotation_degrees: Vec3,

    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation_degrees: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate
    pub fn to_matrix(&self) -> Mat4 {
        model_matrix(self.translation, self.rotation_degrees, self.scale)
    }
}

/// A named triangle list with local and world-space copies.
///
/// World triangles are only refreshed by [`Object::local_to_world`].
#[derive(Clone, Debug)]
pub struct Object {
    /// Object name (usually the source file)
    pub name: String,

    triangles_local: Vec<Triangle>,
    triangles: Vec<Triangle>,
    model_matrix: Mat4,
    local_bounds: Aabb,
    bounds: Aabb,
}

impl Object {
    /// Create an object whose world space equals its local space.
    pub fn from_triangles(name: impl Into<String>, triangles: Vec<Triangle>) -> Self {
        let local_bounds = bounds_of(&triangles);
        Self {
            name: name.into(),
            triangles: triangles.clone(),
            triangles_local: triangles,
            model_matrix: Mat4::IDENTITY,
            local_bounds,
            bounds: local_bounds,
        }
    }

    /// Create an object from a loaded mesh.
    pub fn from_mesh(name: impl Into<String>, mesh: &Mesh) -> Self {
        Self::from_triangles(name, mesh.to_triangles())
    }

    /// Assign one material to every triangle, local and world.
    pub fn set_material(&mut self, material: Option<MaterialId>) {
        for tri in self
            .triangles_local
            .iter_mut()
            .chain(self.triangles.iter_mut())
        {
            tri.set_material(material);
        }
    }

    /// Rebuild the world-space triangles from the local ones.
    ///
    /// Positions transform as points and normals as directions by `model`
    /// itself, which keeps normals perpendicular only for rotations and
    /// uniform scales.
    pub fn local_to_world(&mut self, model: Mat4) {
        self.model_matrix = model;
        self.triangles = self
            .triangles_local
            .iter()
            .map(|tri| {
                let [a, b, c] = tri.vertices().map(|v| {
                    Vertex::new(
                        model.transform_point3(v.position),
                        model.transform_direction(v.normal),
                        v.uv,
                    )
                });
                Triangle::new(a, b, c).with_material(tri.material())
            })
            .collect();
        self.bounds = bounds_of(&self.triangles);

        log::debug!(
            "Object '{}': {} triangles, world bounds {:?} .. {:?}",
            self.name,
            self.triangles.len(),
            self.bounds.min(),
            self.bounds.max()
        );
    }

    /// World-space triangles.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Local-space triangles as loaded.
    pub fn triangles_local(&self) -> &[Triangle] {
        &self.triangles_local
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.model_matrix
    }

    /// World-space bounds.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn local_bounds(&self) -> Aabb {
        self.local_bounds
    }

    /// Center of the world-space bounds.
    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

fn bounds_of(triangles: &[Triangle]) -> Aabb {
    Aabb::from_iter_points(triangles.iter().flat_map(|tri| tri.positions()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypox_math::Vec2;

    fn sample_object() -> Object {
        let tri = Triangle::new(
            Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::X, Vec3::Z, Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::Y, Vec3::new(0.0, 0.6, 0.8), Vec2::new(0.0, 1.0)),
        );
        Object::from_triangles("sample", vec![tri])
    }

    #[test]
    fn test_identity_transform_is_noop() {
        let mut object = sample_object();
        object.local_to_world(Mat4::IDENTITY);

        assert_eq!(object.triangles(), object.triangles_local());
        assert_eq!(object.bounds(), object.local_bounds());
    }

    #[test]
    fn test_local_to_world_moves_points_not_normals() {
        let mut object = sample_object();
        let transform = Transform::from_translation(Vec3::new(0.0, 0.0, 5.0));
        object.local_to_world(transform.to_matrix());

        let tri = object.triangles()[0];
        assert_eq!(tri.vertices()[1].position, Vec3::new(1.0, 0.0, 5.0));
        assert_eq!(tri.vertices()[1].normal, Vec3::Z);
        assert_eq!(tri.vertices()[2].uv, Vec2::new(0.0, 1.0));

        assert_eq!(object.bounds().min(), Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(object.local_bounds().min(), Vec3::ZERO);
        assert_eq!(object.model_matrix(), transform.to_matrix());
    }

    #[test]
    fn test_local_to_world_rotates_normals() {
        let mut object = sample_object();
        let transform = Transform {
            rotation_degrees: Vec3::new(90.0, 0.0, 0.0),
            ..Default::default()
        };
        object.local_to_world(transform.to_matrix());

        // Rotating +Z about X by 90 degrees gives -Y
        let normal = object.triangles()[0].vertices()[0].normal;
        assert!((normal - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn test_local_to_world_is_explicit() {
        let mut object = sample_object();
        object.local_to_world(Mat4::from_translation(Vec3::X));
        object.local_to_world(Mat4::from_translation(Vec3::Y));

        // Each call starts from the local triangles
        assert_eq!(object.triangles()[0].vertices()[0].position, Vec3::Y);
    }

    #[test]
    fn test_set_material_survives_transform() {
        let mut object = sample_object();
        object.set_material(Some(MaterialId(3)));
        object.local_to_world(Mat4::from_scale(Vec3::splat(2.0)));

        assert_eq!(object.triangles()[0].material(), Some(MaterialId(3)));
        assert_eq!(object.triangle_count(), 1);
        assert_eq!(object.center(), Vec3::new(1.0, 1.0, 0.0));
    }
}
