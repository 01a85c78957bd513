//! Vertex and triangle primitives shared by every rasterization pass.
//!
//! A `Triangle` is used both for world-space geometry and, after projection,
//! for screen-space coverage tests: the edge-function containment test and
//! the barycentric weights below are what every pass rasterizes with.

use hypox_math::{Vec2, Vec3};
use thiserror::Error;

use crate::material::MaterialId;

/// Tolerance used when validating that interpolation weights sum to one.
pub const WEIGHT_EPS: f32 = 1e-4;

/// Weights returned for points outside the triangle.
pub const OUTSIDE_WEIGHTS: Vec3 = Vec3::new(-1.0, -1.0, -1.0);

/// Errors raised by indexed vertex access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Vertex index {0} out of range (triangles have 3 vertices)")]
    VertexIndex(usize),
}

/// A single mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }

    /// A vertex with only a position. The normal defaults to +X, the uv to zero.
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Vec3::X, Vec2::ZERO)
    }
}

/// A triangle with an optional material handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    vertices: [Vertex; 3],
    material: Option<MaterialId>,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
            material: None,
        }
    }

    /// Create a triangle from bare positions.
    pub fn from_positions(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        Self::new(
            Vertex::from_position(p0),
            Vertex::from_position(p1),
            Vertex::from_position(p2),
        )
    }

    /// Set the material handle for this triangle.
    pub fn with_material(mut self, material: Option<MaterialId>) -> Self {
        self.material = material;
        self
    }

    pub fn material(&self) -> Option<MaterialId> {
        self.material
    }

    pub fn set_material(&mut self, material: Option<MaterialId>) {
        self.material = material;
    }

    pub fn vertices(&self) -> &[Vertex; 3] {
        &self.vertices
    }

    pub fn vertex(&self, index: usize) -> Result<&Vertex, GeometryError> {
        self.vertices
            .get(index)
            .ok_or(GeometryError::VertexIndex(index))
    }

    pub fn set_vertex(&mut self, index: usize, vertex: Vertex) -> Result<(), GeometryError> {
        let slot = self
            .vertices
            .get_mut(index)
            .ok_or(GeometryError::VertexIndex(index))?;
        *slot = vertex;
        Ok(())
    }

    /// Vertex positions as an array.
    pub fn positions(&self) -> [Vec3; 3] {
        self.vertices.map(|v| v.position)
    }

    /// Un-normalized face normal `e0 x e1`. Zero for degenerate triangles.
    pub fn face_normal(&self) -> Vec3 {
        let [p0, p1, p2] = self.positions();
        (p1 - p0).cross(p2 - p1)
    }

    /// Edge-function containment test in 3D (boundary counts as inside).
    pub fn is_inside(&self, point: Vec3) -> bool {
        edge_terms(self.positions(), point).is_some_and(same_sign)
    }

    /// Containment test on the XY plane; the third component is ignored.
    pub fn is_inside_2d(&self, point: Vec3) -> bool {
        edge_terms(flatten(self.positions()), flat(point)).is_some_and(same_sign)
    }

    /// Barycentric weights of `point`, or `OUTSIDE_WEIGHTS` if it is not inside.
    ///
    /// The result can still be non-finite for degenerate triangles; check it with
    /// [`is_valid_weight`] before use.
    pub fn interpolation_weights(&self, point: Vec3) -> Vec3 {
        barycentric(self.positions(), point)
    }

    /// Barycentric weights on the XY plane; the third component is ignored.
    pub fn interpolation_weights_2d(&self, point: Vec3) -> Vec3 {
        barycentric(flatten(self.positions()), flat(point))
    }

    /// Componentwise minimum of the vertex XY positions.
    pub fn xy_min(&self) -> Vec2 {
        let [p0, p1, p2] = self.positions();
        p0.truncate().min(p1.truncate()).min(p2.truncate())
    }

    /// Componentwise maximum of the vertex XY positions.
    pub fn xy_max(&self) -> Vec2 {
        let [p0, p1, p2] = self.positions();
        p0.truncate().max(p1.truncate()).max(p2.truncate())
    }

    /// Weighted sum of the vertex normals.
    pub fn interpolate_normal(&self, weights: Vec3) -> Vec3 {
        let [a, b, c] = self.vertices;
        a.normal * weights.x + b.normal * weights.y + c.normal * weights.z
    }

    /// Weighted sum of the vertex texture coordinates.
    pub fn interpolate_uv(&self, weights: Vec3) -> Vec2 {
        let [a, b, c] = self.vertices;
        a.uv * weights.x + b.uv * weights.y + c.uv * weights.z
    }
}

/// Reject weights that are non-finite or do not sum to one.
pub fn is_valid_weight(weights: Vec3) -> bool {
    weights.is_finite() && (weights.element_sum() - 1.0).abs() <= WEIGHT_EPS
}

fn flat(p: Vec3) -> Vec3 {
    Vec3::new(p.x, p.y, 0.0)
}

fn flatten(positions: [Vec3; 3]) -> [Vec3; 3] {
    positions.map(flat)
}

/// `n . (e_i x c_i)` for each edge, paired with `n . n`.
///
/// Returned in vertex-weight order: the term opposite vertex 0 first.
fn edge_terms([v0, v1, v2]: [Vec3; 3], point: Vec3) -> Option<(Vec3, f32)> {
    let e0 = v1 - v0;
    let e1 = v2 - v1;
    let e2 = v0 - v2;
    let n = e0.cross(e1);

    let t0 = n.dot(e1.cross(point - v1));
    let t1 = n.dot(e2.cross(point - v2));
    let t2 = n.dot(e0.cross(point - v0));
    let terms = Vec3::new(t0, t1, t2);

    if terms.is_nan() {
        return None;
    }
    Some((terms, n.length_squared()))
}

fn same_sign((terms, _): (Vec3, f32)) -> bool {
    (terms.x >= 0.0 && terms.y >= 0.0 && terms.z >= 0.0)
        || (terms.x <= 0.0 && terms.y <= 0.0 && terms.z <= 0.0)
}

fn barycentric(positions: [Vec3; 3], point: Vec3) -> Vec3 {
    match edge_terms(positions, point) {
        Some(edges) if same_sign(edges) => {
            let (terms, area) = edges;
            let weights = terms / area;
            weights / weights.element_sum()
        }
        _ => OUTSIDE_WEIGHTS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> Triangle {
        Triangle::from_positions(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        )
    }

    #[test]
    fn test_is_inside_3d() {
        let tri = unit_triangle();
        assert!(tri.is_inside(Vec3::new(0.0, 0.2, 0.2)));
        assert!(!tri.is_inside(Vec3::new(0.0, 0.8, 0.8)));

        // Boundary points count as inside
        assert!(tri.is_inside(Vec3::new(0.0, 0.5, 0.0)));
        assert!(tri.is_inside(Vec3::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn test_interior_weights_sum_to_one() {
        let tri = Triangle::from_positions(
            Vec3::new(0.25, 0.5, 1.0),
            Vec3::new(0.75, 0.75, 1.0),
            Vec3::new(0.75, 0.25, 1.0),
        );

        for i in 0..=20 {
            for j in 0..=20 {
                let p = Vec3::new(i as f32 / 20.0, j as f32 / 20.0, 1.0);
                let w = tri.interpolation_weights(p);
                if tri.is_inside(p) {
                    assert!(is_valid_weight(w), "weights {w:?} at {p:?}");
                    assert!((w.element_sum() - 1.0).abs() < 1e-5);
                    for k in 0..3 {
                        assert!(w[k] >= -1e-5 && w[k] <= 1.0 + 1e-5);
                    }
                } else {
                    assert_eq!(w, OUTSIDE_WEIGHTS);
                }
            }
        }
    }

    #[test]
    fn test_weights_reproduce_point() {
        let tri = unit_triangle();
        let p = Vec3::new(0.0, 0.2, 0.3);
        let w = tri.interpolation_weights(p);
        let [a, b, c] = tri.positions();
        let rebuilt = a * w.x + b * w.y + c * w.z;

        assert!((rebuilt - p).length() < 1e-5);
        // Weight of vertex 1 equals the y coordinate for this triangle
        assert!((w.y - 0.2).abs() < 1e-5);
        assert!((w.z - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_weights_2d_ignore_depth() {
        let tri = Triangle::from_positions(
            Vec3::new(-1.0, -1.0, 0.3),
            Vec3::new(1.0, -1.0, -0.7),
            Vec3::new(0.0, 1.0, 0.1),
        );

        assert!(tri.is_inside_2d(Vec3::new(0.0, 0.0, 5.0)));
        assert!(!tri.is_inside_2d(Vec3::new(0.9, 0.9, 0.0)));

        let w = tri.interpolation_weights_2d(Vec3::new(0.0, 0.0, 0.0));
        assert!(is_valid_weight(w));

        let outside = tri.interpolation_weights_2d(Vec3::new(0.9, 0.9, 0.0));
        assert_eq!(outside, OUTSIDE_WEIGHTS);
    }

    #[test]
    fn test_degenerate_triangle_rejected_by_weight_check() {
        // Collinear vertices: zero-area normal
        let tri = Triangle::from_positions(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 2.0, 0.0),
        );
        assert_eq!(tri.face_normal(), Vec3::ZERO);

        let w = tri.interpolation_weights_2d(Vec3::new(0.5, 0.5, 0.0));
        assert!(!is_valid_weight(w));
    }

    #[test]
    fn test_is_valid_weight() {
        assert!(is_valid_weight(Vec3::new(0.2, 0.3, 0.5)));
        assert!(!is_valid_weight(Vec3::new(0.2, 0.3, 0.6)));
        assert!(!is_valid_weight(Vec3::new(f32::NAN, 0.5, 0.5)));
        assert!(!is_valid_weight(Vec3::new(f32::INFINITY, 0.0, 0.0)));
    }

    #[test]
    fn test_xy_bounds() {
        let tri = Triangle::from_positions(
            Vec3::new(-0.5, 0.2, 9.0),
            Vec3::new(0.7, -0.3, 1.0),
            Vec3::new(0.1, 0.9, -4.0),
        );

        assert_eq!(tri.xy_min(), Vec2::new(-0.5, -0.3));
        assert_eq!(tri.xy_max(), Vec2::new(0.7, 0.9));
    }

    #[test]
    fn test_vertex_index_access() {
        let mut tri = unit_triangle();
        assert!(tri.vertex(2).is_ok());
        assert_eq!(tri.vertex(3), Err(GeometryError::VertexIndex(3)));

        let replacement = Vertex::from_position(Vec3::ONE);
        tri.set_vertex(1, replacement).unwrap();
        assert_eq!(tri.vertex(1).unwrap().position, Vec3::ONE);
        assert!(tri.set_vertex(5, replacement).is_err());
    }

    #[test]
    fn test_interpolate_attributes() {
        let tri = Triangle::new(
            Vertex::new(Vec3::ZERO, Vec3::X, Vec2::new(0.0, 0.0)),
            Vertex::new(Vec3::X, Vec3::Y, Vec2::new(1.0, 0.0)),
            Vertex::new(Vec3::Y, Vec3::Z, Vec2::new(0.0, 1.0)),
        );
        let w = Vec3::new(0.5, 0.25, 0.25);

        assert_eq!(tri.interpolate_normal(w), Vec3::new(0.5, 0.25, 0.25));
        assert_eq!(tri.interpolate_uv(w), Vec2::new(0.25, 0.25));
    }
}
