//! Triangle rasterization shared by the camera pass, shadow maps and RSMs.
//!
//! Triangles arrive in clip space, are clipped against the near plane,
//! projected to NDC and then scanned over pixel centers. Depth is
//! interpolated linearly in screen space; per-vertex varyings are
//! interpolated perspective-correctly.

use std::ops::{Add, Mul};

use hypox_core::{is_valid_weight, Triangle};
use hypox_math::{Vec2, Vec3, Vec4};

/// Values interpolated across a triangle.
pub trait Varying: Copy + Send + Sync + Add<Output = Self> + Mul<f32, Output = Self> {}

impl<T> Varying for T where T: Copy + Send + Sync + Add<Output = T> + Mul<f32, Output = T> {}

/// A vertex after projection, before the homogeneous divide.
#[derive(Clone, Copy, Debug)]
pub struct ClipVertex<V> {
    pub clip: Vec4,
    pub varying: V,
}

impl<V: Varying> ClipVertex<V> {
    pub fn new(clip: Vec4, varying: V) -> Self {
        Self { clip, varying }
    }

    /// Signed distance to the near plane; non-negative means in front of it.
    fn near_distance(&self) -> f32 {
        self.clip.w - self.clip.z
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(other.clip, t),
            varying: self.varying * (1.0 - t) + other.varying * t,
        }
    }
}

/// Clip a triangle against the near plane.
///
/// Returns zero, one or two triangles with every vertex at or in front of the
/// near plane (so `w > 0`). Winding is preserved.
pub fn clip_near<V: Varying>(vertices: [ClipVertex<V>; 3]) -> Vec<[ClipVertex<V>; 3]> {
    let dist = vertices.map(|v| v.near_distance());
    if dist.iter().any(|d| d.is_nan()) {
        return Vec::new();
    }
    if dist.iter().all(|&d| d >= 0.0) {
        return vec![vertices];
    }
    if dist.iter().all(|&d| d < 0.0) {
        return Vec::new();
    }

    // Sutherland-Hodgman against a single plane
    let mut polygon = Vec::with_capacity(4);
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (a, b) = (&vertices[i], &vertices[j]);
        let (da, db) = (dist[i], dist[j]);

        if da >= 0.0 {
            polygon.push(*a);
        }
        if (da >= 0.0) != (db >= 0.0) {
            polygon.push(a.lerp(b, da / (da - db)));
        }
    }

    (1..polygon.len().saturating_sub(1))
        .map(|k| [polygon[0], polygon[k], polygon[k + 1]])
        .collect()
}

/// An inclusive-exclusive rectangle of pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// The full buffer.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    /// Overlap of two rectangles, if any.
    pub fn intersect(&self, other: &PixelRect) -> Option<PixelRect> {
        let rect = PixelRect::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        (!rect.is_empty()).then_some(rect)
    }
}

/// Map NDC to a pixel column or row index (may be out of range).
pub fn ndc_to_pixel(ndc: f32, size: u32) -> i64 {
    ((ndc + 1.0) * 0.5 * size as f32).floor() as i64
}

/// NDC coordinate of a pixel center.
pub fn pixel_center_ndc(index: u32, size: u32) -> f32 {
    2.0 * (index as f32 + 0.5) / size as f32 - 1.0
}

/// A projected triangle ready for scan conversion.
#[derive(Clone, Copy, Debug)]
pub struct ScreenTriangle<V> {
    /// NDC positions; z holds NDC depth
    pub ndc: Triangle,
    /// 1 / w per vertex
    pub inv_w: Vec3,
    pub varyings: [V; 3],
}

impl<V: Varying> ScreenTriangle<V> {
    /// Homogeneous divide of a clipped triangle.
    pub fn from_clip(vertices: [ClipVertex<V>; 3]) -> Self {
        let [a, b, c] = vertices.map(|v| v.clip.truncate() / v.clip.w);
        Self {
            ndc: Triangle::from_positions(a, b, c),
            inv_w: Vec3::new(
                1.0 / vertices[0].clip.w,
                1.0 / vertices[1].clip.w,
                1.0 / vertices[2].clip.w,
            ),
            varyings: vertices.map(|v| v.varying),
        }
    }

    /// Pixels that may be covered, dilated by one pixel and clipped to the buffer.
    ///
    /// `None` when the triangle lies fully outside [-1, 1]^2 or its bounds are
    /// not finite.
    pub fn pixel_bounds(&self, width: u32, height: u32) -> Option<PixelRect> {
        if !self.ndc.positions().iter().all(|p| p.is_finite()) {
            return None;
        }

        let min = self.ndc.xy_min();
        let max = self.ndc.xy_max();

        if !(min.x <= max.x && min.y <= max.y) {
            return None;
        }
        if max.x < -1.0 || min.x > 1.0 || max.y < -1.0 || min.y > 1.0 {
            return None;
        }

        let clamp = |v: i64, size: u32| v.clamp(0, size as i64) as u32;
        let rect = PixelRect::new(
            clamp(ndc_to_pixel(min.x, width) - 1, width),
            clamp(ndc_to_pixel(min.y, height) - 1, height),
            clamp(ndc_to_pixel(max.x, width) + 2, width),
            clamp(ndc_to_pixel(max.y, height) + 2, height),
        );
        (!rect.is_empty()).then_some(rect)
    }

    /// Rate of change of NDC depth per unit of NDC x and y.
    ///
    /// NDC depth is affine in screen space over a planar triangle, so this
    /// gradient extrapolates depth exactly anywhere on the triangle's plane.
    /// Zero for triangles without screen area.
    pub fn depth_gradient(&self) -> Vec2 {
        let [a, b, c] = self.ndc.positions();
        let (e1, e2) = (b - a, c - a);
        let det = e1.x * e2.y - e2.x * e1.y;
        if det == 0.0 || !det.is_finite() {
            return Vec2::ZERO;
        }

        let gradient = Vec2::new(
            (e1.z * e2.y - e2.z * e1.y) / det,
            (e2.z * e1.x - e1.z * e2.x) / det,
        );
        if gradient.is_finite() {
            gradient
        } else {
            Vec2::ZERO
        }
    }

    /// Scan the pixel centers in `rect` and emit one fragment per covered pixel.
    pub fn rasterize(&self, rect: PixelRect, width: u32, height: u32, mut emit: impl FnMut(Fragment<V>)) {
        let depths = Vec3::from(self.ndc.positions().map(|p| p.z));
        let [v0, v1, v2] = self.varyings;

        for y in rect.y0..rect.y1 {
            let ndc_y = pixel_center_ndc(y, height);
            for x in rect.x0..rect.x1 {
                let ndc_x = pixel_center_ndc(x, width);
                let weights = self.ndc.interpolation_weights_2d(Vec3::new(ndc_x, ndc_y, 0.0));
                if !is_valid_weight(weights) {
                    continue;
                }

                let depth = weights.dot(depths);

                let perspective = weights * self.inv_w;
                let perspective = perspective / perspective.element_sum();
                let varying = v0 * perspective.x + v1 * perspective.y + v2 * perspective.z;

                emit(Fragment {
                    x,
                    y,
                    ndc: Vec3::new(ndc_x, ndc_y, depth),
                    varying,
                });
            }
        }
    }
}

/// A covered pixel produced by [`ScreenTriangle::rasterize`].
#[derive(Clone, Copy, Debug)]
pub struct Fragment<V> {
    pub x: u32,
    pub y: u32,
    /// Pixel center and interpolated depth in NDC
    pub ndc: Vec3,
    pub varying: V,
}

/// Map NDC depth (+1 near, -1 far) to [0, 1] with 0 nearest.
pub fn normalized_depth(ndc_z: f32) -> f32 {
    (1.0 - ndc_z) * 0.5
}

/// Pixel-space position of an NDC point, used by visibility lookups.
pub fn ndc_to_texel(ndc: Vec2, width: u32, height: u32) -> Option<(u32, u32)> {
    let x = ndc_to_pixel(ndc.x, width);
    let y = ndc_to_pixel(ndc.y, height);
    let inside = (0..width as i64).contains(&x) && (0..height as i64).contains(&y);
    inside.then_some((x as u32, y as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f32, y: f32, z: f32, w: f32, value: f32) -> ClipVertex<f32> {
        ClipVertex::new(Vec4::new(x, y, z, w), value)
    }

    #[test]
    fn test_clip_keeps_visible_triangle() {
        let tri = [
            vertex(-1.0, -1.0, 0.0, 1.0, 0.0),
            vertex(1.0, -1.0, 0.0, 1.0, 1.0),
            vertex(0.0, 1.0, 0.0, 1.0, 2.0),
        ];
        let out = clip_near(tri);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0][2].varying, 2.0);
    }

    #[test]
    fn test_clip_discards_triangle_behind_near_plane() {
        let tri = [
            vertex(0.0, 0.0, 2.0, 1.0, 0.0),
            vertex(1.0, 0.0, 2.0, 1.0, 0.0),
            vertex(0.0, 1.0, 2.0, 1.0, 0.0),
        ];
        assert!(clip_near(tri).is_empty());
    }

    #[test]
    fn test_clip_one_vertex_behind() {
        // Vertex 0 is behind the near plane (w - z = -1), others in front (w - z = 1)
        let tri = [
            vertex(0.0, 0.0, 1.0, 0.0, 0.0),
            vertex(1.0, 0.0, 0.0, 1.0, 1.0),
            vertex(0.0, 1.0, 0.0, 1.0, 1.0),
        ];
        let out = clip_near(tri);
        assert_eq!(out.len(), 2);

        for tri in &out {
            for v in tri {
                assert!(v.clip.w - v.clip.z >= -1e-6);
            }
        }
        // Intersection points sit halfway along the cut edges
        let varyings: Vec<f32> = out.iter().flat_map(|t| t.iter().map(|v| v.varying)).collect();
        assert!(varyings.iter().any(|&v| (v - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_clip_two_vertices_behind() {
        let tri = [
            vertex(0.0, 0.0, 0.0, 1.0, 1.0),
            vertex(1.0, 0.0, 1.0, 0.0, 0.0),
            vertex(0.0, 1.0, 1.0, 0.0, 0.0),
        ];
        let out = clip_near(tri);
        assert_eq!(out.len(), 1);
        assert!(out[0].iter().all(|v| v.clip.w - v.clip.z >= -1e-6));
    }

    #[test]
    fn test_pixel_rect_intersect() {
        let a = PixelRect::new(0, 0, 10, 10);
        let b = PixelRect::new(5, 8, 20, 20);
        assert_eq!(a.intersect(&b), Some(PixelRect::new(5, 8, 10, 10)));
        assert_eq!(a.intersect(&PixelRect::new(10, 0, 12, 4)), None);
        assert!(a.contains(9, 9));
        assert!(!a.contains(10, 0));
    }

    #[test]
    fn test_pixel_bounds_rejects_offscreen_and_nan() {
        let offscreen = ScreenTriangle::from_clip([
            vertex(2.0, 0.0, 0.0, 1.0, 0.0),
            vertex(3.0, 0.0, 0.0, 1.0, 0.0),
            vertex(2.5, 1.0, 0.0, 1.0, 0.0),
        ]);
        assert!(offscreen.pixel_bounds(16, 16).is_none());

        let nan = ScreenTriangle::from_clip([
            vertex(f32::NAN, 0.0, 0.0, 1.0, 0.0),
            vertex(0.5, 0.0, 0.0, 1.0, 0.0),
            vertex(0.0, 0.5, 0.0, 1.0, 0.0),
        ]);
        assert!(nan.pixel_bounds(16, 16).is_none());

        // w = 0 divides to infinity
        let infinite = ScreenTriangle::from_clip([
            vertex(0.5, 0.5, 0.0, 0.0, 0.0),
            vertex(0.5, 0.0, 0.0, 1.0, 0.0),
            vertex(0.0, 0.5, 0.0, 1.0, 0.0),
        ]);
        assert!(infinite.pixel_bounds(16, 16).is_none());
    }

    #[test]
    fn test_depth_gradient_extrapolates_plane() {
        let tri = ScreenTriangle::from_clip([
            vertex(-0.5, -0.5, 0.1, 1.0, 0.0),
            vertex(0.5, -0.5, 0.3, 1.0, 0.0),
            vertex(0.0, 0.5, 0.6, 1.0, 0.0),
        ]);
        let g = tri.depth_gradient();
        assert!((g - Vec2::new(0.2, 0.4)).length() < 1e-6);

        // Depth at any pixel center matches the plane through the first vertex
        tri.rasterize(PixelRect::full(16, 16), 16, 16, |frag| {
            let predicted = 0.1 + g.dot(frag.ndc.truncate() - Vec2::new(-0.5, -0.5));
            assert!((frag.ndc.z - predicted).abs() < 1e-5);
        });

        let flat = ScreenTriangle::from_clip([
            vertex(0.0, 0.0, 0.0, 1.0, 0.0),
            vertex(1.0, 1.0, 0.5, 1.0, 0.0),
            vertex(2.0, 2.0, 1.0, 1.0, 0.0),
        ]);
        assert_eq!(flat.depth_gradient(), Vec2::ZERO);
    }

    #[test]
    fn test_pixel_bounds_dilated_and_clamped() {
        let tri = ScreenTriangle::from_clip([
            vertex(-0.5, -0.5, 0.0, 1.0, 0.0),
            vertex(0.5, -0.5, 0.0, 1.0, 0.0),
            vertex(0.0, 2.0, 0.0, 1.0, 0.0),
        ]);
        // x: [-0.5, 0.5] -> pixels 4..=12 dilated to 3..14; y clamps to the top
        assert_eq!(tri.pixel_bounds(16, 16), Some(PixelRect::new(3, 3, 14, 16)));
    }

    #[test]
    fn test_rasterize_full_screen_quad_half() {
        // Lower-left half of the screen at constant depth 0.5
        let tri = ScreenTriangle::from_clip([
            vertex(-1.0, -1.0, 0.5, 1.0, 1.0),
            vertex(1.0, -1.0, 0.5, 1.0, 1.0),
            vertex(-1.0, 1.0, 0.5, 1.0, 1.0),
        ]);

        let mut covered = Vec::new();
        tri.rasterize(PixelRect::full(4, 4), 4, 4, |frag| covered.push(frag));

        // Pixel centers strictly below the diagonal plus the ones on it
        assert_eq!(covered.len(), 10);
        for frag in &covered {
            assert!((frag.ndc.z - 0.5).abs() < 1e-6);
            assert!((frag.varying - 1.0).abs() < 1e-5);
            assert!(frag.ndc.x + frag.ndc.y <= 1e-6);
        }
    }

    #[test]
    fn test_rasterize_perspective_correct() {
        // Vertex 0 is close (w = 1), the others far (w = 3); the varying is view depth.
        let tri = ScreenTriangle::from_clip([
            vertex(-1.0, -1.0, 0.0, 1.0, 1.0),
            vertex(3.0, -3.0, 0.0, 3.0, 3.0),
            vertex(-1.0 * 3.0, 3.0, 0.0, 3.0, 3.0),
        ]);

        let mut frags = Vec::new();
        tri.rasterize(PixelRect::full(8, 8), 8, 8, |frag| frags.push(frag));
        assert!(!frags.is_empty());

        for frag in frags {
            // Perspective-correct interpolation of w reproduces 1 / (interpolated 1/w)
            let w = tri.ndc.interpolation_weights_2d(frag.ndc);
            let expected = 1.0 / w.dot(tri.inv_w);
            assert!((frag.varying - expected).abs() < 1e-3, "{} vs {}", frag.varying, expected);
        }
    }

    #[test]
    fn test_restricted_rect() {
        let tri = ScreenTriangle::from_clip([
            vertex(-1.0, -1.0, 0.0, 1.0, 0.0),
            vertex(1.0, -1.0, 0.0, 1.0, 0.0),
            vertex(-1.0, 1.0, 0.0, 1.0, 0.0),
        ]);

        let mut count = 0;
        tri.rasterize(PixelRect::new(0, 0, 2, 2), 4, 4, |frag| {
            assert!(frag.x < 2 && frag.y < 2);
            count += 1;
        });
        assert_eq!(count, 4);
    }

    #[test]
    fn test_normalized_depth_and_texel() {
        assert_eq!(normalized_depth(1.0), 0.0);
        assert_eq!(normalized_depth(-1.0), 1.0);
        assert_eq!(ndc_to_texel(Vec2::new(0.0, 0.0), 4, 4), Some((2, 2)));
        assert_eq!(ndc_to_texel(Vec2::new(-1.0, -1.0), 4, 4), Some((0, 0)));
        assert_eq!(ndc_to_texel(Vec2::new(1.0, 0.0), 4, 4), None);
    }
}
