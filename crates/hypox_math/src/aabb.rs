use crate::{Interval, Vec3};

/// Axis-aligned bounding box used to report object and scene extents.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create the tightest AABB around a set of points.
    ///
    /// Returns `Aabb::EMPTY` when the iterator yields nothing.
    pub fn from_iter_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for point in points {
            aabb.include_point(point);
        }
        aabb
    }

    /// Grow the box so that it contains `point`.
    pub fn include_point(&mut self, point: Vec3) {
        self.x.include(point.x);
        self.y.include(point.y);
        self.z.include(point.z);
    }

    /// True if no point has been added to the box.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Minimum corner.
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    /// Maximum corner.
    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }

    /// Static constants
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_iter_points() {
        let aabb = Aabb::from_iter_points([
            Vec3::new(-1.0, 2.0, 0.0),
            Vec3::new(3.0, -4.0, 1.0),
            Vec3::new(0.0, 0.0, 5.0),
        ]);

        assert_eq!(aabb.min(), Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(aabb.max(), Vec3::new(3.0, 2.0, 5.0));
        assert_eq!(aabb.centroid(), Vec3::new(1.0, -1.0, 2.5));
    }

    #[test]
    fn test_aabb_empty() {
        let aabb = Aabb::from_iter_points(std::iter::empty());
        assert!(aabb.is_empty());
        assert!(!Aabb::from_iter_points([Vec3::ZERO, Vec3::ONE]).is_empty());
    }
}
