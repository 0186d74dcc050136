//! Plane and axis-aligned bounding box primitives.

use glam::{Vec3, Vec4};

/// A plane given by its unit normal and signed distance to the origin.
///
/// Points `p` on the plane satisfy `normal.dot(p) + d == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Signed distance term
    pub d: f32,
}

impl Plane {
    /// Builds a plane from `(a, b, c, d)` coefficients.
    ///
    /// `(a, b, c)` is normalized and `d` is scaled by the same factor.
    #[must_use]
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.truncate();
        let len = normal.length();
        Self {
            normal: normal / len,
            d: coefficients.w / len,
        }
    }

    /// Builds the plane through three points wound counter-clockwise, with
    /// `b` as the pivot: `normal = normalize((a - b) × (c - b))`.
    #[must_use]
    pub fn from_triangle(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let n = (a - b).cross(c - b);
        Self::from_coefficients(n.extend(-n.dot(b)))
    }

    /// Signed distance of `point` to this plane. Positive on the normal side.
    #[must_use]
    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Returns the plane as `(A, B, C, D)`.
    #[must_use]
    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.d)
    }

    /// Solves the plane equation for `y` at `(x, z)`.
    ///
    /// Only meaningful for non-vertical planes (`normal.y != 0`).
    #[must_use]
    pub fn height_at(&self, x: f32, z: f32) -> f32 {
        -(self.d + self.normal.x * x + self.normal.z * z) / self.normal.y
    }
}

/// An axis-aligned bounding box given by two opposite corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Creates an AABB from its minimum and maximum corners.
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        debug_assert!(min.cmple(max).all(), "AABB min {min} exceeds max {max}");
        Self { min, max }
    }

    /// Creates an AABB spanning `center ± half_extents`.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Returns the center point.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half extents along each axis.
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// The corner furthest along `normal` (the "positive vertex").
    #[must_use]
    pub fn positive_vertex(&self, normal: Vec3) -> Vec3 {
        Vec3::select(normal.cmpge(Vec3::ZERO), self.max, self.min)
    }

    /// The corner opposite [`Self::positive_vertex`].
    #[must_use]
    pub fn negative_vertex(&self, normal: Vec3) -> Vec3 {
        Vec3::select(normal.cmpge(Vec3::ZERO), self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_normalizes_coefficients() {
        let plane = Plane::from_coefficients(Vec4::new(0.0, 2.0, 0.0, -4.0));
        assert_eq!(plane.normal, Vec3::Y);
        assert_eq!(plane.d, -2.0);
        assert_eq!(plane.distance(Vec3::new(5.0, 2.0, -3.0)), 0.0);
        assert_eq!(plane.distance(Vec3::new(0.0, 3.0, 0.0)), 1.0);
    }

    #[test]
    fn test_plane_from_ccw_triangle_points_up() {
        // 1---3
        // | /
        // 2
        let p1 = Vec3::new(0.0, 1.0, 1.0);
        let p2 = Vec3::new(0.0, 1.0, 0.0);
        let p3 = Vec3::new(1.0, 1.0, 1.0);
        let plane = Plane::from_triangle(p1, p2, p3);
        assert!((plane.normal - Vec3::Y).length() < 1e-6);
        assert!((plane.height_at(0.3, 0.7) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_plane_height_at_slope() {
        // y = x
        let plane = Plane::from_triangle(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        );
        assert!((plane.height_at(0.25, 0.9) - 0.25).abs() < 1e-6);
        assert!(plane.normal.y > 0.0);
    }

    #[test]
    fn test_aabb_vertices() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 4.0, 3.0));
        let normal = Vec3::new(1.0, -1.0, 0.0);
        assert_eq!(aabb.positive_vertex(normal), Vec3::new(1.0, 0.0, 3.0));
        assert_eq!(aabb.negative_vertex(normal), Vec3::new(-1.0, 4.0, 2.0));
        assert_eq!(aabb.center(), Vec3::new(0.0, 2.0, 2.5));
        assert_eq!(aabb.half_extents(), Vec3::new(1.0, 2.0, 0.5));
    }

    #[test]
    fn test_aabb_from_center() {
        let aabb = Aabb::from_center(Vec3::new(8.0, 5.0, 8.0), Vec3::new(8.0, 5.0, 8.0));
        assert_eq!(aabb.min, Vec3::ZERO);
        assert_eq!(aabb.max, Vec3::new(16.0, 10.0, 16.0));
    }
}
