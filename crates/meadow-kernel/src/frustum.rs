//! View-frustum classification of axis-aligned boxes.
//!
//! Planes are extracted from a combined model-view-projection matrix with the
//! Gribb-Hartmann method (row 3 plus or minus rows 0, 1, 2), which assumes
//! OpenGL-style clip space `[-1, 1]³`. Each box is tested against all six
//! planes using its positive and negative vertices:
//!
//! - positive vertex behind any plane: the box is outside, stop
//! - negative vertex behind a plane: the box straddles it, keep testing
//!
//! Reference: lighthouse3d "View Frustum Culling - Geometric Approach - Testing Boxes".

use glam::{Mat4, Vec3};

use crate::geometry::{Aabb, Plane};

/// Result of classifying a box against a frustum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Entirely on the negative side of at least one plane
    Outside,
    /// Crosses at least one plane and is not outside any
    Intersecting,
    /// On the positive side of all six planes
    Inside,
}

impl Visibility {
    /// Whether anything of the box may be visible.
    #[must_use]
    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::Outside)
    }
}

/// Six frustum planes: near, far, bottom, top, left, right.
#[derive(Debug, Clone)]
pub struct Frustum {
    planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the frustum planes from a combined matrix
    /// (`projection * view`, or `projection * view * model`).
    #[must_use]
    pub fn from_matrix(mvp: &Mat4) -> Self {
        let r0 = mvp.row(0);
        let r1 = mvp.row(1);
        let r2 = mvp.row(2);
        let r3 = mvp.row(3);
        Self {
            planes: [
                Plane::from_coefficients(r3 + r2), // near
                Plane::from_coefficients(r3 - r2), // far
                Plane::from_coefficients(r3 + r1), // bottom
                Plane::from_coefficients(r3 - r1), // top
                Plane::from_coefficients(r3 + r0), // left
                Plane::from_coefficients(r3 - r0), // right
            ],
        }
    }

    /// Returns the extracted planes.
    #[must_use]
    pub fn planes(&self) -> &[Plane; 6] {
        &self.planes
    }

    /// Classifies `aabb` against this frustum.
    #[must_use]
    pub fn classify(&self, aabb: &Aabb) -> Visibility {
        let mut state = Visibility::Inside;
        for plane in &self.planes {
            if plane.distance(aabb.positive_vertex(plane.normal)) < 0.0 {
                return Visibility::Outside;
            }
            if plane.distance(aabb.negative_vertex(plane.normal)) < 0.0 {
                state = Visibility::Intersecting;
            }
        }
        state
    }
}

/// Classifies `aabb` against the frustum of `mvp`.
///
/// Prefer building a [`Frustum`] once per frame when testing many boxes.
#[must_use]
pub fn classify_aabb(aabb: &Aabb, mvp: &Mat4) -> Visibility {
    Frustum::from_matrix(mvp).classify(aabb)
}

/// Triangle mesh of a view frustum, for wireframe debug rendering.
#[derive(Debug, Clone, Default)]
pub struct FrustumMesh {
    /// 36 vertex positions (12 triangles), flattened xyz
    pub positions: Vec<f32>,
    /// Barycentric coordinate per vertex, flattened xyz
    pub barycentric: Vec<f32>,
}

/// Builds the mesh of a frustum looking down `-Z` from the origin.
///
/// `fov_degrees` is the full opening angle, used for both axes.
#[must_use]
pub fn frustum_mesh(near: f32, far: f32, fov_degrees: f32) -> FrustumMesh {
    let half_tan = (fov_degrees.to_radians() / 2.0).tan();
    let dnear = half_tan * near;
    let dfar = half_tan * far;

    let dir = Vec3::NEG_Z;
    let right = Vec3::X;
    let up = Vec3::Y;
    let corner = |depth: f32, half: f32, sx: f32, sy: f32| {
        dir * depth + right * (sx * half) + up * (sy * half)
    };

    let v1 = corner(near, dnear, -1.0, 1.0);
    let v2 = corner(near, dnear, -1.0, -1.0);
    let v3 = corner(near, dnear, 1.0, 1.0);
    let v4 = corner(near, dnear, 1.0, -1.0);
    let v5 = corner(far, dfar, -1.0, 1.0);
    let v6 = corner(far, dfar, -1.0, -1.0);
    let v7 = corner(far, dfar, 1.0, 1.0);
    let v8 = corner(far, dfar, 1.0, -1.0);

    let triangles = [
        // front
        v1, v2, v3, v3, v2, v4, //
        // back
        v7, v8, v5, v5, v8, v6, //
        // left
        v5, v6, v1, v1, v6, v2, //
        // right
        v3, v4, v7, v7, v4, v8, //
        // top
        v5, v1, v7, v7, v1, v3, //
        // bottom
        v8, v4, v6, v6, v4, v2,
    ];

    let positions = triangles.iter().flat_map(|v| v.to_array()).collect();
    let barycentric = [0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        .iter()
        .copied()
        .cycle()
        .take(triangles.len() * 3)
        .collect();

    FrustumMesh {
        positions,
        barycentric,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cube(center: Vec3, half: f32) -> Aabb {
        Aabb::from_center(center, Vec3::splat(half))
    }

    #[test]
    fn test_identity_inside_clip_cube() {
        let aabb = cube(Vec3::ZERO, 0.5);
        assert_eq!(classify_aabb(&aabb, &Mat4::IDENTITY), Visibility::Inside);
    }

    #[test]
    fn test_identity_outside() {
        let aabb = Aabb::new(Vec3::new(2.0, -0.5, -0.5), Vec3::new(3.0, 0.5, 0.5));
        assert_eq!(classify_aabb(&aabb, &Mat4::IDENTITY), Visibility::Outside);
        let behind = cube(Vec3::new(0.0, 0.0, -5.0), 1.0);
        assert_eq!(classify_aabb(&behind, &Mat4::IDENTITY), Visibility::Outside);
    }

    #[test]
    fn test_identity_intersecting() {
        let aabb = Aabb::new(Vec3::new(0.5, -0.5, -0.5), Vec3::new(1.5, 0.5, 0.5));
        assert_eq!(classify_aabb(&aabb, &Mat4::IDENTITY), Visibility::Intersecting);
        // bigger than the whole clip cube
        assert_eq!(
            classify_aabb(&cube(Vec3::ZERO, 10.0), &Mat4::IDENTITY),
            Visibility::Intersecting
        );
    }

    #[test]
    fn test_outside_dominates_intersecting() {
        // Straddles the left plane but lies entirely above the top plane
        let aabb = Aabb::new(Vec3::new(-1.5, 2.0, -0.5), Vec3::new(-0.5, 3.0, 0.5));
        assert_eq!(classify_aabb(&aabb, &Mat4::IDENTITY), Visibility::Outside);
    }

    #[test]
    fn test_perspective_view() {
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 100.0);
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
        let frustum = Frustum::from_matrix(&(projection * view));

        assert_eq!(
            frustum.classify(&cube(Vec3::new(0.0, 0.0, -10.0), 1.0)),
            Visibility::Inside
        );
        assert_eq!(
            frustum.classify(&cube(Vec3::new(0.0, 0.0, 10.0), 1.0)),
            Visibility::Outside
        );
        assert_eq!(
            frustum.classify(&cube(Vec3::new(0.0, 0.0, -100.0), 5.0)),
            Visibility::Intersecting
        );
        assert_eq!(
            frustum.classify(&cube(Vec3::new(50.0, 0.0, -10.0), 1.0)),
            Visibility::Outside
        );
    }

    #[test]
    fn test_planes_are_unit_length() {
        let projection = Mat4::perspective_rh_gl(45f32.to_radians(), 16.0 / 9.0, 0.1, 500.0);
        let frustum = Frustum::from_matrix(&projection);
        for plane in frustum.planes() {
            assert!((plane.normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_frustum_mesh_layout() {
        let mesh = frustum_mesh(1.0, 10.0, 90.0);
        assert_eq!(mesh.positions.len(), 36 * 3);
        assert_eq!(mesh.barycentric.len(), 36 * 3);
        // first vertex: top-left of the near plane, tan(45°) = 1
        assert!((mesh.positions[0] + 1.0).abs() < 1e-5);
        assert!((mesh.positions[1] - 1.0).abs() < 1e-5);
        assert!((mesh.positions[2] + 1.0).abs() < 1e-5);
        assert_eq!(&mesh.barycentric[..9], &[0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_boxes_beyond_a_clip_face_are_outside(
            axis in 0usize..3,
            sign in prop::bool::ANY,
            offset in 1.01f32..50.0,
            half in 0.001f32..1.0,
            a in -0.9f32..0.9,
            b in -0.9f32..0.9,
        ) {
            let mut center = [a, b, a];
            let s = if sign { 1.0 } else { -1.0 };
            center[axis] = s * (offset + half);
            let aabb = cube(Vec3::from_array(center), half);
            prop_assert_eq!(classify_aabb(&aabb, &Mat4::IDENTITY), Visibility::Outside);
        }

        #[test]
        fn prop_boxes_inside_clip_cube_are_inside(
            x in -0.5f32..0.5,
            y in -0.5f32..0.5,
            z in -0.5f32..0.5,
            half in 0.0f32..0.49,
        ) {
            let aabb = cube(Vec3::new(x, y, z), half);
            prop_assert_eq!(classify_aabb(&aabb, &Mat4::IDENTITY), Visibility::Inside);
        }
    }
}
