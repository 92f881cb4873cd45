//! Frustum culling for view-dependent rendering.
//!
//! Extracts frustum planes from the view-projection matrix and tests
//! transformed bounding boxes against them.
//!
//! Only the first five half-spaces take part in the test. The far plane is
//! extracted (and exposed for upload) but depth-range clipping owns it.

use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Mat4, Vec3, Vec3A, Vec4};
use umbra_shared::CULLED_FRUSTUM_PLANES;

/// A plane in 3D space (Ax + By + Cz + D = 0). The normal points inside.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Plane {
    /// Normal X component.
    pub a: f32,
    /// Normal Y component.
    pub b: f32,
    /// Normal Z component.
    pub c: f32,
    /// Distance from origin.
    pub d: f32,
}

impl Plane {
    /// Creates a new plane.
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Creates a plane from `(normal, d)` packed in a vector.
    #[must_use]
    pub fn from_vec4(v: Vec4) -> Self {
        let [a, b, c, d] = v.to_array();
        Self::new(a, b, c, d)
    }

    /// Normalizes the plane. Degenerate planes are returned unchanged.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = self.normal().length();
        if len > 0.0 {
            Self::from_vec4(self.as_vec4() / len)
        } else {
            self
        }
    }

    /// Plane normal.
    #[inline]
    #[must_use]
    pub const fn normal(&self) -> Vec3A {
        Vec3A::new(self.a, self.b, self.c)
    }

    /// Returns the signed distance from a point to the plane.
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, point: Vec3A) -> f32 {
        self.normal().dot(point) + self.d
    }

    /// Converts to vector format.
    #[inline]
    #[must_use]
    pub const fn as_vec4(&self) -> Vec4 {
        Vec4::new(self.a, self.b, self.c, self.d)
    }

    /// Converts to array format.
    #[must_use]
    pub const fn as_array(&self) -> [f32; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

/// View frustum for culling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Plane indices.
    pub const LEFT: usize = 0;
    /// Right plane index.
    pub const RIGHT: usize = 1;
    /// Bottom plane index.
    pub const BOTTOM: usize = 2;
    /// Top plane index.
    pub const TOP: usize = 3;
    /// Near plane index.
    pub const NEAR: usize = 4;
    /// Far plane index.
    pub const FAR: usize = 5;

    /// Creates a frustum from explicit planes, normalizing each.
    #[must_use]
    pub fn from_planes(planes: [Plane; 6]) -> Self {
        Self {
            planes: planes.map(Plane::normalized),
        }
    }

    /// Extracts frustum planes from a reverse-Z view-projection matrix
    /// (near plane at NDC depth 1, far plane at 0).
    #[must_use]
    pub fn from_view_projection(clip_from_world: &Mat4) -> Self {
        let row0 = clip_from_world.row(0);
        let row1 = clip_from_world.row(1);
        let row2 = clip_from_world.row(2);
        let row3 = clip_from_world.row(3);

        let mut planes = [Plane::default(); 6];
        planes[Self::LEFT] = Plane::from_vec4(row3 + row0);
        planes[Self::RIGHT] = Plane::from_vec4(row3 - row0);
        planes[Self::BOTTOM] = Plane::from_vec4(row3 + row1);
        planes[Self::TOP] = Plane::from_vec4(row3 - row1);
        planes[Self::NEAR] = Plane::from_vec4(row3 - row2);
        planes[Self::FAR] = Plane::from_vec4(row2);

        Self::from_planes(planes)
    }

    /// Converts planes to array format for GPU upload.
    #[must_use]
    pub fn as_arrays(&self) -> [[f32; 4]; 6] {
        self.planes.map(|plane| plane.as_array())
    }

    /// Tests a model-space AABB under `world_from_local` against the culled
    /// half-spaces.
    ///
    /// For each plane, the half extents are projected onto the plane normal
    /// through the three world-space basis axes, giving a conservative
    /// radius for the transformed box. The box is culled as soon as its
    /// center lies outside one half-space by at least that radius.
    #[must_use]
    pub fn intersects_obb(
        &self,
        world_from_local: &Affine3A,
        aabb_center: Vec3,
        aabb_half_extents: Vec3,
    ) -> bool {
        let world_center = world_from_local.transform_point3a(aabb_center.into());
        let axes = world_from_local.matrix3;
        let half_extents = Vec3A::from(aabb_half_extents);

        self.planes[..CULLED_FRUSTUM_PLANES].iter().all(|plane| {
            let normal = plane.normal();
            let relative_radius = Vec3A::new(
                normal.dot(axes.x_axis),
                normal.dot(axes.y_axis),
                normal.dot(axes.z_axis),
            )
            .abs()
            .dot(half_extents);

            plane.distance_to_point(world_center) + relative_radius > 0.0
        })
    }
}
