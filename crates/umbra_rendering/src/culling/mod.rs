//! Culling systems for GPU-efficient rendering.
//!
//! Implements frustum culling and hierarchical occlusion culling. The
//! [`CullingEngine`] chains them for one instance: frustum first, and the
//! occlusion test only for boxes the frustum kept.

mod frustum;
mod occlusion;

pub use frustum::{Frustum, Plane};
pub use occlusion::{DepthPyramid, OcclusionCuller, MAX_DEPTH_PYRAMID_MIPS};

use glam::Affine3A;
use umbra_shared::MeshCullingData;

/// Outcome of culling one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullResult {
    /// Passed every enabled test.
    Visible,
    /// Outside one of the frustum half-spaces.
    FrustumCulled,
    /// Hidden behind the depth pyramid.
    OcclusionCulled,
}

impl CullResult {
    /// Returns true for [`CullResult::Visible`].
    #[inline]
    #[must_use]
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

/// Per-instance visibility decision for one view.
///
/// Disabled tests are `None`. Built once per dispatch and shared by every
/// invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CullingEngine<'a> {
    frustum: Option<&'a Frustum>,
    occlusion: Option<OcclusionCuller<'a>>,
}

impl<'a> CullingEngine<'a> {
    /// Creates an engine. Occlusion is only consulted after the frustum test.
    #[must_use]
    pub const fn new(frustum: Option<&'a Frustum>, occlusion: Option<OcclusionCuller<'a>>) -> Self {
        Self { frustum, occlusion }
    }

    /// Returns true if no test is enabled.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.frustum.is_none() && self.occlusion.is_none()
    }

    /// Decides whether the instance's bounds under `world_from_local` are visible.
    #[must_use]
    pub fn cull(&self, world_from_local: &Affine3A, bounds: &MeshCullingData) -> CullResult {
        let center = bounds.center();
        let half_extents = bounds.half_extents();

        if let Some(frustum) = self.frustum {
            if !frustum.intersects_obb(world_from_local, center, half_extents) {
                return CullResult::FrustumCulled;
            }
        }
        if let Some(occlusion) = &self.occlusion {
            if !occlusion.is_visible(world_from_local, center, half_extents) {
                return CullResult::OcclusionCulled;
            }
        }
        CullResult::Visible
    }
}
