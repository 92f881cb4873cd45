//! GPU buffer records.
//!
//! These are the canonical layouts consumed by the preprocessing stage and by
//! the draw calls that follow it. Every record is `#[repr(C)]`, contains only
//! 32-bit fields and has no padding, so a record is an exact run of `u32`
//! words on both sides of the bus.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Vec3};

use crate::codec::{pack_affine, PackedAffine3, PackedInverseTranspose};
use crate::constants::SENTINEL_INDEX;

bitflags! {
    /// Per-mesh flags, copied through to the output record untouched.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MeshFlags: u32 {
        /// The mesh receives shadows.
        const SHADOW_RECEIVER = 1 << 0;
        /// The mesh receives shadows through transmission.
        const TRANSMITTED_SHADOW_RECEIVER = 1 << 1;
        /// The 3×3 part of the world transform has a non-negative determinant.
        ///
        /// The vertex stage uses it to fix tangent handedness under mirroring.
        const SIGN_DETERMINANT_MODEL_3X3 = 1 << 31;
    }
}

impl MeshFlags {
    /// Returns these flags with the determinant sign bit derived from `world_from_local`.
    #[must_use]
    pub fn with_transform_sign(self, world_from_local: &Affine3A) -> Self {
        let mut flags = self - Self::SIGN_DETERMINANT_MODEL_3X3;
        if world_from_local.matrix3.determinant().is_sign_positive() {
            flags |= Self::SIGN_DETERMINANT_MODEL_3X3;
        }
        flags
    }
}

/// Per-instance input, uploaded by the batcher once per frame.
///
/// Double-buffered: the previous frame's array is kept alive so motion
/// vectors can be computed from `previous_input_index`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MeshInputRecord {
    /// World transform, transposed 3×4 form.
    pub world_from_local: PackedAffine3,
    /// Lightmap UV rectangle, 16-bit unorm pairs.
    pub lightmap_uv_rect: [u32; 2],
    /// Raw [`MeshFlags`] bits.
    pub flags: u32,
    /// Index into the previous frame's input array, or [`SENTINEL_INDEX`].
    pub previous_input_index: u32,
}

impl MeshInputRecord {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates an input record.
    ///
    /// `previous_input_index` is `None` for instances that did not exist last frame.
    #[must_use]
    pub fn new(
        world_from_local: &Affine3A,
        lightmap_uv_rect: [u32; 2],
        flags: MeshFlags,
        previous_input_index: Option<u32>,
    ) -> Self {
        Self {
            world_from_local: pack_affine(world_from_local),
            lightmap_uv_rect,
            flags: flags.with_transform_sign(world_from_local).bits(),
            previous_input_index: previous_input_index.unwrap_or(SENTINEL_INDEX),
        }
    }

    /// Returns the previous-frame index, if the instance existed last frame.
    #[inline]
    #[must_use]
    pub const fn previous_index(&self) -> Option<u32> {
        if self.previous_input_index == SENTINEL_INDEX {
            None
        } else {
            Some(self.previous_input_index)
        }
    }
}

/// Model-space bounds, index-aligned with [`MeshInputRecord`].
///
/// `w` components are padding (16-byte rows on the GPU side).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MeshCullingData {
    /// AABB center in model space.
    pub aabb_center: [f32; 4],
    /// AABB half extents in model space.
    pub aabb_half_extents: [f32; 4],
}

impl MeshCullingData {
    /// Creates culling data from a center and half extents.
    #[must_use]
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            aabb_center: center.extend(0.0).to_array(),
            aabb_half_extents: half_extents.extend(0.0).to_array(),
        }
    }

    /// Creates culling data from min/max corners.
    #[must_use]
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    /// AABB center.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Vec3 {
        Vec3::from_slice(&self.aabb_center[..3])
    }

    /// AABB half extents.
    #[inline]
    #[must_use]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::from_slice(&self.aabb_half_extents[..3])
    }
}

/// One unit of preprocessing work: which input to read, where to write.
///
/// In direct mode `output_index` is the destination slot. In indirect mode
/// it names the indirect parameters record (the batch) the slot is claimed
/// from.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct WorkItem {
    /// Index into the current input array.
    pub input_index: u32,
    /// Destination slot (direct) or batch index (indirect).
    pub output_index: u32,
}

impl WorkItem {
    /// Creates a work item.
    #[must_use]
    pub const fn new(input_index: u32, output_index: u32) -> Self {
        Self {
            input_index,
            output_index,
        }
    }
}

/// Fully expanded per-draw data, written by the preprocessing stage.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct OutputMeshRecord {
    /// Current world transform, transposed 3×4 form.
    pub world_from_local: PackedAffine3,
    /// Last frame's world transform, transposed 3×4 form.
    pub previous_world_from_local: PackedAffine3,
    /// Packed inverse-transpose, first eight entries.
    pub local_from_world_transpose_a: [[f32; 4]; 2],
    /// Packed inverse-transpose, last entry.
    pub local_from_world_transpose_b: f32,
    /// Raw [`MeshFlags`] bits.
    pub flags: u32,
    /// Lightmap UV rectangle, 16-bit unorm pairs.
    pub lightmap_uv_rect: [u32; 2],
}

impl OutputMeshRecord {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Returns the packed inverse-transpose.
    #[must_use]
    pub const fn inverse_transpose(&self) -> PackedInverseTranspose {
        PackedInverseTranspose {
            a: self.local_from_world_transpose_a,
            b: self.local_from_world_transpose_b,
        }
    }
}

/// `DrawIndexedIndirect` arguments, as consumed by a multi-instance indirect draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    /// Indices per instance.
    pub index_count: u32,
    /// Number of instances to draw (filled by the preprocessing stage).
    pub instance_count: u32,
    /// First index.
    pub first_index: u32,
    /// Base vertex.
    pub base_vertex: i32,
    /// First instance: the base slot of this batch in the output buffer.
    pub first_instance: u32,
}

impl DrawIndexedIndirectArgs {
    /// Creates arguments for a batch with zero instances.
    #[must_use]
    pub const fn new(
        index_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Self {
        Self {
            index_count,
            instance_count: 0,
            first_index,
            base_vertex,
            first_instance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        // Word-exact layouts, no padding
        assert_eq!(MeshInputRecord::SIZE, 64);
        assert_eq!(std::mem::size_of::<MeshCullingData>(), 32);
        assert_eq!(std::mem::size_of::<WorkItem>(), 8);
        assert_eq!(OutputMeshRecord::SIZE, 144);
        assert_eq!(std::mem::size_of::<DrawIndexedIndirectArgs>(), 20);
    }

    #[test]
    fn test_sentinel_previous_index() {
        let input = MeshInputRecord::new(&Affine3A::IDENTITY, [0, 0], MeshFlags::empty(), None);
        assert_eq!(input.previous_input_index, SENTINEL_INDEX);
        assert_eq!(input.previous_index(), None);

        let input = MeshInputRecord::new(&Affine3A::IDENTITY, [0, 0], MeshFlags::empty(), Some(7));
        assert_eq!(input.previous_index(), Some(7));
    }

    #[test]
    fn test_determinant_sign_flag() {
        let mirrored = Affine3A::from_scale(Vec3::new(-1.0, 1.0, 1.0));
        let flags = MeshFlags::SHADOW_RECEIVER | MeshFlags::SIGN_DETERMINANT_MODEL_3X3;

        let flags = flags.with_transform_sign(&mirrored);
        assert!(!flags.contains(MeshFlags::SIGN_DETERMINANT_MODEL_3X3));
        assert!(flags.contains(MeshFlags::SHADOW_RECEIVER));

        let flags = flags.with_transform_sign(&Affine3A::IDENTITY);
        assert!(flags.contains(MeshFlags::SIGN_DETERMINANT_MODEL_3X3));
    }

    #[test]
    fn test_culling_data_from_min_max() {
        let data = MeshCullingData::from_min_max(Vec3::splat(-2.0), Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(data.center(), Vec3::new(0.0, 1.0, 2.0));
        assert_eq!(data.half_extents(), Vec3::new(2.0, 3.0, 4.0));
    }
}
