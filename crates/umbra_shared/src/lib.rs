//! # UMBRA Shared
//!
//! Buffer layouts and pure transform math shared by every UMBRA stage.
//!
//! ## CRITICAL RULE
//!
//! Everything in this crate is either:
//! - a `#[repr(C)]` POD record with a fixed byte layout (the ABI between the
//!   preprocessing stage and the draw/lighting stages), or
//! - a pure function over such records.
//!
//! No atomics, no buffers, no state. Those live in `umbra_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod constants;
pub mod records;

pub use codec::{
    pack_affine, pack_lightmap_uv_rect, unpack_affine, unpack_lightmap_uv_rect, LightmapUvRect,
    PackedAffine3, PackedInverseTranspose,
};
pub use constants::{CULLED_FRUSTUM_PLANES, SENTINEL_INDEX, WORKGROUP_SIZE};
pub use records::{
    DrawIndexedIndirectArgs, MeshCullingData, MeshFlags, MeshInputRecord, OutputMeshRecord,
    WorkItem,
};
