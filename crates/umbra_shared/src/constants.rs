//! # Stage Constants
//!
//! Values baked into both sides of the buffer ABI.
//! Changing any of these requires rebuilding every consumer.

/// Reserved index meaning "no corresponding record".
///
/// Used by `MeshInputRecord::previous_input_index` when an instance did not
/// exist last frame.
pub const SENTINEL_INDEX: u32 = u32::MAX;

/// Invocations per workgroup.
pub const WORKGROUP_SIZE: u32 = 64;

/// Number of frustum half-spaces tested per instance.
///
/// Left, right, bottom, top and near. The far plane is skipped: depth beyond
/// the far plane is handled by depth clamping.
pub const CULLED_FRUSTUM_PLANES: usize = 5;
