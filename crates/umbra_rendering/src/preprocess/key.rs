//! Pipeline variant key.

use bitflags::bitflags;

use crate::error::{ConfigError, ConfigResult};

bitflags! {
    /// Which preprocessing variant runs. Fixed for the lifetime of a
    /// [`MeshPreprocessor`](super::MeshPreprocessor).
    ///
    /// Valid variants: direct, frustum culling, frustum + occlusion
    /// culling, each with or without indirect drawing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PreprocessPipelineKey: u8 {
        /// Test bounds against the view frustum.
        const FRUSTUM_CULLING = 1 << 0;
        /// Test bounds against the depth pyramid; skip already-visible
        /// work items and write the prepass output.
        const OCCLUSION_CULLING = 1 << 1;
        /// Claim slots from atomic per-batch counters.
        const INDIRECT_DRAW = 1 << 2;
    }
}

impl PreprocessPipelineKey {
    /// Checks this key names an existing variant.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OcclusionWithoutFrustum`] if occlusion culling
    /// is requested without frustum culling.
    pub fn validate(self) -> ConfigResult<()> {
        if self.contains(Self::OCCLUSION_CULLING) && !self.contains(Self::FRUSTUM_CULLING) {
            return Err(ConfigError::OcclusionWithoutFrustum);
        }
        Ok(())
    }

    /// Frustum culling enabled.
    #[inline]
    #[must_use]
    pub const fn frustum_culling(self) -> bool {
        self.contains(Self::FRUSTUM_CULLING)
    }

    /// Occlusion culling enabled.
    #[inline]
    #[must_use]
    pub const fn occlusion_culling(self) -> bool {
        self.contains(Self::OCCLUSION_CULLING)
    }

    /// Indirect drawing enabled.
    #[inline]
    #[must_use]
    pub const fn indirect_draw(self) -> bool {
        self.contains(Self::INDIRECT_DRAW)
    }

    /// Short variant name for logs.
    #[must_use]
    pub const fn variant_name(self) -> &'static str {
        if self.occlusion_culling() {
            "occlusion"
        } else if self.frustum_culling() {
            "frustum"
        } else {
            "direct"
        }
    }
}
