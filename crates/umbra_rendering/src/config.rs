//! # Pipeline Configuration
//!
//! Loaded once at startup from TOML:
//!
//! ```toml
//! [preprocess]
//! frustum_culling = true
//! occlusion_culling = true
//! indirect_draw = true
//! workgroup_size = 64
//!
//! [clusters]
//! storage_budget_mode = "narrow"
//! dimensions = [16, 9, 24]
//! near = 5.0
//! far = 1000.0
//! ```
//!
//! Missing keys take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use umbra_clustered::ClusterConfig;
use umbra_shared::WORKGROUP_SIZE;

use crate::error::{ConfigError, ConfigResult};
use crate::preprocess::PreprocessPipelineKey;

/// Largest accepted `workgroup_size`, the WebGPU per-workgroup invocation limit.
pub const MAX_WORKGROUP_SIZE: u32 = 1024;

/// `[preprocess]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessSettings {
    /// Test instance bounds against the view frustum.
    pub frustum_culling: bool,
    /// Test instance bounds against the depth pyramid and write the prepass output.
    pub occlusion_culling: bool,
    /// Claim slots from atomic counters instead of using `output_index`.
    pub indirect_draw: bool,
    /// Invocations per workgroup.
    pub workgroup_size: u32,
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            frustum_culling: true,
            occlusion_culling: false,
            indirect_draw: true,
            workgroup_size: WORKGROUP_SIZE,
        }
    }
}

impl PreprocessSettings {
    /// Pipeline variant selected by these settings.
    #[must_use]
    pub fn pipeline_key(&self) -> PreprocessPipelineKey {
        let mut key = PreprocessPipelineKey::empty();
        key.set(PreprocessPipelineKey::FRUSTUM_CULLING, self.frustum_culling);
        key.set(PreprocessPipelineKey::OCCLUSION_CULLING, self.occlusion_culling);
        key.set(PreprocessPipelineKey::INDIRECT_DRAW, self.indirect_draw);
        key
    }

    /// Checks the settings describe a pipeline variant that exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWorkgroupSize`] or
    /// [`ConfigError::OcclusionWithoutFrustum`].
    pub fn validate(&self) -> ConfigResult<()> {
        if !(1..=MAX_WORKGROUP_SIZE).contains(&self.workgroup_size) {
            return Err(ConfigError::InvalidWorkgroupSize(self.workgroup_size));
        }
        self.pipeline_key().validate()
    }
}

/// Complete configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UmbraConfig {
    /// `[preprocess]` section.
    pub preprocess: PreprocessSettings,
    /// `[clusters]` section.
    pub clusters: ClusterConfig,
}

impl UmbraConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML, or a validation error.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`UmbraConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.preprocess.validate()?;
        self.clusters.validate()?;
        Ok(())
    }
}
