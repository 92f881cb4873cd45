//! Fragment → cluster mapping.
//!
//! Clusters tile the viewport in x/y and slice view depth in z. Perspective
//! views slice depth logarithmically (thin slices near the camera);
//! orthographic views slice it linearly.
//!
//! ```text
//! index = ((y * dim_x + x) * dim_z + z_slice), clamped to cluster_count - 1
//! ```

use glam::{UVec2, UVec3, Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::packing::MAX_OFFSETS;
use crate::storage::StorageBudgetMode;

/// Cluster grid configuration, loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Encoding for the cluster light data.
    pub storage_budget_mode: StorageBudgetMode,
    /// Clusters along x, y and z.
    pub dimensions: [u32; 3],
    /// View depth of the first slice boundary.
    pub near: f32,
    /// View depth of the last slice boundary.
    pub far: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            storage_budget_mode: StorageBudgetMode::Wide,
            dimensions: [16, 9, 24],
            near: 5.0,
            far: 1000.0,
        }
    }
}

impl ClusterConfig {
    /// Total cluster count.
    #[must_use]
    pub fn cluster_count(&self) -> u64 {
        self.dimensions.iter().map(|&d| u64::from(d)).product()
    }

    /// Checks the grid is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidConfig`] for an empty grid or a bad
    /// depth range, and [`ClusterError::CapacityExceeded`] if the narrow
    /// encoding cannot hold every cluster.
    pub fn validate(&self) -> ClusterResult<()> {
        if self.dimensions.contains(&0) {
            return Err(ClusterError::InvalidConfig(format!(
                "cluster dimensions {:?} contain zero",
                self.dimensions
            )));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ClusterError::InvalidConfig(format!(
                "cluster depth range {}..{} is not increasing and positive",
                self.near, self.far
            )));
        }
        if self.storage_budget_mode == StorageBudgetMode::Narrow
            && self.cluster_count() > MAX_OFFSETS as u64
        {
            return Err(ClusterError::CapacityExceeded {
                what: "cluster offsets",
                capacity: MAX_OFFSETS,
            });
        }
        Ok(())
    }
}

/// Depth-slice factors for one projection.
///
/// Perspective: `(z_slices - 1) / ln(far / near)` and `ln(near)` times that.
/// Orthographic: `-near` and `z_slices / (near - far)`.
#[must_use]
pub fn calculate_cluster_factors(near: f32, far: f32, z_slices: f32, is_orthographic: bool) -> Vec2 {
    if is_orthographic {
        Vec2::new(-near, z_slices / (-far - -near))
    } else {
        let z_slices_of_ln_zfar_over_znear = (z_slices - 1.0) / (far / near).ln();
        Vec2::new(
            z_slices_of_ln_zfar_over_znear,
            near.ln() * z_slices_of_ln_zfar_over_znear,
        )
    }
}

/// Cluster grid of one view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLayout {
    dimensions: UVec3,
    cluster_count: u32,
    viewport_origin: Vec2,
    xy_factors: Vec2,
    perspective_factors: Vec2,
    orthographic_factors: Vec2,
}

impl ClusterLayout {
    /// Builds the grid for a viewport `(x, y, width, height)` in pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the viewport is empty.
    pub fn new(config: &ClusterConfig, viewport: Vec4) -> ClusterResult<Self> {
        config.validate()?;
        if viewport.z <= 0.0 || viewport.w <= 0.0 {
            return Err(ClusterError::InvalidConfig(format!(
                "viewport {viewport} has zero size"
            )));
        }
        let cluster_count = u32::try_from(config.cluster_count()).map_err(|_| {
            ClusterError::InvalidConfig(format!("{} clusters overflow u32", config.cluster_count()))
        })?;

        let dimensions = UVec3::from_array(config.dimensions);
        #[allow(clippy::cast_precision_loss)] // slice counts are validated far below 2^24
        let z_slices = dimensions.z as f32;
        Ok(Self {
            dimensions,
            cluster_count,
            viewport_origin: Vec2::new(viewport.x, viewport.y),
            xy_factors: dimensions.truncate().as_vec2() / Vec2::new(viewport.z, viewport.w),
            perspective_factors: calculate_cluster_factors(config.near, config.far, z_slices, false),
            orthographic_factors: calculate_cluster_factors(config.near, config.far, z_slices, true),
        })
    }

    /// Clusters along x, y and z.
    #[must_use]
    pub const fn dimensions(&self) -> UVec3 {
        self.dimensions
    }

    /// Total cluster count.
    #[must_use]
    pub const fn cluster_count(&self) -> u32 {
        self.cluster_count
    }

    /// Depth slice of a (negative, right-handed) view-space depth.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // saturating, clamped below
    pub fn view_z_to_z_slice(&self, view_z: f32, is_orthographic: bool) -> u32 {
        let z_slice = if is_orthographic {
            let f = self.orthographic_factors;
            ((view_z - f.x) * f.y).floor() as u32
        } else {
            // -view_z keeps the logarithm's argument positive
            let f = self.perspective_factors;
            ((-view_z).ln() * f.x - f.y + 1.0) as u32
        };
        // The clustering far plane may be closer than the farthest geometry.
        z_slice.min(self.dimensions.z - 1)
    }

    /// Flattened cluster index of a fragment.
    ///
    /// Fragments outside the viewport land in the nearest edge tile.
    #[must_use]
    pub fn locate(&self, fragment_coord: Vec2, view_z: f32, is_orthographic: bool) -> u32 {
        let last_tile = (self.dimensions.truncate() - UVec2::ONE).as_vec2();
        let xy: UVec2 = ((fragment_coord - self.viewport_origin) * self.xy_factors)
            .floor()
            .clamp(Vec2::ZERO, last_tile)
            .as_uvec2();
        let z_slice = self.view_z_to_z_slice(view_z, is_orthographic);

        ((xy.y * self.dimensions.x + xy.x) * self.dimensions.z + z_slice)
            .min(self.cluster_count - 1)
    }
}
