//! Cluster index storage: two encodings of the same data.
//!
//! ```text
//!                ┌──────────────────────┐
//!                │ ClusterIndexStorage  │
//!                └──────────┬───────────┘
//!             ┌─────────────┴─────────────┐
//!             ▼                           ▼
//!   WideClusterStorage          NarrowClusterStorage
//!   (≥ 3 storage bindings)      (fixed-size arrays)
//!   offsets: Vec<u32>           offsets_and_counts: [[u32; 4]; 1024]
//!   counts:  Vec<u32>           light_ids:          [[u32; 4]; 1024]
//!   ids:     Vec<u32>
//! ```
//!
//! Writers push one offset-and-counts entry per cluster (in cluster order)
//! and light ids in flat-list order. Readers decode them back.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ClusterError, ClusterResult};
use crate::packing::{
    narrow_index_slot, narrow_offset_slot, pack_offset_and_counts, pack_wide_counts,
    unpack_offset_and_counts, unpack_wide_counts, CLUSTER_COUNT_MASK, CLUSTER_COUNT_SIZE,
    CLUSTER_OFFSET_MASK, MAX_INDICES, MAX_NARROW_LIGHT_ID, MAX_OFFSETS, MAX_UNIFORM_ITEMS,
    WIDE_COUNT_BITS,
};

/// Storage bindings required for the wide encoding.
pub const WIDE_STORAGE_MIN_BINDINGS: u32 = 3;

/// Which cluster encoding a platform can afford.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBudgetMode {
    /// Unbounded flat arrays.
    #[default]
    Wide,
    /// Fixed-size bit-packed arrays.
    Narrow,
}

impl StorageBudgetMode {
    /// Picks the encoding from the number of storage buffer bindings available.
    #[must_use]
    pub const fn from_storage_bindings(available: u32) -> Self {
        if available >= WIDE_STORAGE_MIN_BINDINGS {
            Self::Wide
        } else {
            Self::Narrow
        }
    }
}

/// Light index range of one cluster into the flat light-id list.
///
/// `first_point_light_index ≤ first_spot_light_index ≤ last_clusterable_index`;
/// points occupy `[first_point, first_spot)`, spots `[first_spot, last)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterableIndices {
    /// Start of the point (and unlit) lights.
    pub first_point_light_index: u32,
    /// Start of the spot lights.
    pub first_spot_light_index: u32,
    /// One past the last light.
    pub last_clusterable_index: u32,
}

impl ClusterableIndices {
    /// Builds the range from an offset and the two counts.
    #[inline]
    #[must_use]
    pub const fn from_offset_and_counts(offset: u32, point_count: u32, spot_count: u32) -> Self {
        let first_spot_light_index = offset + point_count;
        Self {
            first_point_light_index: offset,
            first_spot_light_index,
            last_clusterable_index: first_spot_light_index + spot_count,
        }
    }

    /// Number of point lights.
    #[must_use]
    pub const fn point_count(&self) -> u32 {
        self.first_spot_light_index - self.first_point_light_index
    }

    /// Number of spot lights.
    #[must_use]
    pub const fn spot_count(&self) -> u32 {
        self.last_clusterable_index - self.first_spot_light_index
    }
}

/// One cluster light encoding.
pub trait ClusterIndexStorage {
    /// The encoding this storage implements.
    const MODE: StorageBudgetMode;

    /// Appends the next cluster's range.
    ///
    /// # Errors
    ///
    /// Returns an error, and drops the entry, if the encoding cannot hold it.
    fn push_offset_and_counts(&mut self, offset: u32, point_count: u32, spot_count: u32)
        -> ClusterResult<()>;

    /// Appends the next light id to the flat list.
    ///
    /// # Errors
    ///
    /// Returns an error, and drops the id, if the encoding cannot hold it.
    fn push_index(&mut self, light_id: u32) -> ClusterResult<()>;

    /// Decodes the range of cluster `cluster_index`.
    fn offset_and_counts(&self, cluster_index: u32) -> ClusterableIndices;

    /// Reads light id `flat_index` of the flat list.
    fn light_id(&self, flat_index: u32) -> u32;

    /// Number of clusters pushed.
    fn n_offsets(&self) -> usize;

    /// Number of light ids pushed.
    fn n_indices(&self) -> usize;

    /// Drops every entry.
    fn clear(&mut self);
}

/// Unbounded encoding: separate offsets, counts and ids arrays.
#[derive(Debug, Clone, Default)]
pub struct WideClusterStorage {
    offsets: Vec<u32>,
    counts: Vec<u32>,
    light_ids: Vec<u32>,
}

impl WideClusterStorage {
    /// Creates empty storage.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            offsets: Vec::new(),
            counts: Vec::new(),
            light_ids: Vec::new(),
        }
    }

    /// Raw offsets array.
    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Raw counts array.
    #[must_use]
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Raw light-id list.
    #[must_use]
    pub fn light_ids(&self) -> &[u32] {
        &self.light_ids
    }
}

impl ClusterIndexStorage for WideClusterStorage {
    const MODE: StorageBudgetMode = StorageBudgetMode::Wide;

    fn push_offset_and_counts(
        &mut self,
        offset: u32,
        point_count: u32,
        spot_count: u32,
    ) -> ClusterResult<()> {
        for count in [point_count, spot_count] {
            if count >> WIDE_COUNT_BITS != 0 {
                return Err(ClusterError::CountOverflow {
                    count,
                    bits: WIDE_COUNT_BITS,
                });
            }
        }
        self.offsets.push(offset);
        self.counts.push(pack_wide_counts(point_count, spot_count));
        Ok(())
    }

    fn push_index(&mut self, light_id: u32) -> ClusterResult<()> {
        self.light_ids.push(light_id);
        Ok(())
    }

    #[inline]
    fn offset_and_counts(&self, cluster_index: u32) -> ClusterableIndices {
        let i = cluster_index as usize;
        let (point_count, spot_count) = unpack_wide_counts(self.counts[i]);
        ClusterableIndices::from_offset_and_counts(self.offsets[i], point_count, spot_count)
    }

    #[inline]
    fn light_id(&self, flat_index: u32) -> u32 {
        self.light_ids[flat_index as usize]
    }

    fn n_offsets(&self) -> usize {
        self.offsets.len()
    }

    fn n_indices(&self) -> usize {
        self.light_ids.len()
    }

    fn clear(&mut self) {
        self.offsets.clear();
        self.counts.clear();
        self.light_ids.clear();
    }
}

/// Fixed-size encoding for platforms with few storage bindings.
#[derive(Debug, Clone)]
pub struct NarrowClusterStorage {
    offsets_and_counts: Box<[[u32; 4]]>,
    light_ids: Box<[[u32; 4]]>,
    n_offsets: usize,
    n_indices: usize,
}

impl Default for NarrowClusterStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrowClusterStorage {
    /// Creates zeroed storage at full capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offsets_and_counts: vec![[0; 4]; MAX_UNIFORM_ITEMS].into_boxed_slice(),
            light_ids: vec![[0; 4]; MAX_UNIFORM_ITEMS].into_boxed_slice(),
            n_offsets: 0,
            n_indices: 0,
        }
    }

    /// Raw packed offset-and-counts array.
    #[must_use]
    pub fn offsets_and_counts(&self) -> &[[u32; 4]] {
        &self.offsets_and_counts
    }

    /// Raw packed light-id array.
    #[must_use]
    pub fn light_ids(&self) -> &[[u32; 4]] {
        &self.light_ids
    }
}

impl ClusterIndexStorage for NarrowClusterStorage {
    const MODE: StorageBudgetMode = StorageBudgetMode::Narrow;

    fn push_offset_and_counts(
        &mut self,
        offset: u32,
        point_count: u32,
        spot_count: u32,
    ) -> ClusterResult<()> {
        if self.n_offsets >= MAX_OFFSETS {
            warn!(capacity = MAX_OFFSETS, "cluster offset and count out of bounds");
            return Err(ClusterError::CapacityExceeded {
                what: "cluster offsets",
                capacity: MAX_OFFSETS,
            });
        }
        if offset > CLUSTER_OFFSET_MASK {
            return Err(ClusterError::OffsetOverflow(offset));
        }
        for count in [point_count, spot_count] {
            if count > CLUSTER_COUNT_MASK {
                return Err(ClusterError::CountOverflow {
                    count,
                    bits: CLUSTER_COUNT_SIZE,
                });
            }
        }

        let (item, component) = narrow_offset_slot(self.n_offsets);
        self.offsets_and_counts[item][component] =
            pack_offset_and_counts(offset, point_count, spot_count);
        self.n_offsets += 1;
        Ok(())
    }

    fn push_index(&mut self, light_id: u32) -> ClusterResult<()> {
        if self.n_indices >= MAX_INDICES {
            warn!(capacity = MAX_INDICES, "cluster light index out of bounds");
            return Err(ClusterError::CapacityExceeded {
                what: "cluster light indices",
                capacity: MAX_INDICES,
            });
        }
        if light_id > MAX_NARROW_LIGHT_ID {
            return Err(ClusterError::LightIdOverflow(light_id));
        }

        let (item, component, byte) = narrow_index_slot(self.n_indices);
        self.light_ids[item][component] |= light_id << (8 * byte);
        self.n_indices += 1;
        Ok(())
    }

    #[inline]
    fn offset_and_counts(&self, cluster_index: u32) -> ClusterableIndices {
        let (item, component) = narrow_offset_slot(cluster_index as usize);
        let (offset, point_count, spot_count) =
            unpack_offset_and_counts(self.offsets_and_counts[item][component]);
        ClusterableIndices::from_offset_and_counts(offset, point_count, spot_count)
    }

    #[inline]
    fn light_id(&self, flat_index: u32) -> u32 {
        let (item, component, byte) = narrow_index_slot(flat_index as usize);
        (self.light_ids[item][component] >> (8 * byte)) & MAX_NARROW_LIGHT_ID
    }

    fn n_offsets(&self) -> usize {
        self.n_offsets
    }

    fn n_indices(&self) -> usize {
        self.n_indices
    }

    fn clear(&mut self) {
        self.offsets_and_counts.fill([0; 4]);
        self.light_ids.fill([0; 4]);
        self.n_offsets = 0;
        self.n_indices = 0;
    }
}
