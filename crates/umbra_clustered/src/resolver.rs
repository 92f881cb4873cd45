//! Cluster light index resolver.
//!
//! [`ClusterLightIndexResolver`] is generic over its storage, so each
//! encoding gets its own monomorphized decode path. The encoding is picked
//! once, when [`ViewClusterBindings`] is created; readers then run a
//! [`ClusterStorageVisitor`] against the concrete resolver.

use std::ops::Range;

use crate::error::{ClusterError, ClusterResult};
use crate::storage::{
    ClusterIndexStorage, ClusterableIndices, NarrowClusterStorage, StorageBudgetMode,
    WideClusterStorage,
};

/// Decodes per-cluster light ranges and the flat light-id list.
#[derive(Debug, Clone, Default)]
pub struct ClusterLightIndexResolver<S> {
    storage: S,
}

impl<S: ClusterIndexStorage> ClusterLightIndexResolver<S> {
    /// Wraps a storage.
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The underlying storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Consumes the resolver, returning its storage.
    #[must_use]
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Light range of cluster `cluster_index`.
    #[inline]
    #[must_use]
    pub fn decode(&self, cluster_index: u32) -> ClusterableIndices {
        self.storage.offset_and_counts(cluster_index)
    }

    /// Light id at `flat_index` of the flat list.
    #[inline]
    #[must_use]
    pub fn lookup(&self, flat_index: u32) -> u32 {
        self.storage.light_id(flat_index)
    }

    /// Point (and unlit) light ids of a cluster.
    pub fn point_lights(&self, cluster_index: u32) -> impl Iterator<Item = u32> + '_ {
        let range = self.decode(cluster_index);
        self.lookup_range(range.first_point_light_index..range.first_spot_light_index)
    }

    /// Spot light ids of a cluster.
    pub fn spot_lights(&self, cluster_index: u32) -> impl Iterator<Item = u32> + '_ {
        let range = self.decode(cluster_index);
        self.lookup_range(range.first_spot_light_index..range.last_clusterable_index)
    }

    fn lookup_range(&self, range: Range<u32>) -> impl Iterator<Item = u32> + '_ {
        range.map(|flat_index| self.lookup(flat_index))
    }

    /// Appends the next cluster: its range, then its ids (points before spots).
    ///
    /// Returns the range written.
    ///
    /// # Errors
    ///
    /// Propagates the storage's error. The storage may then hold a partial
    /// cluster and should be cleared.
    pub fn push_cluster(
        &mut self,
        point_lights: &[u32],
        spot_lights: &[u32],
    ) -> ClusterResult<ClusterableIndices> {
        let to_u32 = |count: usize| {
            u32::try_from(count).map_err(|_| ClusterError::CountOverflow {
                count: u32::MAX,
                bits: u32::BITS,
            })
        };
        let offset = to_u32(self.storage.n_indices())?;
        let point_count = to_u32(point_lights.len())?;
        let spot_count = to_u32(spot_lights.len())?;

        self.storage
            .push_offset_and_counts(offset, point_count, spot_count)?;
        for &light_id in point_lights.iter().chain(spot_lights) {
            self.storage.push_index(light_id)?;
        }
        Ok(ClusterableIndices::from_offset_and_counts(
            offset,
            point_count,
            spot_count,
        ))
    }

    /// Appends one cluster range without ids.
    ///
    /// # Errors
    ///
    /// Propagates the storage's error; the entry is dropped.
    pub fn push_offset_and_counts(
        &mut self,
        offset: u32,
        point_count: u32,
        spot_count: u32,
    ) -> ClusterResult<()> {
        self.storage
            .push_offset_and_counts(offset, point_count, spot_count)
    }

    /// Appends one light id.
    ///
    /// # Errors
    ///
    /// Propagates the storage's error; the id is dropped.
    pub fn push_index(&mut self, light_id: u32) -> ClusterResult<()> {
        self.storage.push_index(light_id)
    }

    /// Number of clusters written.
    #[must_use]
    pub fn n_offsets(&self) -> usize {
        self.storage.n_offsets()
    }

    /// Number of light ids written.
    #[must_use]
    pub fn n_indices(&self) -> usize {
        self.storage.n_indices()
    }

    /// Drops every cluster and id.
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

/// Work run against whichever encoding a view uses.
pub trait ClusterStorageVisitor {
    /// Visit result.
    type Output;

    /// Runs against the concrete resolver.
    fn visit<S: ClusterIndexStorage>(self, resolver: &ClusterLightIndexResolver<S>) -> Self::Output;
}

/// A view's cluster light data in the encoding its platform affords.
#[derive(Debug, Clone)]
pub enum ViewClusterBindings {
    /// Unbounded arrays.
    Wide(ClusterLightIndexResolver<WideClusterStorage>),
    /// Fixed bit-packed arrays.
    Narrow(ClusterLightIndexResolver<NarrowClusterStorage>),
}

impl ViewClusterBindings {
    /// Creates empty bindings in `mode`.
    #[must_use]
    pub fn new(mode: StorageBudgetMode) -> Self {
        match mode {
            StorageBudgetMode::Wide => Self::Wide(ClusterLightIndexResolver::default()),
            StorageBudgetMode::Narrow => Self::Narrow(ClusterLightIndexResolver::default()),
        }
    }

    /// The encoding in use.
    #[must_use]
    pub const fn mode(&self) -> StorageBudgetMode {
        match self {
            Self::Wide(_) => StorageBudgetMode::Wide,
            Self::Narrow(_) => StorageBudgetMode::Narrow,
        }
    }

    /// Appends the next cluster. See [`ClusterLightIndexResolver::push_cluster`].
    ///
    /// # Errors
    ///
    /// Propagates the storage's error.
    pub fn push_cluster(
        &mut self,
        point_lights: &[u32],
        spot_lights: &[u32],
    ) -> ClusterResult<ClusterableIndices> {
        match self {
            Self::Wide(resolver) => resolver.push_cluster(point_lights, spot_lights),
            Self::Narrow(resolver) => resolver.push_cluster(point_lights, spot_lights),
        }
    }

    /// Appends one cluster range.
    ///
    /// # Errors
    ///
    /// Propagates the storage's error.
    pub fn push_offset_and_counts(
        &mut self,
        offset: u32,
        point_count: u32,
        spot_count: u32,
    ) -> ClusterResult<()> {
        match self {
            Self::Wide(resolver) => resolver.push_offset_and_counts(offset, point_count, spot_count),
            Self::Narrow(resolver) => {
                resolver.push_offset_and_counts(offset, point_count, spot_count)
            }
        }
    }

    /// Appends one light id.
    ///
    /// # Errors
    ///
    /// Propagates the storage's error.
    pub fn push_index(&mut self, light_id: u32) -> ClusterResult<()> {
        match self {
            Self::Wide(resolver) => resolver.push_index(light_id),
            Self::Narrow(resolver) => resolver.push_index(light_id),
        }
    }

    /// Number of light ids written.
    #[must_use]
    pub fn n_indices(&self) -> usize {
        match self {
            Self::Wide(resolver) => resolver.n_indices(),
            Self::Narrow(resolver) => resolver.n_indices(),
        }
    }

    /// Drops every cluster and id.
    pub fn clear(&mut self) {
        match self {
            Self::Wide(resolver) => resolver.clear(),
            Self::Narrow(resolver) => resolver.clear(),
        }
    }

    /// Runs `visitor` against the concrete resolver.
    pub fn visit<V: ClusterStorageVisitor>(&self, visitor: V) -> V::Output {
        match self {
            Self::Wide(resolver) => visitor.visit(resolver),
            Self::Narrow(resolver) => visitor.visit(resolver),
        }
    }
}
