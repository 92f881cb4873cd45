//! # UMBRA Clustered
//!
//! Per-cluster light ranges and the flat light-id list they index, under
//! two storage budgets, plus the fragment → cluster mapping that reads them.
//!
//! ## Encodings
//!
//! ```text
//! Wide   (≥ 3 storage bindings):  offsets[c], counts[c] = point | spot << 16, ids[n]
//! Narrow (fixed arrays):          [[u32; 4]] of offset << 18 | spot << 9 | point,
//!                                 [[u32; 4]] of four 8-bit ids per word
//! ```
//!
//! Both decode to the same [`ClusterableIndices`]. The encoding is chosen
//! once per view ([`ViewClusterBindings::new`]); decoding is monomorphized
//! per encoding ([`ClusterLightIndexResolver`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use umbra_clustered::{StorageBudgetMode, ViewClusterBindings};
//!
//! let mut bindings = ViewClusterBindings::new(StorageBudgetMode::from_storage_bindings(2));
//! bindings.push_cluster(&[0, 3], &[7])?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod locate;
pub mod packing;
pub mod resolver;
pub mod storage;

pub use error::{ClusterError, ClusterResult};
pub use locate::{calculate_cluster_factors, ClusterConfig, ClusterLayout};
pub use resolver::{ClusterLightIndexResolver, ClusterStorageVisitor, ViewClusterBindings};
pub use storage::{
    ClusterIndexStorage, ClusterableIndices, NarrowClusterStorage, StorageBudgetMode,
    WideClusterStorage, WIDE_STORAGE_MIN_BINDINGS,
};
