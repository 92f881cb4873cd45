//! # Preprocessing Error Types
//!
//! Every error here is raised before a dispatch starts. The per-invocation
//! path never fails: out-of-contract input is rejected up front or not at all.

use std::path::PathBuf;

use glam::UVec2;
use thiserror::Error;
use umbra_clustered::ClusterError;

/// Errors that can occur while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {}: {source}", path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Workgroup size outside `1..=MAX_WORKGROUP_SIZE`.
    #[error("workgroup size {0} outside 1..={max}", max = crate::config::MAX_WORKGROUP_SIZE)]
    InvalidWorkgroupSize(u32),

    /// Occlusion culling runs only after a frustum test.
    #[error("occlusion culling requires frustum culling")]
    OcclusionWithoutFrustum,

    /// Invalid cluster section.
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while validating dispatch bindings.
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// Invocation indices are 32-bit.
    #[error("{0} work items exceed the u32 invocation range")]
    TooManyWorkItems(usize),

    /// Culling data must be index-aligned with the current inputs.
    #[error("culling data has {culling} entries for {inputs} inputs")]
    CullingDataMismatch {
        /// Number of current inputs.
        inputs: usize,
        /// Number of culling records.
        culling: usize,
    },

    /// A work item references an input that does not exist.
    #[error("work item {work_item} reads input {input_index}, only {inputs} inputs bound")]
    InputIndexOutOfRange {
        /// Work item position.
        work_item: usize,
        /// Referenced input.
        input_index: u32,
        /// Number of current inputs.
        inputs: usize,
    },

    /// An input's history index points past last frame's inputs.
    #[error("input {input} has previous index {previous_index}, only {previous} previous inputs bound")]
    PreviousIndexOutOfRange {
        /// Input position.
        input: usize,
        /// Referenced previous input.
        previous_index: u32,
        /// Number of previous inputs.
        previous: usize,
    },

    /// Frustum culling is enabled but no view is bound.
    #[error("frustum culling enabled without a view")]
    MissingView,

    /// Occlusion culling is enabled but no depth pyramid is bound.
    #[error("occlusion culling enabled without a depth pyramid")]
    MissingDepthPyramid,

    /// Occlusion culling is enabled but no visibility bitmask is bound.
    #[error("occlusion culling enabled without a visibility bitmask")]
    MissingVisibilityBitmask,

    /// Occlusion culling is enabled but no prepass output is bound.
    #[error("occlusion culling enabled without a prepass output")]
    MissingPrepassTarget,

    /// The visibility bitmask cannot address every work item.
    #[error("visibility bitmask holds {actual} bits, {required} work items")]
    VisibilityBitmaskTooSmall {
        /// Number of work items.
        required: usize,
        /// Bits in the mask.
        actual: usize,
    },

    /// The output buffer cannot hold every slot this dispatch may write.
    #[error("output buffer holds {capacity} records, dispatch needs {required}")]
    OutputTooSmall {
        /// Required capacity.
        required: usize,
        /// Actual capacity.
        capacity: usize,
    },

    /// Indirect drawing is enabled but an output uses direct slots.
    #[error("indirect draw enabled without indirect parameters")]
    MissingIndirectParameters,

    /// Direct drawing is enabled but an output claims slots from counters.
    #[error("direct draw enabled with indirect parameters bound")]
    UnexpectedIndirectParameters,

    /// A work item names a batch that does not exist.
    #[error("work item {work_item} targets batch {batch}, only {batches} batches bound")]
    BatchOutOfRange {
        /// Work item position.
        work_item: usize,
        /// Referenced batch.
        batch: u32,
        /// Number of batches.
        batches: usize,
    },

    /// The depth pyramid was built for a different view size.
    #[error("depth pyramid built for {pyramid}, view is {view}")]
    PyramidSizeMismatch {
        /// Pyramid source size.
        pyramid: UVec2,
        /// View size.
        view: UVec2,
    },

    /// A depth buffer does not match its declared size.
    #[error("depth buffer has {actual} texels, expected {expected}")]
    DepthBufferSizeMismatch {
        /// `width * height`.
        expected: usize,
        /// Supplied texels.
        actual: usize,
    },

    /// A zero-sized view cannot produce a depth pyramid.
    #[error("view has zero size")]
    EmptyView,

    /// Invalid pipeline configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for preprocessing operations.
pub type PreprocessResult<T> = Result<T, PreprocessError>;
