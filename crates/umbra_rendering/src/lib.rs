//! # UMBRA Rendering
//!
//! The mesh preprocessing stage: per-instance visibility culling and
//! generation of the per-draw records and indirect draw counts the draw
//! stage consumes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ONE FRAME                               │
//! ├──────────────────────────────────────────────────────────────┤
//! │  clear visibility → EARLY PASS (last frame's pyramid)        │
//! │        ↓                         ↓                           │
//! │  draw early records      →  depth → DepthPyramid             │
//! │        ↓                         ↓                           │
//! │  LATE PASS (new pyramid, skips early-visible) → draw late    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every pass is one [`MeshPreprocessor::dispatch`]. The orchestrator owns
//! every buffer and orders the passes; the preprocessor holds no state.
//!
//! ## MANDATE
//!
//! - One invocation per work item, no ordering, no waiting
//! - No locks: slot claims and visibility bits are atomics
//! - Bindings are validated before a dispatch, never inside one

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod culling;
pub mod error;
pub mod indirect;
pub mod preprocess;

pub use config::{PreprocessSettings, UmbraConfig, MAX_WORKGROUP_SIZE};
pub use culling::{CullResult, CullingEngine, DepthPyramid, Frustum, OcclusionCuller, Plane};
pub use error::{ConfigError, ConfigResult, PreprocessError, PreprocessResult};
pub use indirect::{IndirectSlotAllocator, OutputTarget};
pub use preprocess::{
    InvocationOutcome, MeshPreprocessor, PreprocessBindings, PreprocessPipelineKey,
    PreprocessStats, PreprocessView,
};
