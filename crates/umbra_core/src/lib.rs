//! # UMBRA Core
//!
//! Lock-free frame state shared by every invocation of a preprocessing dispatch.
//!
//! ## Architecture Rules
//!
//! 1. **Atomics only** - counters are `fetch_add`, visibility is `fetch_or`
//! 2. **Externally owned** - every buffer is created by the orchestrator and
//!    passed into each dispatch explicitly
//! 3. **Word granular** - record buffers are arrays of `AtomicU32`, exactly
//!    like a GPU storage buffer
//!
//! ## Example
//!
//! ```rust,ignore
//! use umbra_core::{IndirectParametersBuffer, VisibilityBitmask};
//!
//! let visibility = VisibilityBitmask::new(work_items.len());
//! let indirect = IndirectParametersBuffer::new([DrawIndexedIndirectArgs::new(36, 0, 0, 0)]);
//! // Each invocation claims a unique slot, no locks
//! let slot = indirect.claim_slot(0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod sync;

pub use error::{CoreError, CoreResult};
pub use sync::{
    DoubleBufferedInputs, IndirectParameters, IndirectParametersBuffer, RecordBuffer,
    VisibilityBitmask,
};
