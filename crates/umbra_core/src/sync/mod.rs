//! # Synchronization Primitives for Parallel Dispatch
//!
//! No locks. No race conditions. No compromises.
//!
//! ## The Problem
//!
//! ```text
//! Invocation 0..N (unordered, concurrent):
//!   claim an output slot
//!   write a record
//!   mark the work item visible
//!
//! With Mutex:    LOCK CONTENTION → serialized dispatch
//! With nothing:  DATA RACE → duplicate slots, lost writes
//! ```
//!
//! ## The Solution: Atomic Words
//!
//! ```text
//! slot    = first_instance + instance_count.fetch_add(1)   // unique, dense
//! visible = words[i / 32].fetch_or(1 << (i % 32))          // idempotent
//! record  = words[slot * stride ..].store(..)              // slot owned by claimer
//! ```
//!
//! Cross-frame state (previous inputs) is double buffered and swapped by
//! the orchestrator between frames, never during a dispatch.

mod double_buffer;
mod indirect;
mod record_buffer;
mod visibility;

pub use double_buffer::DoubleBufferedInputs;
pub use indirect::{IndirectParameters, IndirectParametersBuffer};
pub use record_buffer::RecordBuffer;
pub use visibility::VisibilityBitmask;
