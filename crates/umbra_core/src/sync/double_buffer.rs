//! # Double-Buffered Instance Inputs
//!
//! The current frame's input array and the previous frame's, kept side by
//! side so motion vectors can be built from `previous_input_index`.
//!
//! ## Architecture
//!
//! ```text
//!        ┌───────────────────────────────┐
//!        │     DoubleBufferedInputs      │
//!        │                               │
//!        │  ┌──────────┐  ┌──────────┐   │
//!        │  │ Inputs A │  │ Inputs B │   │
//!        │  └────┬─────┘  └────┬─────┘   │
//!        │       │             │         │
//!        │  ┌────┴─────────────┴─────┐   │
//!        │  │   Current Index (0/1)  │   │
//!        │  └────────────────────────┘   │
//!        └───────────────────────────────┘
//!                       │
//!            ┌──────────┴──────────┐
//!            ▼                     ▼
//!     ┌─────────────┐       ┌─────────────┐
//!     │  current()  │       │ previous()  │
//!     │ (this frame)│       │ (last frame)│
//!     └─────────────┘       └─────────────┘
//! ```
//!
//! Both halves are read-only while a dispatch runs. `swap_buffers` takes
//! `&mut self`, so the borrow checker rules out swapping mid-dispatch.

/// Two input arrays with a swap at frame end.
#[derive(Debug, Clone)]
pub struct DoubleBufferedInputs<T> {
    /// The two input buffers.
    buffers: [Vec<T>; 2],
    /// Index of the current buffer (0 or 1). Previous is `current ^ 1`.
    current: usize,
    /// Number of swaps performed.
    frame_count: u64,
}

impl<T> Default for DoubleBufferedInputs<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DoubleBufferedInputs<T> {
    /// Creates two empty buffers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffers: [Vec::new(), Vec::new()],
            current: 0,
            frame_count: 0,
        }
    }

    /// Creates two empty buffers with room for `capacity` inputs each.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffers: [Vec::with_capacity(capacity), Vec::with_capacity(capacity)],
            current: 0,
            frame_count: 0,
        }
    }

    /// This frame's inputs.
    #[inline]
    #[must_use]
    pub fn current(&self) -> &[T] {
        &self.buffers[self.current]
    }

    /// Last frame's inputs.
    #[inline]
    #[must_use]
    pub fn previous(&self) -> &[T] {
        &self.buffers[self.current ^ 1]
    }

    /// Mutable access to this frame's inputs.
    #[inline]
    pub fn current_mut(&mut self) -> &mut Vec<T> {
        &mut self.buffers[self.current]
    }

    /// Appends an input to this frame and returns its index.
    ///
    /// # Panics
    ///
    /// Panics if the buffer already holds `u32::MAX` inputs.
    pub fn push(&mut self, input: T) -> u32 {
        let buffer = &mut self.buffers[self.current];
        let index = u32::try_from(buffer.len()).unwrap_or_else(|_| panic!("input index overflow"));
        assert!(index != u32::MAX, "input index collides with the sentinel");
        buffer.push(input);
        index
    }

    /// Ends the frame: this frame's inputs become the previous inputs and
    /// the new current buffer is cleared.
    pub fn swap_buffers(&mut self) {
        self.current ^= 1;
        self.buffers[self.current].clear();
        self.frame_count += 1;
    }

    /// Number of swaps performed.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
