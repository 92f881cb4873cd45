//! Indirect draw parameters with embedded atomic instance counters.
//!
//! One record per batch. The preprocessing stage bumps `instance_count`;
//! the draw call reads the final value once the dispatch completes.

use std::sync::atomic::{AtomicU32, Ordering};

use umbra_shared::DrawIndexedIndirectArgs;

use crate::error::{CoreError, CoreResult};

/// One batch's draw parameters. Only `instance_count` is mutable during a dispatch.
#[derive(Debug)]
pub struct IndirectParameters {
    /// Indices per instance.
    pub index_count: u32,
    /// First index.
    pub first_index: u32,
    /// Base vertex.
    pub base_vertex: i32,
    /// Base slot of this batch in the output buffer.
    pub first_instance: u32,
    /// Number of instances claimed so far.
    instance_count: AtomicU32,
}

impl IndirectParameters {
    /// Creates a batch record, seeding the counter from `args.instance_count`.
    #[must_use]
    pub fn new(args: DrawIndexedIndirectArgs) -> Self {
        Self {
            index_count: args.index_count,
            first_index: args.first_index,
            base_vertex: args.base_vertex,
            first_instance: args.first_instance,
            instance_count: AtomicU32::new(args.instance_count),
        }
    }

    /// Claims the next slot: `first_instance + instance_count++`.
    #[inline]
    pub fn claim_slot(&self) -> u32 {
        self.first_instance + self.instance_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Current instance count.
    #[inline]
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instance_count.load(Ordering::Relaxed)
    }

    /// Plain copy for the draw call.
    #[must_use]
    pub fn snapshot(&self) -> DrawIndexedIndirectArgs {
        DrawIndexedIndirectArgs {
            index_count: self.index_count,
            instance_count: self.instance_count(),
            first_index: self.first_index,
            base_vertex: self.base_vertex,
            first_instance: self.first_instance,
        }
    }
}

/// All batches for one pass output (main pass or prepass).
#[derive(Debug, Default)]
pub struct IndirectParametersBuffer {
    /// One record per batch.
    batches: Vec<IndirectParameters>,
}

impl IndirectParametersBuffer {
    /// Creates a buffer from per-batch arguments.
    pub fn new(args: impl IntoIterator<Item = DrawIndexedIndirectArgs>) -> Self {
        Self {
            batches: args.into_iter().map(IndirectParameters::new).collect(),
        }
    }

    /// Number of batches.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Returns true if there are no batches.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Returns batch `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: u32) -> Option<&IndirectParameters> {
        self.batches.get(index as usize)
    }

    /// Claims a unique slot in batch `batch`.
    ///
    /// # Panics
    ///
    /// Panics if `batch` does not exist.
    #[inline]
    pub fn claim_slot(&self, batch: u32) -> u32 {
        self.batches[batch as usize].claim_slot()
    }

    /// Current instance count of batch `batch`.
    ///
    /// # Panics
    ///
    /// Panics if `batch` does not exist.
    #[must_use]
    pub fn instance_count(&self, batch: u32) -> u32 {
        self.batches[batch as usize].instance_count()
    }

    /// Sum of instance counts over every batch.
    #[must_use]
    pub fn total_instances(&self) -> u32 {
        self.batches.iter().map(IndirectParameters::instance_count).sum()
    }

    /// Zeroes every counter. Called by the orchestrator between dispatches.
    pub fn reset_instance_counts(&mut self) {
        for batch in &mut self.batches {
            *batch.instance_count.get_mut() = 0;
        }
    }

    /// Seeds every counter, e.g. with the instance counts already written by an earlier pass.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BatchCountMismatch`] if `counts` does not have one
    /// entry per batch.
    pub fn seed_instance_counts(&mut self, counts: &[u32]) -> CoreResult<()> {
        if counts.len() != self.batches.len() {
            return Err(CoreError::BatchCountMismatch {
                expected: self.batches.len(),
                actual: counts.len(),
            });
        }
        for (batch, &count) in self.batches.iter_mut().zip(counts) {
            *batch.instance_count.get_mut() = count;
        }
        Ok(())
    }

    /// Copies every batch out as plain draw arguments.
    #[must_use]
    pub fn readback(&self) -> Vec<DrawIndexedIndirectArgs> {
        self.batches.iter().map(IndirectParameters::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_are_dense_from_base() {
        let buffer = IndirectParametersBuffer::new([
            DrawIndexedIndirectArgs::new(36, 0, 0, 0),
            DrawIndexedIndirectArgs::new(6, 36, 0, 100),
        ]);

        assert_eq!(buffer.claim_slot(1), 100);
        assert_eq!(buffer.claim_slot(1), 101);
        assert_eq!(buffer.claim_slot(0), 0);
        assert_eq!(buffer.instance_count(1), 2);
        assert_eq!(buffer.total_instances(), 3);
    }

    #[test]
    fn test_readback_and_reset() {
        let mut buffer = IndirectParametersBuffer::new([DrawIndexedIndirectArgs::new(6, 0, -4, 8)]);
        buffer.claim_slot(0);

        let args = buffer.readback();
        assert_eq!(args[0].instance_count, 1);
        assert_eq!(args[0].base_vertex, -4);
        assert_eq!(args[0].first_instance, 8);

        buffer.reset_instance_counts();
        assert_eq!(buffer.instance_count(0), 0);
    }

    #[test]
    fn test_seed_rejects_wrong_length() {
        let mut buffer = IndirectParametersBuffer::new([DrawIndexedIndirectArgs::default(); 2]);

        assert_eq!(
            buffer.seed_instance_counts(&[1]),
            Err(CoreError::BatchCountMismatch { expected: 2, actual: 1 })
        );
        assert!(buffer.seed_instance_counts(&[3, 4]).is_ok());
        assert_eq!(buffer.claim_slot(1), 4);
    }
}
