//! Output slot allocation.
//!
//! ```text
//! Direct:    slot = work_item.output_index
//! Indirect:  slot = batch.first_instance + batch.instance_count.fetch_add(1)
//!            batch = work_item.output_index
//! ```
//!
//! The mode is part of the pipeline configuration, never decided per
//! invocation.

use umbra_core::{IndirectParametersBuffer, RecordBuffer};
use umbra_shared::{OutputMeshRecord, WorkItem};

/// Claims destination slots for visible work items.
#[derive(Debug, Clone, Copy)]
pub enum IndirectSlotAllocator<'a> {
    /// The work item supplies its slot.
    Direct,
    /// Slots are claimed densely from per-batch atomic counters.
    Indirect(&'a IndirectParametersBuffer),
}

impl<'a> IndirectSlotAllocator<'a> {
    /// Returns true for the counter-backed mode.
    #[inline]
    #[must_use]
    pub const fn is_indirect(&self) -> bool {
        matches!(self, Self::Indirect(_))
    }

    /// Claims the slot for `item`. Each call in indirect mode claims a new one.
    ///
    /// # Panics
    ///
    /// Panics in indirect mode if `item.output_index` is not a batch.
    #[inline]
    pub fn claim(&self, item: &WorkItem) -> u32 {
        match self {
            Self::Direct => item.output_index,
            Self::Indirect(parameters) => parameters.claim_slot(item.output_index),
        }
    }
}

/// One output of a dispatch: a record buffer and how slots in it are claimed.
#[derive(Debug, Clone, Copy)]
pub struct OutputTarget<'a> {
    /// Destination records.
    pub records: &'a RecordBuffer<OutputMeshRecord>,
    /// Slot allocation mode.
    pub slots: IndirectSlotAllocator<'a>,
}

impl<'a> OutputTarget<'a> {
    /// Output whose slots come from the work items.
    #[must_use]
    pub const fn direct(records: &'a RecordBuffer<OutputMeshRecord>) -> Self {
        Self {
            records,
            slots: IndirectSlotAllocator::Direct,
        }
    }

    /// Output whose slots are claimed from `parameters`.
    #[must_use]
    pub const fn indirect(
        records: &'a RecordBuffer<OutputMeshRecord>,
        parameters: &'a IndirectParametersBuffer,
    ) -> Self {
        Self {
            records,
            slots: IndirectSlotAllocator::Indirect(parameters),
        }
    }

    /// Claims a slot for `item` and writes `record` there. Returns the slot.
    #[inline]
    pub fn write(&self, item: &WorkItem, record: &OutputMeshRecord) -> u32 {
        let slot = self.slots.claim(item);
        self.records.write(slot, record);
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_shared::DrawIndexedIndirectArgs;

    #[test]
    fn test_direct_uses_output_index() {
        let records = RecordBuffer::new(8).unwrap();
        let target = OutputTarget::direct(&records);

        assert_eq!(target.write(&WorkItem::new(0, 5), &OutputMeshRecord::default()), 5);
        assert_eq!(target.write(&WorkItem::new(1, 5), &OutputMeshRecord::default()), 5);
        assert!(!target.slots.is_indirect());
    }

    #[test]
    fn test_indirect_claims_from_batch() {
        let records = RecordBuffer::new(8).unwrap();
        let parameters = IndirectParametersBuffer::new([
            DrawIndexedIndirectArgs::new(3, 0, 0, 0),
            DrawIndexedIndirectArgs::new(3, 0, 0, 4),
        ]);
        let target = OutputTarget::indirect(&records, &parameters);
        let record = OutputMeshRecord {
            flags: 9,
            ..OutputMeshRecord::default()
        };

        assert_eq!(target.write(&WorkItem::new(0, 1), &record), 4);
        assert_eq!(target.write(&WorkItem::new(1, 1), &record), 5);
        assert_eq!(target.write(&WorkItem::new(2, 0), &record), 0);
        assert_eq!(parameters.instance_count(1), 2);
        assert_eq!(records.read(5).flags, 9);
    }
}
