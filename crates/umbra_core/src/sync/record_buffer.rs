//! Output record buffer stored as atomic 32-bit words.
//!
//! Parallel invocations write whole records into slots they claimed. Each
//! slot has exactly one writer per dispatch, so the words are stored with
//! `Relaxed` ordering; a broken orchestrator contract (two writers on one
//! slot) can tear a record but never corrupt memory.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use bytemuck::Pod;

use crate::error::{CoreError, CoreResult};

/// Bytes per storage word.
const WORD_BYTES: usize = 4;

/// Fixed-capacity buffer of `T` records, writable through `&self`.
pub struct RecordBuffer<T> {
    /// Record words, `capacity * stride` long.
    words: Box<[AtomicU32]>,
    /// Words per record.
    stride: usize,
    /// Record writes since the last clear.
    writes: AtomicU64,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Pod> RecordBuffer<T> {
    /// Creates a zeroed buffer with room for `capacity` records.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedRecordLayout`] if `T` is zero-sized or
    /// not a whole number of 32-bit words.
    pub fn new(capacity: usize) -> CoreResult<Self> {
        let size = std::mem::size_of::<T>();
        if size == 0 || size % WORD_BYTES != 0 {
            return Err(CoreError::UnsupportedRecordLayout { size });
        }
        let stride = size / WORD_BYTES;

        Ok(Self {
            words: (0..capacity * stride).map(|_| AtomicU32::new(0)).collect(),
            stride,
            writes: AtomicU64::new(0),
            _marker: PhantomData,
        })
    }

    /// Record capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.words.len() / self.stride
    }

    /// Writes `record` into `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond the capacity.
    #[inline]
    pub fn write(&self, slot: u32, record: &T) {
        let start = slot as usize * self.stride;
        let dst = &self.words[start..start + self.stride];
        for (word, bytes) in dst
            .iter()
            .zip(bytemuck::bytes_of(record).chunks_exact(WORD_BYTES))
        {
            word.store(
                u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
                Ordering::Relaxed,
            );
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Reads the record in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is beyond the capacity.
    #[must_use]
    pub fn read(&self, slot: u32) -> T {
        let start = slot as usize * self.stride;
        let words: Vec<u32> = self.words[start..start + self.stride]
            .iter()
            .map(|word| word.load(Ordering::Relaxed))
            .collect();
        bytemuck::pod_read_unaligned(bytemuck::cast_slice(&words))
    }

    /// Reads every record.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.capacity())
            .map(|slot| self.read(u32::try_from(slot).unwrap_or(u32::MAX)))
            .collect()
    }

    /// Returns the buffer contents as bytes for upload.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words
            .iter()
            .flat_map(|word| word.load(Ordering::Relaxed).to_ne_bytes())
            .collect()
    }

    /// Number of record writes since the last clear.
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Zeroes every record and the write counter.
    pub fn clear(&mut self) {
        for word in self.words.iter_mut() {
            *word.get_mut() = 0;
        }
        *self.writes.get_mut() = 0;
    }
}

impl<T> std::fmt::Debug for RecordBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordBuffer")
            .field("words", &self.words.len())
            .field("stride", &self.stride)
            .field("writes", &self.writes.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_shared::OutputMeshRecord;

    #[test]
    fn test_write_then_read() {
        let buffer = RecordBuffer::<OutputMeshRecord>::new(4).unwrap();
        let record = OutputMeshRecord {
            local_from_world_transpose_b: 2.5,
            flags: 0xDEAD_BEEF,
            lightmap_uv_rect: [1, 2],
            ..OutputMeshRecord::default()
        };

        buffer.write(2, &record);

        assert_eq!(buffer.read(2), record);
        assert_eq!(buffer.read(1), OutputMeshRecord::default());
        assert_eq!(buffer.write_count(), 1);
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    fn test_rejects_unaligned_layout() {
        assert_eq!(
            RecordBuffer::<[u8; 3]>::new(1).err(),
            Some(CoreError::UnsupportedRecordLayout { size: 3 })
        );
    }

    #[test]
    fn test_byte_aligned_records() {
        let buffer = RecordBuffer::<[u8; 8]>::new(2).unwrap();
        buffer.write(1, &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(buffer.read(1), [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(buffer.to_bytes()[8..], [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_clear() {
        let mut buffer = RecordBuffer::<u32>::new(3).unwrap();
        buffer.write(0, &7);
        buffer.clear();
        assert_eq!(buffer.to_vec(), vec![0, 0, 0]);
        assert_eq!(buffer.write_count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_slot_panics() {
        let buffer = RecordBuffer::<u32>::new(1).unwrap();
        buffer.write(1, &0);
    }
}
