//! Persistent per-frame visibility bits.
//!
//! One bit per work item. The orchestrator clears it at frame start; the
//! early pass sets bits for everything it drew; the late pass skips those
//! bits so nothing is drawn twice.

use std::sync::atomic::{AtomicU32, Ordering};

/// Bits per storage word.
const BITS_PER_WORD: u32 = 32;

/// Lock-free visibility bitmask.
///
/// Bits are only ever set during a dispatch. Two invocations racing on the
/// same bit write the same value, so `Relaxed` ordering is sufficient; the
/// dispatch boundary provides the happens-before edge for later passes.
pub struct VisibilityBitmask {
    /// Packed bits, `len.div_ceil(32)` words.
    words: Box<[AtomicU32]>,
    /// Number of addressable bits.
    len: usize,
}

impl VisibilityBitmask {
    /// Creates a cleared bitmask with `len` bits.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            words: Self::alloc_words(len),
            len,
        }
    }

    fn alloc_words(len: usize) -> Box<[AtomicU32]> {
        (0..len.div_ceil(BITS_PER_WORD as usize))
            .map(|_| AtomicU32::new(0))
            .collect()
    }

    /// Number of addressable bits.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the mask addresses no bits.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns whether bit `index` is set.
    ///
    /// # Panics
    ///
    /// Panics if `index` is beyond the mask.
    #[inline]
    #[must_use]
    pub fn is_visible(&self, index: u32) -> bool {
        let bit = 1u32 << (index % BITS_PER_WORD);
        self.words[(index / BITS_PER_WORD) as usize].load(Ordering::Relaxed) & bit != 0
    }

    /// Sets bit `index`. Returns true if this call flipped it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is beyond the mask.
    #[inline]
    pub fn mark_visible(&self, index: u32) -> bool {
        let bit = 1u32 << (index % BITS_PER_WORD);
        self.words[(index / BITS_PER_WORD) as usize].fetch_or(bit, Ordering::Relaxed) & bit == 0
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_visible(&self) -> u32 {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed).count_ones())
            .sum()
    }

    /// Clears every bit. Called by the orchestrator at frame start.
    pub fn clear(&mut self) {
        for word in self.words.iter_mut() {
            *word.get_mut() = 0;
        }
    }

    /// Resizes to `len` bits and clears. Used when the work list grows.
    pub fn reset(&mut self, len: usize) {
        if len.div_ceil(BITS_PER_WORD as usize) == self.words.len() {
            self.clear();
        } else {
            self.words = Self::alloc_words(len);
        }
        self.len = len;
    }

    /// Returns the raw words for upload.
    #[must_use]
    pub fn to_words(&self) -> Vec<u32> {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed))
            .collect()
    }
}

impl std::fmt::Debug for VisibilityBitmask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibilityBitmask")
            .field("len", &self.len)
            .field("visible", &self.count_visible())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_idempotent() {
        let mask = VisibilityBitmask::new(100);

        assert!(!mask.is_visible(42));
        assert!(mask.mark_visible(42));
        assert!(!mask.mark_visible(42));
        assert!(mask.is_visible(42));
        assert_eq!(mask.count_visible(), 1);
    }

    #[test]
    fn test_word_boundaries() {
        let mask = VisibilityBitmask::new(65);
        mask.mark_visible(31);
        mask.mark_visible(32);
        mask.mark_visible(64);

        assert_eq!(mask.to_words(), vec![1 << 31, 1, 1]);
        assert!(!mask.is_visible(33));
    }

    #[test]
    fn test_clear_and_reset() {
        let mut mask = VisibilityBitmask::new(40);
        mask.mark_visible(3);
        mask.clear();
        assert_eq!(mask.count_visible(), 0);

        mask.mark_visible(39);
        mask.reset(200);
        assert_eq!(mask.len(), 200);
        assert_eq!(mask.count_visible(), 0);
        assert!(mask.mark_visible(199));
    }
}
