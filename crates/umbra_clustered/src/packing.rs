//! Bit layouts shared by the writer and the resolver.
//!
//! Narrow offset-and-counts word:
//!
//! ```text
//! [ 31     ..     18 | 17    ..    9 | 8         ..         0 ]
//! [      offset      |  spot count   | point (+ unlit) count  ]
//! ```
//!
//! Narrow light-id list: four 8-bit ids per word, four words per item.
//!
//! ```text
//! id n  →  item n >> 4,  component (n >> 2) & 3,  byte n & 3
//! ```

/// Bits per packed light count.
pub const CLUSTER_COUNT_SIZE: u32 = 9;

/// Mask for the offset field after shifting it down.
pub const CLUSTER_OFFSET_MASK: u32 = (1 << (32 - (CLUSTER_COUNT_SIZE * 2))) - 1;

/// Mask for one count field after shifting it down.
pub const CLUSTER_COUNT_MASK: u32 = (1 << CLUSTER_COUNT_SIZE) - 1;

/// Narrow encoding: maximum clusters (one packed word each).
pub const MAX_OFFSETS: usize = 16384 / 4;

/// Narrow encoding: number of 4-word items in each fixed array.
pub const MAX_UNIFORM_ITEMS: usize = MAX_OFFSETS / 4;

/// Narrow encoding: maximum light ids.
pub const MAX_INDICES: usize = 16384;

/// Narrow encoding: largest representable light id.
pub const MAX_NARROW_LIGHT_ID: u32 = 0xFF;

/// Wide encoding: counts share one word, 16 bits each.
pub const WIDE_COUNT_BITS: u32 = 16;

/// Packs a cluster's light range into one narrow word.
#[inline]
#[must_use]
pub const fn pack_offset_and_counts(offset: u32, point_count: u32, spot_count: u32) -> u32 {
    ((offset & CLUSTER_OFFSET_MASK) << (CLUSTER_COUNT_SIZE * 2))
        | ((spot_count & CLUSTER_COUNT_MASK) << CLUSTER_COUNT_SIZE)
        | (point_count & CLUSTER_COUNT_MASK)
}

/// Unpacks a narrow word into `(offset, point_count, spot_count)`.
#[inline]
#[must_use]
pub const fn unpack_offset_and_counts(packed: u32) -> (u32, u32, u32) {
    (
        (packed >> (CLUSTER_COUNT_SIZE * 2)) & CLUSTER_OFFSET_MASK,
        packed & CLUSTER_COUNT_MASK,
        (packed >> CLUSTER_COUNT_SIZE) & CLUSTER_COUNT_MASK,
    )
}

/// Packs both counts into one wide word: point count low, spot count high.
#[inline]
#[must_use]
pub const fn pack_wide_counts(point_count: u32, spot_count: u32) -> u32 {
    (point_count & 0xFFFF) | (spot_count << WIDE_COUNT_BITS)
}

/// Unpacks a wide counts word into `(point_count, spot_count)`.
#[inline]
#[must_use]
pub const fn unpack_wide_counts(packed: u32) -> (u32, u32) {
    (packed & 0xFFFF, packed >> WIDE_COUNT_BITS)
}

/// Location of narrow element `n` in a `[[u32; 4]]` array: `(item, component)`.
#[inline]
#[must_use]
pub const fn narrow_offset_slot(n: usize) -> (usize, usize) {
    (n >> 2, n & 3)
}

/// Location of narrow light id `n`: `(item, component, byte)`.
#[inline]
#[must_use]
pub const fn narrow_index_slot(n: usize) -> (usize, usize, usize) {
    (n >> 4, (n >> 2) & 3, n & 3)
}
