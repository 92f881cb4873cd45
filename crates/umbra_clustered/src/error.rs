//! # Cluster Error Types

use thiserror::Error;

/// Errors that can occur while building cluster light data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// A fixed-size narrow buffer is full. The entry was dropped.
    #[error("{what} capacity of {capacity} exceeded")]
    CapacityExceeded {
        /// Which buffer overflowed.
        what: &'static str,
        /// Its capacity.
        capacity: usize,
    },

    /// Light ids in the narrow encoding are 8 bits.
    #[error("light id {0} does not fit in 8 bits")]
    LightIdOverflow(u32),

    /// A light count does not fit its packed field.
    #[error("light count {count} does not fit in {bits} bits")]
    CountOverflow {
        /// Offending count.
        count: u32,
        /// Width of the packed field.
        bits: u32,
    },

    /// A cluster offset does not fit its packed field.
    #[error("cluster offset {0} does not fit in 14 bits")]
    OffsetOverflow(u32),

    /// Invalid cluster configuration.
    #[error("invalid cluster configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;
