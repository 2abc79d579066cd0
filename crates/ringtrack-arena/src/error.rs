//! Arena-specific error types.

use ringtrack_core::Placement;

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The allocation would grow the arena past its configured ceiling.
    #[error("arena capacity exceeded: requested {requested} bytes, capacity {capacity} bytes")]
    CapacityExceeded {
        /// Number of bytes requested.
        requested: usize,
        /// Configured ceiling in bytes.
        capacity: usize,
    },
    /// An access reaches past the allocated region.
    #[error("out of bounds: offset {offset} + {len} bytes, arena holds {used} bytes")]
    OutOfBounds {
        /// Byte offset of the access.
        offset: u64,
        /// Length of the access in bytes.
        len: usize,
        /// Bytes currently allocated.
        used: usize,
    },
    /// An offset or type that does not respect 8-byte alignment.
    #[error("misaligned access at offset {offset} (alignment {align})")]
    Misaligned {
        /// The offending offset.
        offset: u64,
        /// Required alignment in bytes.
        align: usize,
    },
    /// Host access to an arena that lives on a device.
    #[error("arena is placed on {placement}, not host")]
    NotOnHost {
        /// Current placement.
        placement: Placement,
    },
    /// A record could not be turned back into an arena.
    #[error("invalid arena record: {reason}")]
    InvalidRecord {
        /// What is wrong.
        reason: String,
    },
    /// Configuration failed validation.
    #[error("invalid arena config: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },
}
