//! Arena configuration parameters.

use serde::{Deserialize, Serialize};

/// Configuration for the arena allocator.
///
/// Validated at construction; all values are immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Bytes reserved up front. Rounded up to a multiple of 8.
    ///
    /// Default: 64 KiB.
    pub initial_capacity: usize,

    /// Hard ceiling in bytes. Allocations past it fail with
    /// [`ArenaError::CapacityExceeded`](crate::ArenaError::CapacityExceeded).
    ///
    /// Default: 1 GiB.
    pub max_capacity: usize,
}

impl ArenaConfig {
    /// Default initial reservation: 64 KiB.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 64 * 1024;

    /// Default ceiling: 1 GiB.
    pub const DEFAULT_MAX_CAPACITY: usize = 1 << 30;

    /// Alignment of every allocation, in bytes.
    pub const ALIGNMENT: usize = 8;

    /// Create a config with the given ceiling and the default reservation.
    pub fn with_max_capacity(max_capacity: usize) -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY.min(max_capacity),
            max_capacity,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_capacity == 0 {
            return Err("max_capacity must be at least 1 byte".to_string());
        }
        if self.initial_capacity > self.max_capacity {
            return Err(format!(
                "initial_capacity ({}) exceeds max_capacity ({})",
                self.initial_capacity, self.max_capacity
            ));
        }
        Ok(())
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            max_capacity: Self::DEFAULT_MAX_CAPACITY,
        }
    }
}
