//! Structured records for saving and restoring an arena.

use ringtrack_core::Placement;
use serde::{Deserialize, Serialize};

use crate::buffer::Arena;
use crate::config::ArenaConfig;
use crate::error::ArenaError;

/// Serializable image of an arena's allocated region.
///
/// Stores the backing words rather than bytes so the image survives
/// formats without a byte-string type (JSON) at no loss of precision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArenaRecord {
    /// Placement at the time of capture.
    pub placement: Placement,
    /// Allocated bytes; a multiple of 8.
    pub used_bytes: usize,
    /// Allocated region as 64-bit words.
    pub words: Vec<u64>,
    /// Capacity configuration.
    pub config: ArenaConfig,
}

impl ArenaRecord {
    /// Capture an arena.
    pub fn capture(arena: &Arena) -> Self {
        Self {
            placement: arena.placement(),
            used_bytes: arena.used_bytes(),
            words: arena.words().to_vec(),
            config: arena.config().clone(),
        }
    }

    /// Rebuild an arena. Offsets recorded against the original stay valid.
    pub fn restore(self) -> Result<Arena, ArenaError> {
        self.config
            .validate()
            .map_err(|reason| ArenaError::InvalidConfig { reason })?;
        if self.used_bytes % ArenaConfig::ALIGNMENT != 0 {
            return Err(ArenaError::InvalidRecord {
                reason: format!("used_bytes {} is not a multiple of 8", self.used_bytes),
            });
        }
        if self.words.len() * ArenaConfig::ALIGNMENT != self.used_bytes {
            return Err(ArenaError::InvalidRecord {
                reason: format!(
                    "{} words do not cover {} used bytes",
                    self.words.len(),
                    self.used_bytes
                ),
            });
        }
        if self.used_bytes > self.config.max_capacity {
            return Err(ArenaError::CapacityExceeded {
                requested: self.used_bytes,
                capacity: self.config.max_capacity,
            });
        }
        Ok(Arena::from_parts(
            self.words,
            self.used_bytes,
            self.placement,
            self.config,
        ))
    }
}
