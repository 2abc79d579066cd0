//! Turn-by-turn recording.
//!
//! When a track request asks for it, the kernel snapshots every alive
//! particle at the start of each turn in `[start_at_turn, stop_at_turn)`.
//! Records are stored particle-major so each logical thread writes one
//! contiguous row.

use ringtrack_core::{ConfigError, LocalParticle};
use serde::{Deserialize, Serialize};

/// Which turn-by-turn monitor a track request uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MonitorRequest {
    /// No recording.
    #[default]
    Off,
    /// Record every tracked turn into a fresh monitor returned with the
    /// outcome.
    On,
    /// Record into a caller-supplied monitor. Reserved: requests fail with
    /// [`ConfigError::NotImplemented`](ringtrack_core::ConfigError::NotImplemented).
    External,
}

/// Snapshots indexed by `(turn, particle slot)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnByTurnMonitor {
    start_at_turn: i64,
    stop_at_turn: i64,
    num_particles: usize,
    records: Vec<Option<LocalParticle>>,
}

impl TurnByTurnMonitor {
    /// An empty monitor for `[start_at_turn, stop_at_turn)`, refused when
    /// its records would take more than `max_bytes`.
    pub(crate) fn new(
        start_at_turn: i64,
        stop_at_turn: i64,
        num_particles: usize,
        max_bytes: usize,
    ) -> Result<Self, ConfigError> {
        let turns = stop_at_turn.saturating_sub(start_at_turn).max(0) as usize;
        let too_large = || ConfigError::InvalidConfig {
            reason: format!(
                "turn-by-turn monitor of {turns} turns x {num_particles} particles exceeds {max_bytes} bytes"
            ),
        };
        let slots = turns.checked_mul(num_particles).ok_or_else(too_large)?;
        let bytes = slots
            .checked_mul(std::mem::size_of::<Option<LocalParticle>>())
            .ok_or_else(too_large)?;
        if bytes > max_bytes {
            return Err(too_large());
        }
        Ok(Self {
            start_at_turn,
            stop_at_turn,
            num_particles,
            records: vec![None; slots],
        })
    }

    pub(crate) fn records_mut(&mut self) -> &mut [Option<LocalParticle>] {
        &mut self.records
    }

    /// First recorded turn.
    pub fn start_at_turn(&self) -> i64 {
        self.start_at_turn
    }

    /// One past the last recorded turn.
    pub fn stop_at_turn(&self) -> i64 {
        self.stop_at_turn
    }

    /// Number of turns covered.
    pub fn turns(&self) -> usize {
        (self.stop_at_turn - self.start_at_turn).max(0) as usize
    }

    /// Number of particle slots covered.
    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    /// Snapshot of `slot` at the start of `turn`, if it was alive then.
    pub fn get(&self, turn: i64, slot: usize) -> Option<&LocalParticle> {
        if turn < self.start_at_turn || turn >= self.stop_at_turn || slot >= self.num_particles {
            return None;
        }
        let offset = (turn - self.start_at_turn) as usize;
        self.records[slot * self.turns() + offset].as_ref()
    }

    /// One quantity of `slot` over every covered turn. `None` where the
    /// particle was already lost.
    pub fn series<F>(&self, slot: usize, quantity: F) -> Vec<Option<f64>>
    where
        F: Fn(&LocalParticle) -> f64,
    {
        (self.start_at_turn..self.stop_at_turn)
            .map(|turn| self.get(turn, slot).map(&quantity))
            .collect()
    }

    /// Number of particles recorded at `turn`.
    pub fn alive_at(&self, turn: i64) -> usize {
        (0..self.num_particles)
            .filter(|slot| self.get(turn, *slot).is_some())
            .count()
    }
}
