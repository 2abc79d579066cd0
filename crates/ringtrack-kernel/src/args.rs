//! Kernel argument slots and the values bound to them per launch.

use ringtrack_arena::Arena;
use ringtrack_core::{ConfigError, LocalParticle, ShapeId};

/// Scalar or pointer class of an argument slot in generated source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotType {
    /// Byte buffer in global memory.
    Buffer,
    /// `int64_t` array in global memory.
    I64Array,
    /// The particle batch.
    Particles,
    /// `int` scalar.
    Int,
    /// `int64_t` scalar.
    I64,
}

impl SlotType {
    /// C spelling, with the global-memory marker on pointers.
    pub fn c_type(self) -> &'static str {
        match self {
            Self::Buffer => "/*gpuglmem*/ int8_t*",
            Self::I64Array => "/*gpuglmem*/ int64_t*",
            Self::Particles => "ParticlesData",
            Self::Int => "int",
            Self::I64 => "int64_t",
        }
    }
}

/// A named kernel parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArgSlot {
    /// Parameter name in generated source.
    pub name: &'static str,
    /// Parameter type.
    pub ty: SlotType,
}

/// Ordered parameter list of the `track_line` entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelSignature {
    slots: Vec<ArgSlot>,
}

impl KernelSignature {
    /// The fixed signature of `track_line`.
    pub fn track_line() -> Self {
        let slot = |name, ty| ArgSlot { name, ty };
        Self {
            slots: vec![
                slot("buffer", SlotType::Buffer),
                slot("ele_offsets", SlotType::I64Array),
                slot("ele_typeids", SlotType::I64Array),
                slot("particles", SlotType::Particles),
                slot("num_turns", SlotType::Int),
                slot("ele_start", SlotType::Int),
                slot("num_ele_track", SlotType::Int),
                slot("flag_tbt_monitor", SlotType::Int),
                slot("buffer_tbt_monitor", SlotType::Buffer),
                slot("offset_tbt_monitor", SlotType::I64),
            ],
        }
    }

    /// Slots in parameter order.
    pub fn slots(&self) -> &[ArgSlot] {
        &self.slots
    }

    /// Slot by name.
    pub fn slot(&self, name: &str) -> Option<&ArgSlot> {
        self.slots.iter().find(|s| s.name == name)
    }
}

/// Turn-by-turn record storage handed to a launch.
///
/// Records are particle-major: slot `i` owns
/// `records[i * turns .. (i + 1) * turns]`, so every logical thread writes
/// a disjoint row. When disabled, `records` is an empty placeholder.
#[derive(Debug)]
pub struct MonitorArg<'a> {
    /// Whether the kernel records at all.
    pub enabled: bool,
    /// First recorded turn (inclusive).
    pub start_at_turn: i64,
    /// Last recorded turn (exclusive).
    pub stop_at_turn: i64,
    /// Particle-major record rows.
    pub records: &'a mut [Option<LocalParticle>],
}

impl<'a> MonitorArg<'a> {
    /// Monitoring off; a zero-size placeholder keeps the argument shape.
    pub fn placeholder() -> Self {
        Self {
            enabled: false,
            start_at_turn: 0,
            stop_at_turn: 0,
            records: &mut [],
        }
    }

    /// Monitoring on for `[start_at_turn, stop_at_turn)`.
    pub fn recording(
        start_at_turn: i64,
        stop_at_turn: i64,
        records: &'a mut [Option<LocalParticle>],
    ) -> Self {
        Self {
            enabled: true,
            start_at_turn,
            stop_at_turn,
            records,
        }
    }

    /// Recorded turns per particle.
    pub fn turns(&self) -> usize {
        (self.stop_at_turn - self.start_at_turn).max(0) as usize
    }
}

/// Values bound to the signature slots for one launch.
#[derive(Debug)]
pub struct KernelArgs<'a> {
    /// Arena holding every element.
    pub arena: &'a Arena,
    /// Byte offset of each element.
    pub ele_offsets: &'a [u64],
    /// Type id of each element.
    pub ele_type_ids: &'a [ShapeId],
    /// Particle slots, updated in place.
    pub particles: &'a mut [LocalParticle],
    /// Turns to track.
    pub num_turns: usize,
    /// First element of every turn.
    pub ele_start: usize,
    /// Elements per turn.
    pub num_elements: usize,
    /// Turn-by-turn recording.
    pub monitor: MonitorArg<'a>,
    /// Logical thread count. Slots at or past this index are not tracked.
    pub n_threads: usize,
}

impl KernelArgs<'_> {
    /// Reject tables, ranges and monitor buffers that do not fit together.
    pub fn check(&self) -> Result<(), ConfigError> {
        let table = |reason: String| ConfigError::TableMismatch { reason };
        if self.ele_offsets.len() != self.ele_type_ids.len() {
            return Err(table(format!(
                "{} offsets for {} type ids",
                self.ele_offsets.len(),
                self.ele_type_ids.len()
            )));
        }
        let len = self.ele_offsets.len();
        match self.ele_start.checked_add(self.num_elements) {
            Some(end) if end <= len => {}
            _ => {
                return Err(ConfigError::ElementRange {
                    start: self.ele_start,
                    count: self.num_elements,
                    len,
                })
            }
        }
        if self.monitor.enabled {
            let expected = self.monitor.turns() * self.particles.len();
            if self.monitor.records.len() != expected {
                return Err(ConfigError::InvalidConfig {
                    reason: format!(
                        "monitor holds {} records, expected {expected}",
                        self.monitor.records.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_arena::ArenaConfig;
    use ringtrack_core::ParticleId;

    #[test]
    fn signature_has_named_slots_in_order() {
        let sig = KernelSignature::track_line();
        let names: Vec<_> = sig.slots().iter().map(|s| s.name).collect();
        assert_eq!(names[0], "buffer");
        assert_eq!(names.last(), Some(&"offset_tbt_monitor"));
        assert_eq!(sig.slot("particles").map(|s| s.ty), Some(SlotType::Particles));
    }

    #[test]
    fn check_rejects_range_and_tables() {
        let arena = Arena::new(ArenaConfig::default()).unwrap();
        let mut particles = vec![LocalParticle::on_axis(ParticleId(0), 1.0)];
        let offsets = [0u64, 8];
        let ids = [ShapeId(0)];
        let args = KernelArgs {
            arena: &arena,
            ele_offsets: &offsets,
            ele_type_ids: &ids,
            particles: &mut particles,
            num_turns: 1,
            ele_start: 0,
            num_elements: 1,
            monitor: MonitorArg::placeholder(),
            n_threads: 1,
        };
        assert!(matches!(args.check(), Err(ConfigError::TableMismatch { .. })));
    }

    #[test]
    fn check_rejects_short_monitor() {
        let arena = Arena::new(ArenaConfig::default()).unwrap();
        let mut particles = vec![LocalParticle::on_axis(ParticleId(0), 1.0); 2];
        let mut records = vec![None; 3];
        let args = KernelArgs {
            arena: &arena,
            ele_offsets: &[],
            ele_type_ids: &[],
            particles: &mut particles,
            num_turns: 2,
            ele_start: 0,
            num_elements: 0,
            monitor: MonitorArg::recording(0, 2, &mut records),
            n_threads: 2,
        };
        assert!(matches!(args.check(), Err(ConfigError::InvalidConfig { .. })));
    }
}
