//! Host execution of the kernel IR.
//!
//! A [`HostProgram`] is what host backends "compile" to: the kernel IR
//! plus a pre-resolved [`DispatchTable`]. Each particle slot is one
//! logical thread walking the IR; the serial backend visits slots in
//! order, the threaded backend hands them to a rayon pool. Slots share
//! nothing but the read-only arena, so both produce identical results.

use std::fmt;

use rayon::prelude::*;
use ringtrack_arena::Arena;
use ringtrack_core::{Backend, CompileError, ConfigError, LocalParticle, ShapeId};

use crate::args::{KernelArgs, MonitorArg};
use crate::dispatch::DispatchTable;
use crate::ir::{Instr, KernelIr};

/// How logical threads map onto host threads.
enum Threading {
    Serial,
    GlobalPool,
    Pool(rayon::ThreadPool),
}

impl fmt::Debug for Threading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::GlobalPool => write!(f, "GlobalPool"),
            Self::Pool(pool) => write!(f, "Pool({})", pool.current_num_threads()),
        }
    }
}

/// Read-only launch context shared by every logical thread.
struct Shared<'a> {
    arena: &'a Arena,
    offsets: &'a [u64],
    type_ids: &'a [ShapeId],
    num_turns: usize,
    ele_start: usize,
    num_elements: usize,
    n_part: usize,
    monitor_enabled: bool,
    start_at_turn: i64,
    stop_at_turn: i64,
}

/// Mutable state of one logical thread.
struct Thread<'a> {
    part_id: usize,
    slot: &'a mut LocalParticle,
    row: &'a mut [Option<LocalParticle>],
    lpart: LocalParticle,
    iturn: usize,
    ee: usize,
}

/// Host-executable kernel.
#[derive(Debug)]
pub struct HostProgram {
    ir: KernelIr,
    table: DispatchTable,
    global_xy_limit: f64,
    threading: Threading,
}

impl HostProgram {
    /// Build a program for a host backend.
    ///
    /// `CpuThreaded { threads: n }` with `n > 0` gets a dedicated pool of
    /// `n` workers; `n == 0` uses the global rayon pool. Device backends
    /// execute through this type only when a toolchain emulates them, and
    /// then run serially.
    pub fn new(ir: KernelIr, backend: Backend, global_xy_limit: f64) -> Result<Self, CompileError> {
        ir.validate()?;
        let table = DispatchTable::from_ir(&ir)?;
        let threading = match backend {
            Backend::CpuThreaded { threads: 0 } => Threading::GlobalPool,
            Backend::CpuThreaded { threads } => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("ringtrack-worker-{i}"))
                    .build()
                    .map_err(|e| CompileError::Toolchain {
                        backend,
                        reason: format!("thread pool: {e}"),
                        generated: "".into(),
                    })?;
                Threading::Pool(pool)
            }
            _ => Threading::Serial,
        };
        Ok(Self {
            ir,
            table,
            global_xy_limit,
            threading,
        })
    }

    /// The dispatch table.
    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Run the kernel. `args` must already have passed
    /// [`KernelArgs::check`]; element tables are validated here against
    /// the dispatch table before any particle is touched.
    pub fn launch(&self, args: KernelArgs<'_>) -> Result<(), ConfigError> {
        self.table.validate_tables(
            args.arena,
            args.ele_offsets,
            args.ele_type_ids,
            args.ele_start,
            args.num_elements,
        )?;
        let KernelArgs {
            arena,
            ele_offsets,
            ele_type_ids,
            particles,
            num_turns,
            ele_start,
            num_elements,
            monitor,
            n_threads,
        } = args;
        let MonitorArg {
            enabled,
            start_at_turn,
            stop_at_turn,
            records,
        } = monitor;
        let turns = (stop_at_turn - start_at_turn).max(0) as usize;
        let shared = Shared {
            arena,
            offsets: ele_offsets,
            type_ids: ele_type_ids,
            num_turns,
            ele_start,
            num_elements,
            n_part: particles.len(),
            monitor_enabled: enabled && turns > 0,
            start_at_turn,
            stop_at_turn,
        };
        let n = n_threads.min(particles.len());
        let slots = &mut particles[..n];

        if shared.monitor_enabled {
            let rows = &mut records[..n * turns];
            match &self.threading {
                Threading::Serial => slots
                    .iter_mut()
                    .zip(rows.chunks_mut(turns))
                    .enumerate()
                    .for_each(|(i, (slot, row))| self.run_thread(&shared, i, slot, row)),
                Threading::GlobalPool => self.par_with_rows(&shared, slots, rows, turns),
                Threading::Pool(pool) => {
                    pool.install(|| self.par_with_rows(&shared, slots, rows, turns))
                }
            }
        } else {
            match &self.threading {
                Threading::Serial => slots
                    .iter_mut()
                    .enumerate()
                    .for_each(|(i, slot)| self.run_thread(&shared, i, slot, &mut [])),
                Threading::GlobalPool => self.par(&shared, slots),
                Threading::Pool(pool) => pool.install(|| self.par(&shared, slots)),
            }
        }
        Ok(())
    }

    fn par(&self, shared: &Shared<'_>, slots: &mut [LocalParticle]) {
        slots
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, slot)| self.run_thread(shared, i, slot, &mut []));
    }

    fn par_with_rows(
        &self,
        shared: &Shared<'_>,
        slots: &mut [LocalParticle],
        rows: &mut [Option<LocalParticle>],
        turns: usize,
    ) {
        slots
            .par_iter_mut()
            .zip(rows.par_chunks_mut(turns))
            .enumerate()
            .for_each(|(i, (slot, row))| self.run_thread(shared, i, slot, row));
    }

    fn run_thread(
        &self,
        shared: &Shared<'_>,
        part_id: usize,
        slot: &mut LocalParticle,
        row: &mut [Option<LocalParticle>],
    ) {
        let lpart = *slot;
        let mut t = Thread {
            part_id,
            slot,
            row,
            lpart,
            iturn: 0,
            ee: 0,
        };
        self.exec(self.ir.body(), shared, &mut t);
    }

    fn exec(&self, instrs: &[Instr], s: &Shared<'_>, t: &mut Thread<'_>) {
        for instr in instrs {
            match instr {
                // The slot index was assigned when the thread was spawned.
                Instr::ThreadPrologue => {}
                Instr::GuardParticleRange(body) => {
                    if t.part_id < s.n_part {
                        self.exec(body, s, t);
                    }
                }
                Instr::LoadParticle => t.lpart = *t.slot,
                Instr::TurnLoop(body) => {
                    for iturn in 0..s.num_turns {
                        t.iturn = iturn;
                        self.exec(body, s, t);
                    }
                }
                Instr::IfAlive(body) => {
                    if t.lpart.is_alive() {
                        self.exec(body, s, t);
                    }
                }
                Instr::SetTurn => t.lpart.at_turn = t.iturn as i64,
                Instr::RecordMonitor => {
                    if s.monitor_enabled {
                        let turn = t.lpart.at_turn;
                        if turn >= s.start_at_turn && turn < s.stop_at_turn {
                            t.row[(turn - s.start_at_turn) as usize] = Some(t.lpart);
                        }
                    }
                }
                Instr::ElementLoop(body) => {
                    for ee in s.ele_start..s.ele_start + s.num_elements {
                        t.ee = ee;
                        self.exec(body, s, t);
                    }
                }
                Instr::SetElement => t.lpart.at_element = t.ee as i64,
                Instr::Dispatch(_) => self.table.apply(
                    s.arena,
                    s.offsets[t.ee],
                    s.type_ids[t.ee],
                    self.global_xy_limit,
                    &mut t.lpart,
                ),
                Instr::StoreParticle => *t.slot = t.lpart,
            }
        }
    }

    /// Track one particle through one element, bypassing the turn and
    /// element loops. Used for single-element replay.
    pub fn track_element(
        &self,
        arena: &Arena,
        offset: u64,
        type_id: ShapeId,
        particle: &mut LocalParticle,
    ) -> Result<(), ConfigError> {
        self.table
            .validate_tables(arena, &[offset], &[type_id], 0, 1)?;
        if particle.is_alive() {
            self.table
                .apply(arena, offset, type_id, self.global_xy_limit, particle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_arena::ArenaConfig;
    use ringtrack_core::{ApertureCheckPolicy, LossCode, ParticleId};
    use ringtrack_element::{ElementView, Shape, ShapeKind, ShapeRegistry};

    fn gap(el: &ElementView<'_>, p: &mut LocalParticle) {
        p.x += p.px * el.field(0);
        p.add_to_s(el.field(0));
    }

    fn wall(el: &ElementView<'_>, p: &mut LocalParticle) {
        if p.x > el.field(0) {
            p.mark_lost(LossCode::Aperture);
        }
    }

    static GAP: Shape = Shape {
        name: "Gap",
        fields: &["length"],
        kind: ShapeKind::Drift,
        track: gap,
        source: "",
        fragments: &[],
    };
    static WALL: Shape = Shape {
        name: "Wall",
        fields: &["x_max"],
        kind: ShapeKind::Aperture,
        track: wall,
        source: "",
        fragments: &[],
    };

    struct Fixture {
        arena: Arena,
        offsets: Vec<u64>,
        ids: Vec<ShapeId>,
        registry: ShapeRegistry,
    }

    /// gap(5) | wall(x_max) | gap(5)
    fn fixture(x_max: f64) -> Fixture {
        let mut registry = ShapeRegistry::new();
        let g = registry.register(&GAP).unwrap();
        let w = registry.register(&WALL).unwrap();
        let mut arena = Arena::new(ArenaConfig::default()).unwrap();
        let offsets = vec![
            arena.place_f64s(&[5.0]).unwrap().offset(),
            arena.place_f64s(&[x_max]).unwrap().offset(),
            arena.place_f64s(&[5.0]).unwrap().offset(),
        ];
        Fixture {
            arena,
            offsets,
            ids: vec![g, w, g],
            registry,
        }
    }

    fn beam(n: usize, px: f64) -> Vec<LocalParticle> {
        (0..n)
            .map(|i| {
                let mut p = LocalParticle::on_axis(ParticleId(i as u64), 1.0);
                p.px = px * i as f64;
                p
            })
            .collect()
    }

    fn run(backend: Backend, fx: &Fixture, particles: &mut [LocalParticle], turns: usize) {
        let ir = KernelIr::track_line(&fx.registry, ApertureCheckPolicy::DriftOnly);
        let program = HostProgram::new(ir, backend, 100.0).unwrap();
        let n = particles.len();
        program
            .launch(KernelArgs {
                arena: &fx.arena,
                ele_offsets: &fx.offsets,
                ele_type_ids: &fx.ids,
                particles,
                num_turns: turns,
                ele_start: 0,
                num_elements: 3,
                monitor: MonitorArg::placeholder(),
                n_threads: n,
            })
            .unwrap();
    }

    #[test]
    fn s_stops_at_loss() {
        let fx = fixture(0.5);
        let mut particles = beam(2, 0.2);
        run(Backend::CpuSerial, &fx, &mut particles, 1);
        // Particle 0 stays on axis; particle 1 reaches x = 1.0 after the
        // first gap and is stopped by the wall.
        assert_eq!(particles[0].s, 10.0);
        assert!(particles[0].is_alive());
        assert_eq!(particles[1].s, 5.0);
        assert!(!particles[1].is_alive());
        assert_eq!(particles[1].at_element, 1);
    }

    #[test]
    fn turns_update_bookkeeping() {
        let fx = fixture(1e9);
        let mut particles = beam(1, 0.0);
        run(Backend::CpuSerial, &fx, &mut particles, 4);
        assert_eq!(particles[0].at_turn, 3);
        assert_eq!(particles[0].at_element, 2);
        assert_eq!(particles[0].s, 40.0);
    }

    #[test]
    fn threaded_matches_serial() {
        let fx = fixture(3.0);
        let mut serial = beam(64, 0.01);
        let mut threaded = serial.clone();
        let mut pooled = serial.clone();
        run(Backend::CpuSerial, &fx, &mut serial, 3);
        run(Backend::CpuThreaded { threads: 0 }, &fx, &mut threaded, 3);
        run(Backend::CpuThreaded { threads: 3 }, &fx, &mut pooled, 3);
        assert_eq!(serial, threaded);
        assert_eq!(serial, pooled);
    }

    #[test]
    fn slots_past_thread_count_are_untouched() {
        let fx = fixture(1e9);
        let mut particles = beam(3, 0.0);
        let ir = KernelIr::track_line(&fx.registry, ApertureCheckPolicy::DriftOnly);
        let program = HostProgram::new(ir, Backend::CpuSerial, 1.0).unwrap();
        program
            .launch(KernelArgs {
                arena: &fx.arena,
                ele_offsets: &fx.offsets,
                ele_type_ids: &fx.ids,
                particles: &mut particles,
                num_turns: 1,
                ele_start: 0,
                num_elements: 3,
                monitor: MonitorArg::placeholder(),
                n_threads: 2,
            })
            .unwrap();
        assert_eq!(particles[1].s, 10.0);
        assert_eq!(particles[2].s, 0.0);
    }

    #[test]
    fn monitor_records_alive_turn_starts() {
        let fx = fixture(0.5);
        let mut particles = beam(2, 0.2);
        let ir = KernelIr::track_line(&fx.registry, ApertureCheckPolicy::DriftOnly);
        let program = HostProgram::new(ir, Backend::CpuThreaded { threads: 2 }, 100.0).unwrap();
        let mut records = vec![None; 2 * 3];
        program
            .launch(KernelArgs {
                arena: &fx.arena,
                ele_offsets: &fx.offsets,
                ele_type_ids: &fx.ids,
                particles: &mut particles,
                num_turns: 3,
                ele_start: 0,
                num_elements: 3,
                monitor: MonitorArg::recording(0, 3, &mut records),
                n_threads: 2,
            })
            .unwrap();
        // Particle 0 never leaves the axis: three records.
        assert!(records[..3].iter().all(Option::is_some));
        // Particle 1 is lost in turn 0: only the turn-0 record exists.
        assert!(records[3].is_some());
        assert!(records[4..].iter().all(Option::is_none));
        assert_eq!(records[3].map(|p| p.s), Some(0.0));
    }

    #[test]
    fn track_element_applies_one_element() {
        let fx = fixture(0.5);
        let ir = KernelIr::track_line(&fx.registry, ApertureCheckPolicy::DriftOnly);
        let program = HostProgram::new(ir, Backend::CpuSerial, 100.0).unwrap();
        let mut p = LocalParticle::on_axis(ParticleId(0), 1.0);
        program
            .track_element(&fx.arena, fx.offsets[0], fx.ids[0], &mut p)
            .unwrap();
        assert_eq!(p.s, 5.0);
        assert!(program
            .track_element(&fx.arena, 4096, fx.ids[0], &mut p)
            .is_err());
    }
}
