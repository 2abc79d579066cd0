//! Property tests: results do not depend on how particles map to threads,
//! and lost particles stay frozen.

use proptest::prelude::*;
use ringtrack_arena::ArenaConfig;
use ringtrack_core::{ApertureCheckPolicy, Backend, LocalParticle};
use ringtrack_element::ElementSequence;
use ringtrack_kernel::{KernelArgs, KernelCache, KernelRequest, MonitorArg};
use ringtrack_test_utils::{fodo_cell, sample_coordinates};

fn track(backend: Backend, particles: &mut [LocalParticle], turns: usize) {
    let line = fodo_cell();
    let seq = ElementSequence::place(&line.refs(), &line.names, ArenaConfig::default()).unwrap();
    let kernel = KernelCache::global()
        .get_or_build(&KernelRequest {
            registry: seq.registry(),
            backend,
            global_xy_limit: 0.01,
            aperture_policy: ApertureCheckPolicy::AllElements,
            save_source_as: None,
        })
        .unwrap();
    let offsets = seq.offsets();
    let ids = seq.type_ids();
    let n = particles.len();
    kernel
        .launch(KernelArgs {
            arena: seq.arena(),
            ele_offsets: &offsets,
            ele_type_ids: &ids,
            particles,
            num_turns: turns,
            ele_start: 0,
            num_elements: seq.len(),
            monitor: MonitorArg::placeholder(),
            n_threads: n,
        })
        .unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn thread_mapping_does_not_change_results(
        seed in any::<u64>(),
        n in 1usize..96,
        threads in 0usize..6,
        turns in 1usize..8,
    ) {
        let beam = sample_coordinates(n, seed, 1.5e-2).to_local(0.9);
        let mut serial = beam.clone();
        let mut threaded = beam;
        track(Backend::CpuSerial, &mut serial, turns);
        track(Backend::CpuThreaded { threads }, &mut threaded, turns);
        prop_assert_eq!(serial, threaded);
    }

    #[test]
    fn lost_particles_are_frozen(seed in any::<u64>(), turns in 1usize..6) {
        let mut beam = sample_coordinates(48, seed, 2e-2).to_local(0.9);
        track(Backend::CpuSerial, &mut beam, turns);
        let lost: Vec<_> = beam.iter().copied().filter(|p| !p.is_alive()).collect();
        let mut again = lost.clone();
        track(Backend::CpuSerial, &mut again, turns);
        prop_assert_eq!(lost, again);
    }
}
