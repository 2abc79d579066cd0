//! End-to-end kernel pipeline over the stock elements: synthesis, cache,
//! host execution and emulated device execution.

use std::sync::Arc;

use ringtrack_arena::ArenaConfig;
use ringtrack_core::{
    ApertureCheckPolicy, Backend, CompileError, ConfigError, DeviceTarget, LocalParticle,
};
use ringtrack_element::ElementSequence;
use ringtrack_kernel::{
    synthesize, CompiledKernel, KernelArgs, KernelCache, KernelRequest, LaunchError, MonitorArg,
};
use ringtrack_test_utils::{
    assert_close, fodo_cell, sample_coordinates, track_reference, EmulatedDeviceToolchain,
    ReferenceRun,
};

const ALL_BACKENDS: [Backend; 4] = [
    Backend::CpuSerial,
    Backend::CpuThreaded { threads: 0 },
    Backend::Cuda { device: 0 },
    Backend::OpenCl {
        platform: 0,
        device: 0,
    },
];

fn fodo_sequence() -> ElementSequence {
    let line = fodo_cell();
    ElementSequence::place(&line.refs(), &line.names, ArenaConfig::default()).unwrap()
}

fn request(seq: &ElementSequence, backend: Backend) -> KernelRequest<'_> {
    KernelRequest {
        registry: seq.registry(),
        backend,
        global_xy_limit: 1.0,
        aperture_policy: ApertureCheckPolicy::DriftOnly,
        save_source_as: None,
    }
}

fn run(
    kernel: &CompiledKernel,
    seq: &ElementSequence,
    particles: &mut [LocalParticle],
    turns: usize,
) -> Result<(), LaunchError> {
    let arena = seq.arena().to_placement(kernel.backend().placement());
    let offsets = seq.offsets();
    let ids = seq.type_ids();
    let n = particles.len();
    kernel.launch(KernelArgs {
        arena: &arena,
        ele_offsets: &offsets,
        ele_type_ids: &ids,
        particles,
        num_turns: turns,
        ele_start: 0,
        num_elements: seq.len(),
        monitor: MonitorArg::placeholder(),
        n_threads: n,
    })
}

#[test]
fn every_backend_defines_every_symbol() {
    let seq = fodo_sequence();
    for backend in ALL_BACKENDS {
        let out = synthesize(seq.registry(), backend, 1.0, ApertureCheckPolicy::DriftOnly).unwrap();
        for symbol in out.symbols.all() {
            assert!(out.source.contains(&format!("void {symbol}(")), "{backend}: {symbol}");
        }
        // The shift helper is shared by Drift and XYShift but emitted once.
        assert_eq!(out.source.matches("void LocalParticle_shift_xy(").count(), 1);
        assert!(out.source.contains("MultipoleData_get_bal("));
    }
}

#[test]
fn synthesis_is_byte_identical() {
    let a = fodo_sequence();
    let b = fodo_sequence();
    for backend in ALL_BACKENDS {
        let x = synthesize(a.registry(), backend, 0.5, ApertureCheckPolicy::AllElements).unwrap();
        let y = synthesize(b.registry(), backend, 0.5, ApertureCheckPolicy::AllElements).unwrap();
        assert_eq!(x.source, y.source);
    }
}

#[test]
fn host_kernel_matches_reference_tracker() {
    let line = fodo_cell();
    let seq = fodo_sequence();
    let beam = sample_coordinates(200, 11, 2e-3).to_local(0.999);
    let cache = KernelCache::new();

    for backend in [Backend::CpuSerial, Backend::CpuThreaded { threads: 4 }] {
        let kernel = cache.get_or_build(&request(&seq, backend)).unwrap();
        let mut tracked = beam.clone();
        run(&kernel, &seq, &mut tracked, 20).unwrap();

        let mut expected = beam.clone();
        track_reference(&line.refs(), &mut expected, ReferenceRun::full(line.len()).turns(20));
        for (a, e) in tracked.iter().zip(&expected) {
            assert_close(a, e, 1e-10, 5e-14);
        }
    }
}

#[test]
fn emulated_device_matches_serial() {
    let seq = fodo_sequence();
    let toolchain = Arc::new(EmulatedDeviceToolchain::new());
    let cache = KernelCache::new().with_toolchain(toolchain.clone());
    let beam = sample_coordinates(64, 3, 5e-3).to_local(0.95);

    let serial = cache.get_or_build(&request(&seq, Backend::CpuSerial)).unwrap();
    let mut expected = beam.clone();
    run(&serial, &seq, &mut expected, 5).unwrap();

    for backend in [Backend::Cuda { device: 0 }, Backend::OpenCl { platform: 1, device: 0 }] {
        let kernel = cache.get_or_build(&request(&seq, backend)).unwrap();
        let mut tracked = beam.clone();
        run(&kernel, &seq, &mut tracked, 5).unwrap();
        assert_eq!(tracked, expected, "{backend}");
    }
    assert_eq!(toolchain.compiles(), 2);
}

#[test]
fn device_kernel_refuses_host_arena() {
    let seq = fodo_sequence();
    let cache = KernelCache::new().with_toolchain(Arc::new(EmulatedDeviceToolchain::new()));
    let kernel = cache
        .get_or_build(&request(&seq, Backend::Cuda { device: 2 }))
        .unwrap();
    let offsets = seq.offsets();
    let ids = seq.type_ids();
    let mut particles = sample_coordinates(4, 0, 1e-3).to_local(1.0);
    let err = kernel
        .launch(KernelArgs {
            arena: seq.arena(),
            ele_offsets: &offsets,
            ele_type_ids: &ids,
            particles: &mut particles,
            num_turns: 1,
            ele_start: 0,
            num_elements: seq.len(),
            monitor: MonitorArg::placeholder(),
            n_threads: 4,
        })
        .unwrap_err();
    assert_eq!(
        err,
        LaunchError::Config(ConfigError::BackendMismatch {
            kernel: Backend::Cuda { device: 2 },
            placement: seq.arena().placement(),
        })
    );

    let on_device = seq.arena().to_device(DeviceTarget::Cuda { device: 2 });
    let mut p = particles[0];
    let err = kernel
        .track_element(&on_device, offsets[0], ids[0], &mut p)
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedBackend { .. }));
    assert!(!kernel.symbols().is_exposed("Drift_track_local_particle"));
}

#[test]
fn failing_toolchain_reports_source() {
    let seq = fodo_sequence();
    let toolchain = Arc::new(EmulatedDeviceToolchain::failing("ptxas: out of registers"));
    let cache = KernelCache::new().with_toolchain(toolchain.clone());
    let err = cache
        .get_or_build(&request(&seq, Backend::Cuda { device: 0 }))
        .unwrap_err();
    match &err {
        CompileError::Toolchain { reason, .. } => assert_eq!(reason, "ptxas: out of registers"),
        other => panic!("unexpected error {other:?}"),
    }
    let source = err.generated_source().unwrap();
    assert!(source.contains("void track_line("));
    assert!(source.contains("__global__"));
    assert!(cache.is_empty());

    // Failures are not cached; the next request compiles again.
    let _ = cache.get_or_build(&request(&seq, Backend::Cuda { device: 0 }));
    assert_eq!(toolchain.compiles(), 2);
}

#[test]
fn serial_kernel_exposes_element_entry_points() {
    let seq = fodo_sequence();
    let cache = KernelCache::new();
    let kernel = cache.get_or_build(&request(&seq, Backend::CpuSerial)).unwrap();
    for name in ["Drift", "Multipole", "LimitRect", "SRotation", "XYShift"] {
        assert!(kernel
            .symbols()
            .is_exposed(&format!("{name}_track_local_particle")));
    }
    let threaded = cache
        .get_or_build(&request(&seq, Backend::CpuThreaded { threads: 0 }))
        .unwrap();
    assert_eq!(threaded.symbols().exposed(), ["track_line".to_string()]);
}
