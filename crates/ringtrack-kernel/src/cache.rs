//! Process-wide compiled-kernel cache.
//!
//! [`KernelCache::get_or_build`] returns the existing kernel for a
//! [`KernelKey`] or synthesizes, compiles and stores a new one. Hits take
//! a shared read lock only. Misses serialize on a build mutex and look the
//! key up again after acquiring it, so concurrent callers racing on the
//! same key compile it once.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use ringtrack_core::CompileError;

use crate::compiled::{Artifact, CompiledKernel, KernelKey, KernelRequest};
use crate::device::{DeviceCompileRequest, DeviceToolchain};
use crate::dispatch::DispatchTable;
use crate::host::HostProgram;
use crate::synth::{synthesize, Synthesized, TRACK_LINE};

/// Counters since the cache was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the cache.
    pub hits: u64,
    /// Requests that found no kernel.
    pub misses: u64,
    /// Kernels successfully compiled and stored.
    pub compilations: u64,
}

/// How [`KernelCache::fetch`] satisfied a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The kernel was already cached.
    Hit,
    /// The kernel was synthesized and compiled by this call.
    Compiled,
}

/// Compiled kernels keyed by [`KernelKey`].
#[derive(Debug, Default)]
pub struct KernelCache {
    kernels: RwLock<IndexMap<KernelKey, Arc<CompiledKernel>>>,
    build_lock: Mutex<()>,
    toolchains: RwLock<Vec<Arc<dyn DeviceToolchain>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    compilations: AtomicU64,
}

impl KernelCache {
    /// An empty cache with no device toolchains.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> &'static KernelCache {
        static GLOBAL: OnceLock<KernelCache> = OnceLock::new();
        GLOBAL.get_or_init(KernelCache::new)
    }

    /// Builder-style [`register_toolchain`](Self::register_toolchain).
    pub fn with_toolchain(self, toolchain: Arc<dyn DeviceToolchain>) -> Self {
        self.register_toolchain(toolchain);
        self
    }

    /// Make a device toolchain available for later compilations. The most
    /// recently registered toolchain supporting a backend wins.
    pub fn register_toolchain(&self, toolchain: Arc<dyn DeviceToolchain>) {
        log::debug!("registered device toolchain {}", toolchain.name());
        self.toolchains.write().push(toolchain);
    }

    /// Return the cached kernel for `request`, compiling it on a miss.
    pub fn get_or_build(&self, request: &KernelRequest<'_>) -> Result<Arc<CompiledKernel>, CompileError> {
        self.fetch(request).map(|(kernel, _)| kernel)
    }

    /// [`get_or_build`](Self::get_or_build), also reporting whether this
    /// call compiled the kernel.
    pub fn fetch(
        &self,
        request: &KernelRequest<'_>,
    ) -> Result<(Arc<CompiledKernel>, CacheOutcome), CompileError> {
        let key = request.key();
        if let Some(kernel) = self.lookup(&key) {
            return Ok((kernel, CacheOutcome::Hit));
        }

        let _guard = self.build_lock.lock();
        if let Some(kernel) = self.lookup(&key) {
            return Ok((kernel, CacheOutcome::Hit));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        log::debug!("kernel cache miss: {key}");

        let started = Instant::now();
        let kernel = Arc::new(self.build(request, key.clone())?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        log::info!(
            "compiled {} for {key} in {:.1} ms",
            kernel.id(),
            started.elapsed().as_secs_f64() * 1e3
        );
        self.kernels.write().insert(key, Arc::clone(&kernel));
        Ok((kernel, CacheOutcome::Compiled))
    }

    fn lookup(&self, key: &KernelKey) -> Option<Arc<CompiledKernel>> {
        let kernel = self.kernels.read().get(key).cloned()?;
        self.hits.fetch_add(1, Ordering::Relaxed);
        log::debug!("kernel cache hit: {} for {key}", kernel.id());
        Some(kernel)
    }

    fn build(&self, request: &KernelRequest<'_>, key: KernelKey) -> Result<CompiledKernel, CompileError> {
        let Synthesized {
            source,
            symbols,
            ir,
            signature,
        } = synthesize(
            request.registry,
            request.backend,
            request.global_xy_limit,
            request.aperture_policy,
        )?;
        if let Some(path) = request.save_source_as {
            persist_source(path, &source)?;
        }

        let backend = request.backend;
        let artifact = if backend.is_host() {
            Artifact::Host(HostProgram::new(ir, backend, request.global_xy_limit)?)
        } else {
            let toolchain = self
                .toolchains
                .read()
                .iter()
                .rev()
                .find(|t| t.supports(&backend))
                .cloned()
                .ok_or(CompileError::ToolchainUnavailable { backend })?;
            let dispatch = DispatchTable::from_ir(&ir)?;
            let module = toolchain
                .compile(&DeviceCompileRequest {
                    backend,
                    source: &source,
                    entry_point: TRACK_LINE,
                    signature: &signature,
                    ir: &ir,
                    dispatch: &dispatch,
                    global_xy_limit: request.global_xy_limit,
                })
                .map_err(|reason| {
                    log::warn!("{} rejected kernel for {key}: {reason}", toolchain.name());
                    CompileError::Toolchain {
                        backend,
                        reason,
                        generated: Arc::clone(&source),
                    }
                })?;
            Artifact::Device(module)
        };
        Ok(CompiledKernel::new(key, source, symbols, signature, artifact))
    }

    /// Counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            compilations: self.compilations.load(Ordering::Relaxed),
        }
    }

    /// Whether a kernel for `key` is cached.
    pub fn contains(&self, key: &KernelKey) -> bool {
        self.kernels.read().contains_key(key)
    }

    /// Number of cached kernels.
    pub fn len(&self) -> usize {
        self.kernels.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.kernels.read().is_empty()
    }

    /// Drop every cached kernel. Outstanding `Arc`s stay valid.
    pub fn clear(&self) {
        self.kernels.write().clear();
    }
}

fn persist_source(path: &Path, source: &str) -> Result<(), CompileError> {
    std::fs::write(path, source).map_err(|e| CompileError::PersistSource {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    log::debug!("saved kernel source to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_core::{ApertureCheckPolicy, Backend, LocalParticle};
    use ringtrack_element::{ElementView, Shape, ShapeKind, ShapeRegistry};

    fn noop(_: &ElementView<'_>, _: &mut LocalParticle) {}

    static GAP: Shape = Shape {
        name: "Gap",
        fields: &["length"],
        kind: ShapeKind::Drift,
        track: noop,
        source: "/*gpufun*/\nvoid Gap_track_local_particle(GapData el, LocalParticle* part){}\n",
        fragments: &[],
    };
    static KICK: Shape = Shape {
        name: "Kick",
        fields: &["k"],
        kind: ShapeKind::Kick,
        track: noop,
        source: "/*gpufun*/\nvoid Kick_track_local_particle(KickData el, LocalParticle* part){}\n",
        fragments: &[],
    };

    fn request(registry: &ShapeRegistry, backend: Backend) -> KernelRequest<'_> {
        KernelRequest {
            registry,
            backend,
            global_xy_limit: 1.0,
            aperture_policy: ApertureCheckPolicy::DriftOnly,
            save_source_as: None,
        }
    }

    fn registry(shapes: &[&'static Shape]) -> ShapeRegistry {
        let mut reg = ShapeRegistry::new();
        for s in shapes {
            reg.register(*s).unwrap();
        }
        reg
    }

    #[test]
    fn hit_returns_same_kernel() {
        let cache = KernelCache::new();
        let reg = registry(&[&GAP]);
        let a = cache.get_or_build(&request(&reg, Backend::CpuSerial)).unwrap();
        let b = cache.get_or_build(&request(&reg, Backend::CpuSerial)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.id(), b.id());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                compilations: 1
            }
        );
    }

    #[test]
    fn fetch_reports_outcome() {
        let cache = KernelCache::new();
        let reg = registry(&[&KICK]);
        let (_, first) = cache.fetch(&request(&reg, Backend::CpuSerial)).unwrap();
        let (_, second) = cache.fetch(&request(&reg, Backend::CpuSerial)).unwrap();
        assert_eq!(first, CacheOutcome::Compiled);
        assert_eq!(second, CacheOutcome::Hit);
    }

    #[test]
    fn new_shape_compiles_once_more() {
        let cache = KernelCache::new();
        let one = registry(&[&GAP]);
        let two = registry(&[&GAP, &KICK]);
        let a = cache.get_or_build(&request(&one, Backend::CpuSerial)).unwrap();
        let b = cache.get_or_build(&request(&two, Backend::CpuSerial)).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(cache.stats().compilations, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn key_distinguishes_backend_limit_and_policy() {
        let reg = registry(&[&GAP]);
        let base = request(&reg, Backend::CpuSerial);
        let threaded = request(&reg, Backend::CpuThreaded { threads: 0 });
        let wider = KernelRequest {
            global_xy_limit: 2.0,
            ..base
        };
        let never = KernelRequest {
            aperture_policy: ApertureCheckPolicy::Never,
            ..base
        };
        assert_ne!(base.key(), threaded.key());
        assert_ne!(base.key(), wider.key());
        assert_ne!(base.key(), never.key());
        assert_eq!(base.key(), request(&reg, Backend::CpuSerial).key());
    }

    #[test]
    fn device_without_toolchain_fails() {
        let cache = KernelCache::new();
        let reg = registry(&[&GAP]);
        let err = cache
            .get_or_build(&request(&reg, Backend::Cuda { device: 0 }))
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::ToolchainUnavailable {
                backend: Backend::Cuda { device: 0 }
            }
        );
        assert!(cache.is_empty());
        assert_eq!(cache.stats().compilations, 0);
    }

    #[test]
    fn concurrent_misses_compile_once() {
        let cache = KernelCache::new();
        let reg = registry(&[&GAP, &KICK]);
        let ids: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        cache
                            .get_or_build(&request(&reg, Backend::CpuSerial))
                            .unwrap()
                            .id()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(cache.stats().compilations, 1);
    }

    #[test]
    fn source_is_saved_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kernel.c");
        let cache = KernelCache::new();
        let reg = registry(&[&GAP]);
        let kernel = cache
            .get_or_build(&KernelRequest {
                save_source_as: Some(path.as_path()),
                ..request(&reg, Backend::CpuSerial)
            })
            .unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved, kernel.source());
    }
}
