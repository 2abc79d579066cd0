//! Compiled kernel handles and their cache keys.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use ringtrack_arena::Arena;
use ringtrack_core::{ApertureCheckPolicy, Backend, ConfigError, KernelId, LocalParticle, ShapeId};
use ringtrack_element::{ShapeKey, ShapeRegistry};

use crate::args::{KernelArgs, KernelSignature};
use crate::device::DeviceModule;
use crate::error::LaunchError;
use crate::host::HostProgram;
use crate::synth::SymbolTable;

/// Cache identity of a compiled kernel.
///
/// Two requests share a kernel exactly when they present the same shapes
/// (name and field layout) in the same type-id order, for the same
/// backend, global aperture limit and aperture policy.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KernelKey {
    shapes: Vec<ShapeKey>,
    backend: Backend,
    global_xy_limit_bits: u64,
    aperture_policy: ApertureCheckPolicy,
}

impl KernelKey {
    /// Key for the shapes of `registry`.
    pub fn new(
        registry: &ShapeRegistry,
        backend: Backend,
        global_xy_limit: f64,
        aperture_policy: ApertureCheckPolicy,
    ) -> Self {
        Self {
            shapes: registry.keys(),
            backend,
            global_xy_limit_bits: global_xy_limit.to_bits(),
            aperture_policy,
        }
    }

    /// Shapes in type-id order.
    pub fn shapes(&self) -> &[ShapeKey] {
        &self.shapes
    }

    /// Target backend.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Global aperture half-width.
    pub fn global_xy_limit(&self) -> f64 {
        f64::from_bits(self.global_xy_limit_bits)
    }

    /// Aperture policy.
    pub fn aperture_policy(&self) -> ApertureCheckPolicy {
        self.aperture_policy
    }
}

impl fmt::Display for KernelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.backend)?;
        for (i, shape) in self.shapes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", shape.name)?;
        }
        write!(
            f,
            "] limit={:?} aperture={:?}",
            self.global_xy_limit(),
            self.aperture_policy
        )
    }
}

/// What a caller asks the cache for.
#[derive(Clone, Copy, Debug)]
pub struct KernelRequest<'a> {
    /// Shapes the kernel dispatches on.
    pub registry: &'a ShapeRegistry,
    /// Target backend.
    pub backend: Backend,
    /// Global aperture half-width.
    pub global_xy_limit: f64,
    /// Which shapes get the global aperture check.
    pub aperture_policy: ApertureCheckPolicy,
    /// Write the generated source here before compiling.
    pub save_source_as: Option<&'a Path>,
}

impl KernelRequest<'_> {
    /// Cache key of this request.
    pub fn key(&self) -> KernelKey {
        KernelKey::new(
            self.registry,
            self.backend,
            self.global_xy_limit,
            self.aperture_policy,
        )
    }
}

/// Backend artifact owned by a compiled kernel.
pub(crate) enum Artifact {
    Host(HostProgram),
    Device(Box<dyn DeviceModule>),
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(p) => f.debug_tuple("Host").field(p).finish(),
            Self::Device(m) => f.debug_tuple("Device").field(m).finish(),
        }
    }
}

/// An immutable compiled kernel, shared by `Arc`.
#[derive(Debug)]
pub struct CompiledKernel {
    id: KernelId,
    key: KernelKey,
    source: Arc<str>,
    symbols: SymbolTable,
    signature: KernelSignature,
    artifact: Artifact,
}

impl CompiledKernel {
    pub(crate) fn new(
        key: KernelKey,
        source: Arc<str>,
        symbols: SymbolTable,
        signature: KernelSignature,
        artifact: Artifact,
    ) -> Self {
        Self {
            id: KernelId::next(),
            key,
            source,
            symbols,
            signature,
            artifact,
        }
    }

    /// Unique id of this compilation.
    pub fn id(&self) -> KernelId {
        self.id
    }

    /// Cache key.
    pub fn key(&self) -> &KernelKey {
        &self.key
    }

    /// Backend the kernel runs on.
    pub fn backend(&self) -> Backend {
        self.key.backend
    }

    /// Generated source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Entry points.
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// `track_line` parameters.
    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    fn check_placement(&self, arena: &Arena) -> Result<(), ConfigError> {
        let expected = self.key.backend.placement();
        if arena.placement() != expected {
            return Err(ConfigError::BackendMismatch {
                kernel: self.key.backend,
                placement: arena.placement(),
            });
        }
        Ok(())
    }

    /// Run `track_line` synchronously.
    ///
    /// Placement, tables and ranges are checked first; on error no
    /// particle has been touched.
    pub fn launch(&self, args: KernelArgs<'_>) -> Result<(), LaunchError> {
        self.check_placement(args.arena)?;
        args.check()?;
        match &self.artifact {
            Artifact::Host(program) => program.launch(args)?,
            Artifact::Device(module) => {
                module.launch(args).map_err(|reason| LaunchError::Device {
                    backend: self.key.backend,
                    reason,
                })?
            }
        }
        Ok(())
    }

    /// Track one particle through the element at `offset`, outside the
    /// turn and element loops. Single-threaded host kernels only.
    pub fn track_element(
        &self,
        arena: &Arena,
        offset: u64,
        type_id: ShapeId,
        particle: &mut LocalParticle,
    ) -> Result<(), ConfigError> {
        let unsupported = ConfigError::UnsupportedBackend {
            backend: self.key.backend,
            operation: "track_element",
        };
        if !self.key.backend.is_host_serial() {
            return Err(unsupported);
        }
        self.check_placement(arena)?;
        match &self.artifact {
            Artifact::Host(program) => program.track_element(arena, offset, type_id, particle),
            Artifact::Device(_) => Err(unsupported),
        }
    }
}
