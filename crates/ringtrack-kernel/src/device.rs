//! The seam to device compilers and runtimes.
//!
//! Device backends compile generated source through a [`DeviceToolchain`]
//! registered on the [`KernelCache`](crate::KernelCache). The toolchain
//! returns a [`DeviceModule`] that owns the device artifact and launches
//! it. Without a registered toolchain, device compilation fails with
//! [`CompileError::ToolchainUnavailable`](ringtrack_core::CompileError).

use std::fmt;

use ringtrack_core::Backend;

use crate::args::{KernelArgs, KernelSignature};
use crate::dispatch::DispatchTable;
use crate::ir::KernelIr;

/// Everything a toolchain needs to build one kernel.
#[derive(Debug)]
pub struct DeviceCompileRequest<'a> {
    /// Target backend.
    pub backend: Backend,
    /// Full generated source.
    pub source: &'a str,
    /// Kernel entry point.
    pub entry_point: &'a str,
    /// Parameters of the entry point.
    pub signature: &'a KernelSignature,
    /// IR the source was lowered from.
    pub ir: &'a KernelIr,
    /// Resolved dispatch arms.
    pub dispatch: &'a DispatchTable,
    /// Global aperture limit baked into the source.
    pub global_xy_limit: f64,
}

/// A compiler for one or more device backends.
pub trait DeviceToolchain: Send + Sync + fmt::Debug {
    /// Human-readable toolchain name, used in logs.
    fn name(&self) -> &str;

    /// Whether this toolchain targets `backend`.
    fn supports(&self, backend: &Backend) -> bool;

    /// Compile the request. Errors are diagnostics; the cache attaches the
    /// generated source.
    fn compile(&self, request: &DeviceCompileRequest<'_>) -> Result<Box<dyn DeviceModule>, String>;
}

/// A compiled device kernel.
pub trait DeviceModule: Send + Sync + fmt::Debug {
    /// Launch synchronously: return only after the device finished and
    /// particle and monitor memory are visible to the host.
    fn launch(&self, args: KernelArgs<'_>) -> Result<(), String>;
}
