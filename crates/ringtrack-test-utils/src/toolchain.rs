//! A device toolchain that runs kernels on the host.
//!
//! [`EmulatedDeviceToolchain`] accepts CUDA and OpenCL requests, checks
//! that the generated source is really the device flavour (entry point
//! present, device thread index used), and then executes the kernel IR
//! serially on the host. It can also be told to fail, to exercise the
//! error path of the cache.

use std::sync::atomic::{AtomicUsize, Ordering};

use ringtrack_core::Backend;
use ringtrack_kernel::{DeviceCompileRequest, DeviceModule, DeviceToolchain, HostProgram, KernelArgs};

#[derive(Debug, Default)]
pub struct EmulatedDeviceToolchain {
    fail_with: Option<String>,
    compiles: AtomicUsize,
}

impl EmulatedDeviceToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A toolchain that rejects every request with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            compiles: AtomicUsize::new(0),
        }
    }

    /// Number of compile calls so far, including failed ones.
    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

fn thread_index_marker(backend: &Backend) -> Option<&'static str> {
    match backend {
        Backend::Cuda { .. } => Some("blockDim.x * blockIdx.x + threadIdx.x"),
        Backend::OpenCl { .. } => Some("get_global_id(0)"),
        _ => None,
    }
}

impl DeviceToolchain for EmulatedDeviceToolchain {
    fn name(&self) -> &str {
        "emulated-device"
    }

    fn supports(&self, backend: &Backend) -> bool {
        !backend.is_host()
    }

    fn compile(&self, request: &DeviceCompileRequest<'_>) -> Result<Box<dyn DeviceModule>, String> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.fail_with {
            return Err(reason.clone());
        }
        let marker = thread_index_marker(&request.backend)
            .ok_or_else(|| format!("{} is not a device backend", request.backend))?;
        if !request.source.contains(marker) {
            return Err(format!("source does not index threads with `{marker}`"));
        }
        if !request.source.contains(&format!("void {}(", request.entry_point)) {
            return Err(format!("entry point `{}` not found", request.entry_point));
        }
        if request.dispatch.len() != request.ir.cases().map_or(0, <[_]>::len) {
            return Err("dispatch table disagrees with the IR".to_string());
        }
        let program = HostProgram::new(request.ir.clone(), request.backend, request.global_xy_limit)
            .map_err(|e| e.to_string())?;
        Ok(Box::new(EmulatedModule { program }))
    }
}

#[derive(Debug)]
struct EmulatedModule {
    program: HostProgram,
}

impl DeviceModule for EmulatedModule {
    fn launch(&self, args: KernelArgs<'_>) -> Result<(), String> {
        self.program.launch(args).map_err(|e| e.to_string())
    }
}
