//! CUDA emitter: one GPU thread per particle slot.

use super::{BackendEmitter, Qualifier};

/// CUDA C.
#[derive(Clone, Copy, Debug, Default)]
pub struct CudaEmitter;

impl BackendEmitter for CudaEmitter {
    fn preamble(&self) -> &'static str {
        "#include <stdint.h>\n"
    }

    fn qualifier(&self, q: Qualifier) -> &'static str {
        match q {
            Qualifier::Function => "__device__",
            Qualifier::GlobalMem => "",
            Qualifier::Kernel => "extern \"C\" __global__",
        }
    }

    fn thread_prologue(&self) -> &'static [&'static str] {
        &["int64_t const part_id = blockDim.x * blockIdx.x + threadIdx.x;"]
    }
}
