//! OpenCL emitter: one work item per particle slot.

use super::{BackendEmitter, Qualifier};

/// OpenCL C.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenClEmitter;

impl BackendEmitter for OpenClEmitter {
    fn preamble(&self) -> &'static str {
        "#pragma OPENCL EXTENSION cl_khr_fp64 : enable\ntypedef char int8_t;\ntypedef long int64_t;\n"
    }

    fn qualifier(&self, q: Qualifier) -> &'static str {
        match q {
            Qualifier::Function => "inline",
            Qualifier::GlobalMem => "__global",
            Qualifier::Kernel => "__kernel",
        }
    }

    fn thread_prologue(&self) -> &'static [&'static str] {
        &["int64_t const part_id = get_global_id(0);"]
    }
}
