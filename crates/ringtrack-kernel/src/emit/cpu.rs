//! Host C emitters: a plain loop, and the same loop under OpenMP.

use super::{BackendEmitter, Qualifier};

const HOST_PREAMBLE: &str = "#include <stdint.h>\n#include <math.h>\n";

fn host_qualifier(q: Qualifier) -> &'static str {
    match q {
        Qualifier::Function => "static inline",
        Qualifier::GlobalMem | Qualifier::Kernel => "",
    }
}

/// Single-threaded host loop over particle slots.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuSerialEmitter;

impl BackendEmitter for CpuSerialEmitter {
    fn preamble(&self) -> &'static str {
        HOST_PREAMBLE
    }

    fn qualifier(&self, q: Qualifier) -> &'static str {
        host_qualifier(q)
    }

    fn thread_prologue(&self) -> &'static [&'static str] {
        &["for (int64_t part_id = 0; part_id < n_part; part_id++){"]
    }

    fn thread_epilogue(&self) -> &'static [&'static str] {
        &["} // for part_id"]
    }
}

/// Host loop split across OpenMP threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenMpEmitter;

impl BackendEmitter for OpenMpEmitter {
    fn preamble(&self) -> &'static str {
        "#include <stdint.h>\n#include <math.h>\n#include <omp.h>\n"
    }

    fn qualifier(&self, q: Qualifier) -> &'static str {
        host_qualifier(q)
    }

    fn thread_prologue(&self) -> &'static [&'static str] {
        &[
            "#pragma omp parallel for",
            "for (int64_t part_id = 0; part_id < n_part; part_id++){",
        ]
    }

    fn thread_epilogue(&self) -> &'static [&'static str] {
        &["} // omp for part_id"]
    }
}
