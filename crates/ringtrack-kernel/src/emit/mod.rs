//! Lowering of the kernel IR to backend source text.
//!
//! Every backend shares one lowering walk ([`lower_track_line`]); an
//! emitter only supplies what genuinely differs: the preamble, the
//! qualifier spellings behind the `/*gpufun*/`, `/*gpuglmem*/` and
//! `/*gpukern*/` markers, and how a logical thread obtains its particle
//! slot.

mod cpu;
mod cuda;
mod opencl;

pub use cpu::{CpuSerialEmitter, OpenMpEmitter};
pub use cuda::CudaEmitter;
pub use opencl::OpenClEmitter;

use ringtrack_core::{Backend, CompileError};

use crate::args::KernelSignature;
use crate::ir::{Instr, KernelIr};

/// Source markers rewritten per backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Qualifier {
    /// Device-side helper function (`/*gpufun*/`).
    Function,
    /// Pointer into global memory (`/*gpuglmem*/`).
    GlobalMem,
    /// Kernel entry point (`/*gpukern*/`).
    Kernel,
}

impl Qualifier {
    /// Every marker, in rewrite order.
    pub const ALL: [Qualifier; 3] = [Self::Function, Self::GlobalMem, Self::Kernel];

    /// The marker comment as it appears in source.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Function => "/*gpufun*/",
            Self::GlobalMem => "/*gpuglmem*/",
            Self::Kernel => "/*gpukern*/",
        }
    }
}

/// Backend-specific spelling of the generated source.
pub trait BackendEmitter: Send + Sync {
    /// Lines at the very top of the compiled unit.
    fn preamble(&self) -> &'static str;

    /// Text appended after a marker. Empty leaves the marker alone.
    fn qualifier(&self, q: Qualifier) -> &'static str;

    /// Lines that define `part_id` for the current logical thread, opening
    /// any scope the backend needs. `n_part` is in scope.
    fn thread_prologue(&self) -> &'static [&'static str];

    /// Lines closing whatever [`thread_prologue`](Self::thread_prologue)
    /// opened.
    fn thread_epilogue(&self) -> &'static [&'static str] {
        &[]
    }
}

/// The emitter for `backend`.
pub fn emitter_for(backend: Backend) -> &'static dyn BackendEmitter {
    match backend {
        Backend::CpuSerial => &CpuSerialEmitter,
        Backend::CpuThreaded { .. } => &OpenMpEmitter,
        Backend::Cuda { .. } => &CudaEmitter,
        Backend::OpenCl { .. } => &OpenClEmitter,
    }
}

/// Append the backend qualifier after every marker in `text`.
pub fn rewrite_qualifiers(text: &str, emitter: &dyn BackendEmitter) -> String {
    let mut out = text.to_string();
    for q in Qualifier::ALL {
        let spelled = emitter.qualifier(q);
        if !spelled.is_empty() {
            out = out.replace(q.marker(), &format!("{} {spelled}", q.marker()));
        }
    }
    out
}

/// Indenting line writer.
#[derive(Default)]
pub(crate) struct Writer {
    out: String,
    depth: usize,
}

impl Writer {
    pub(crate) fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    pub(crate) fn close(&mut self, text: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(text);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

/// Lower a `track_line` kernel. The result still carries qualifier
/// markers; the synthesizer rewrites the whole unit at once.
pub fn lower_track_line(
    ir: &KernelIr,
    signature: &KernelSignature,
    emitter: &dyn BackendEmitter,
) -> Result<String, CompileError> {
    ir.validate()?;
    let mut w = Writer::default();
    w.line(Qualifier::Kernel.marker());
    w.open("void track_line(");
    let n = signature.slots().len();
    for (i, slot) in signature.slots().iter().enumerate() {
        let sep = if i + 1 == n { "){" } else { "," };
        w.line(&format!("{} {}{sep}", slot.ty.c_type(), slot.name));
    }
    w.line("");
    w.line("int64_t const n_part = ParticlesData_get_num_particles(particles);");
    w.line("/*gpuglmem*/ int8_t* tbt_mon_pointer = buffer_tbt_monitor + offset_tbt_monitor;");
    w.line("ParticlesMonitorData tbt_monitor = (ParticlesMonitorData) tbt_mon_pointer;");
    w.line("");
    let mut closers: Vec<&'static str> = Vec::new();
    lower_block(ir.body(), emitter, &mut w, &mut closers);
    for closer in closers.iter().rev() {
        w.close(closer);
    }
    w.close("} // track_line");
    Ok(w.finish())
}

fn lower_block(
    instrs: &[Instr],
    emitter: &dyn BackendEmitter,
    w: &mut Writer,
    closers: &mut Vec<&'static str>,
) {
    for instr in instrs {
        match instr {
            Instr::ThreadPrologue => {
                let prologue = emitter.thread_prologue();
                let epilogue = emitter.thread_epilogue();
                for (i, line) in prologue.iter().enumerate() {
                    // The last prologue line opens the thread scope when
                    // the backend needs one.
                    if i + 1 == prologue.len() && !epilogue.is_empty() {
                        w.open(line);
                    } else {
                        w.line(line);
                    }
                }
                closers.extend(epilogue.iter().copied());
            }
            Instr::GuardParticleRange(body) => {
                w.open("if (part_id < n_part){");
                lower_block(body, emitter, w, closers);
                w.close("} // if part_id");
            }
            Instr::LoadParticle => {
                w.line("LocalParticle lpart;");
                w.line("Particles_to_LocalParticle(particles, &lpart, part_id);");
            }
            Instr::TurnLoop(body) => {
                w.open("for (int64_t iturn = 0; iturn < num_turns; iturn++){");
                lower_block(body, emitter, w, closers);
                w.close("} // for turns");
            }
            Instr::IfAlive(body) => {
                w.open("if (check_is_not_lost(&lpart) > 0){");
                lower_block(body, emitter, w, closers);
                w.close("}");
            }
            Instr::SetTurn => w.line("update_at_turn(&lpart, iturn);"),
            Instr::RecordMonitor => {
                w.open("if (flag_tbt_monitor){");
                w.line("ParticlesMonitor_track_local_particle(tbt_monitor, &lpart);");
                w.close("}");
            }
            Instr::ElementLoop(body) => {
                w.open("for (int64_t ee = ele_start; ee < ele_start + num_ele_track; ee++){");
                lower_block(body, emitter, w, closers);
                w.close("} // for elements");
            }
            Instr::SetElement => w.line("update_at_element(&lpart, ee);"),
            Instr::Dispatch(cases) => {
                w.line("/*gpuglmem*/ int8_t* el = buffer + ele_offsets[ee];");
                w.line("int64_t const ee_type = ele_typeids[ee];");
                w.open("switch (ee_type){");
                for case in cases {
                    let name = case.shape.name;
                    w.open(&format!("case {}:", case.type_id));
                    let call = format!(
                        "{}(({}) el, &lpart);",
                        case.shape.entry_point(),
                        case.shape.data_type()
                    );
                    if case.aperture_check {
                        w.line("global_aperture_check(&lpart);");
                        w.open("if (check_is_not_lost(&lpart) > 0){");
                        w.line(&call);
                        w.close("}");
                    } else {
                        w.line(&call);
                    }
                    w.line(&format!("break; // {name}"));
                    w.depth = w.depth.saturating_sub(1);
                }
                w.close("} // switch");
            }
            Instr::StoreParticle => {
                w.line("LocalParticle_to_Particles(&lpart, particles, part_id);");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_core::{ApertureCheckPolicy, LocalParticle};
    use ringtrack_element::{ElementView, Shape, ShapeKind, ShapeRegistry};

    fn noop(_: &ElementView<'_>, _: &mut LocalParticle) {}

    static GAP: Shape = Shape {
        name: "Gap",
        fields: &["length"],
        kind: ShapeKind::Drift,
        track: noop,
        source: "",
        fragments: &[],
    };
    static KICK: Shape = Shape {
        name: "Kick",
        fields: &["k"],
        kind: ShapeKind::Kick,
        track: noop,
        source: "",
        fragments: &[],
    };

    fn lowered(backend: Backend) -> String {
        let mut reg = ShapeRegistry::new();
        reg.register(&GAP).unwrap();
        reg.register(&KICK).unwrap();
        let ir = KernelIr::track_line(&reg, ApertureCheckPolicy::DriftOnly);
        lower_track_line(&ir, &KernelSignature::track_line(), emitter_for(backend)).unwrap()
    }

    #[test]
    fn every_backend_guards_particle_range() {
        for backend in [
            Backend::CpuSerial,
            Backend::CpuThreaded { threads: 0 },
            Backend::Cuda { device: 0 },
            Backend::OpenCl {
                platform: 0,
                device: 0,
            },
        ] {
            let src = lowered(backend);
            assert!(src.contains("if (part_id < n_part){"), "{backend}");
            assert!(src.contains("case 1:"));
        }
    }

    #[test]
    fn thread_index_differs_per_backend() {
        assert!(lowered(Backend::CpuSerial).contains("for (int64_t part_id = 0;"));
        assert!(lowered(Backend::CpuThreaded { threads: 2 }).contains("#pragma omp parallel for"));
        assert!(lowered(Backend::Cuda { device: 0 })
            .contains("blockDim.x * blockIdx.x + threadIdx.x"));
        assert!(lowered(Backend::OpenCl {
            platform: 0,
            device: 0
        })
        .contains("get_global_id(0)"));
    }

    #[test]
    fn aperture_check_precedes_drift_only() {
        let src = lowered(Backend::CpuSerial);
        let gap = src.find("Gap_track_local_particle").unwrap();
        let kick = src.find("Kick_track_local_particle").unwrap();
        let check = src.find("global_aperture_check(&lpart);").unwrap();
        assert!(check < gap);
        assert_eq!(src.matches("global_aperture_check(&lpart);").count(), 1);
        assert!(gap < kick);
    }

    #[test]
    fn braces_balance() {
        for backend in [Backend::CpuSerial, Backend::CpuThreaded { threads: 0 }] {
            let src = lowered(backend);
            assert_eq!(src.matches('{').count(), src.matches('}').count());
        }
    }

    #[test]
    fn qualifiers_keep_marker() {
        let out = rewrite_qualifiers("/*gpufun*/ void f(/*gpuglmem*/ double* p);", &OpenClEmitter);
        assert_eq!(out, "/*gpufun*/ inline void f(/*gpuglmem*/ __global double* p);");
        let cpu = rewrite_qualifiers("/*gpuglmem*/ double* p", &CpuSerialEmitter);
        assert_eq!(cpu, "/*gpuglmem*/ double* p");
    }
}
