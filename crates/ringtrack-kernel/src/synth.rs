//! Kernel source synthesis.
//!
//! Assembles one compiled unit from the shapes of a registry, in a fixed
//! order:
//!
//! 1. backend preamble, loss codes and the global aperture limit,
//! 2. shared fragments, each name once,
//! 3. the particle API (`LocalParticle`, `ParticlesData`, bookkeeping),
//! 4. the monitor API,
//! 5. per-shape data accessors,
//! 6. per-shape transforms,
//! 7. the `track_line` kernel lowered from the IR.
//!
//! Nothing here iterates a hash map, so identical inputs give
//! byte-identical output.

use std::sync::Arc;

use indexmap::IndexMap;
use ringtrack_core::{ApertureCheckPolicy, Backend, CompileError, LossCode};
use ringtrack_element::{BuiltinShape, Shape, ShapeRegistry};

use crate::args::KernelSignature;
use crate::emit::{emitter_for, lower_track_line, rewrite_qualifiers};
use crate::ir::KernelIr;

/// Name of the batch entry point.
pub const TRACK_LINE: &str = "track_line";

/// `f64` members of the generated `LocalParticle`, in declaration order.
const PARTICLE_F64: [&str; 11] = [
    "x", "px", "y", "py", "zeta", "delta", "rpp", "rvv", "chi", "beta0", "s",
];

/// `int64_t` members of the generated `LocalParticle`.
const PARTICLE_I64: [&str; 4] = ["particle_id", "state", "at_turn", "at_element"];

/// Doubles per monitor record: every particle member plus a valid flag.
const MONITOR_RECORD_LEN: usize = PARTICLE_F64.len() + PARTICLE_I64.len() + 1;

/// Entry points of a compiled unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolTable {
    all: Vec<String>,
    exposed: Vec<String>,
}

impl SymbolTable {
    fn new(registry: &ShapeRegistry, backend: Backend) -> Self {
        let mut all = vec![TRACK_LINE.to_string()];
        all.extend(registry.iter().map(|(_, s)| s.entry_point()));
        all.push(format!("{}_track_local_particle", BuiltinShape::Monitor.name()));
        let exposed = if backend.is_host_serial() {
            all.clone()
        } else {
            vec![TRACK_LINE.to_string()]
        };
        Self { all, exposed }
    }

    /// Every symbol the unit defines.
    pub fn all(&self) -> &[String] {
        &self.all
    }

    /// Symbols callers may invoke. Only single-threaded host kernels
    /// expose per-element entry points.
    pub fn exposed(&self) -> &[String] {
        &self.exposed
    }

    /// Whether `symbol` is exposed.
    pub fn is_exposed(&self, symbol: &str) -> bool {
        self.exposed.iter().any(|s| s == symbol)
    }
}

/// Output of [`synthesize`].
#[derive(Clone, Debug)]
pub struct Synthesized {
    /// Full source of the compiled unit.
    pub source: Arc<str>,
    /// Entry points.
    pub symbols: SymbolTable,
    /// The kernel IR the source was lowered from.
    pub ir: KernelIr,
    /// `track_line` parameters.
    pub signature: KernelSignature,
}

/// Generate the compiled unit for `registry` on `backend`.
pub fn synthesize(
    registry: &ShapeRegistry,
    backend: Backend,
    global_xy_limit: f64,
    policy: ApertureCheckPolicy,
) -> Result<Synthesized, CompileError> {
    let emitter = emitter_for(backend);
    let ir = KernelIr::track_line(registry, policy);
    let signature = KernelSignature::track_line();

    let mut parts: Vec<String> = Vec::new();
    parts.push(header(backend, emitter.preamble(), global_xy_limit));
    for text in dedup_fragments(registry)?.values() {
        parts.push(text.to_string());
    }
    parts.push(particles_api());
    parts.push(monitor_api());
    for (_, shape) in registry.iter() {
        parts.push(shape_accessors(shape));
    }
    for (_, shape) in registry.iter() {
        parts.push(shape.source.to_string());
    }
    parts.push(lower_track_line(&ir, &signature, emitter)?);

    let source: Arc<str> = rewrite_qualifiers(&parts.join("\n"), emitter).into();
    let symbols = SymbolTable::new(registry, backend);
    for symbol in symbols.all() {
        if !defines(&source, symbol) {
            return Err(CompileError::MissingEntryPoint {
                symbol: symbol.clone(),
                generated: source,
            });
        }
    }
    Ok(Synthesized {
        source,
        symbols,
        ir,
        signature,
    })
}

fn push_line(s: &mut String, text: &str) {
    s.push_str(text);
    s.push('\n');
}

/// Whether `source` contains a definition `void <symbol>(`.
fn defines(source: &str, symbol: &str) -> bool {
    source.contains(&format!("void {symbol}("))
}

fn header(backend: Backend, preamble: &str, global_xy_limit: f64) -> String {
    let mut s = String::new();
    push_line(&mut s, &format!("// ringtrack kernel for {}", backend.name()));
    s.push_str(preamble);
    push_line(&mut s, &format!("#define RINGTRACK_GLOBAL_POSLIMIT ({global_xy_limit:?})"));
    push_line(
        &mut s,
        &format!("#define RINGTRACK_LOST_APERTURE ({})", LossCode::Aperture.state()),
    );
    push_line(
        &mut s,
        &format!("#define RINGTRACK_LOST_UNPHYSICAL ({})", LossCode::Unphysical.state()),
    );
    s
}

/// Shared fragments in first-use order. A name reused with different
/// text is an error.
fn dedup_fragments(registry: &ShapeRegistry) -> Result<IndexMap<&'static str, &'static str>, CompileError> {
    let mut seen: IndexMap<&'static str, &'static str> = IndexMap::new();
    for (_, shape) in registry.iter() {
        for fragment in shape.fragments {
            match seen.get(fragment.name) {
                Some(text) if *text != fragment.text => {
                    return Err(CompileError::ConflictingFragment {
                        name: fragment.name.to_string(),
                    })
                }
                Some(_) => {}
                None => {
                    seen.insert(fragment.name, fragment.text);
                }
            }
        }
    }
    Ok(seen)
}

fn particles_api() -> String {
    let mut s = String::new();
    s.push_str("typedef struct {\n    int64_t num_particles;\n");
    for f in PARTICLE_F64 {
        push_line(&mut s, &format!("    /*gpuglmem*/ double* {f};"));
    }
    for f in PARTICLE_I64 {
        push_line(&mut s, &format!("    /*gpuglmem*/ int64_t* {f};"));
    }
    s.push_str("} ParticlesData;\n\n");

    s.push_str("typedef struct {\n");
    for f in PARTICLE_F64 {
        push_line(&mut s, &format!("    double {f};"));
    }
    for f in PARTICLE_I64 {
        push_line(&mut s, &format!("    int64_t {f};"));
    }
    s.push_str("    int64_t ipart;\n} LocalParticle;\n\n");

    s.push_str(
        "/*gpufun*/\nint64_t ParticlesData_get_num_particles(ParticlesData p){ return p.num_particles; }\n\n",
    );
    for f in PARTICLE_F64 {
        push_line(
            &mut s,
            &format!(
                "/*gpufun*/\ndouble LocalParticle_get_{f}(LocalParticle* part){{ return part->{f}; }}"
            ),
        );
        push_line(
            &mut s,
            &format!(
                "/*gpufun*/\nvoid LocalParticle_set_{f}(LocalParticle* part, double value){{ part->{f} = value; }}"
            ),
        );
        push_line(
            &mut s,
            &format!(
                "/*gpufun*/\nvoid LocalParticle_add_to_{f}(LocalParticle* part, double value){{ part->{f} += value; }}"
            ),
        );
    }
    for f in PARTICLE_I64 {
        push_line(
            &mut s,
            &format!(
                "/*gpufun*/\nint64_t LocalParticle_get_{f}(LocalParticle* part){{ return part->{f}; }}"
            ),
        );
    }
    s.push_str(
        r#"
/*gpufun*/
int64_t check_is_not_lost(LocalParticle* part){ return part->state > 0; }

/*gpufun*/
void update_at_turn(LocalParticle* part, int64_t turn){ part->at_turn = turn; }

/*gpufun*/
void update_at_element(LocalParticle* part, int64_t element){ part->at_element = element; }

/*gpufun*/
void LocalParticle_mark_lost(LocalParticle* part, int64_t code){
    if (part->state > 0){
        part->state = code;
    }
}

/*gpufun*/
void global_aperture_check(LocalParticle* part){
    double const x = part->x;
    double const y = part->y;
    int64_t const inside = (x >= -RINGTRACK_GLOBAL_POSLIMIT) && (x <= RINGTRACK_GLOBAL_POSLIMIT) &&
                           (y >= -RINGTRACK_GLOBAL_POSLIMIT) && (y <= RINGTRACK_GLOBAL_POSLIMIT);
    if (!inside){
        LocalParticle_mark_lost(part, RINGTRACK_LOST_APERTURE);
    }
}
"#,
    );

    s.push_str("\n/*gpufun*/\nvoid Particles_to_LocalParticle(ParticlesData p, LocalParticle* part, int64_t i){\n");
    for f in PARTICLE_F64.iter().chain(PARTICLE_I64.iter()) {
        push_line(&mut s, &format!("    part->{f} = p.{f}[i];"));
    }
    s.push_str("    part->ipart = i;\n}\n");
    s.push_str("\n/*gpufun*/\nvoid LocalParticle_to_Particles(LocalParticle* part, ParticlesData p, int64_t i){\n");
    for f in PARTICLE_F64.iter().chain(PARTICLE_I64.iter()) {
        push_line(&mut s, &format!("    p.{f}[i] = part->{f};"));
    }
    s.push_str("}\n");
    s
}

fn monitor_api() -> String {
    let name = BuiltinShape::Monitor.name();
    let mut s = String::new();
    push_line(&mut s, &format!("#define RINGTRACK_MONITOR_RECORD_LEN ({MONITOR_RECORD_LEN})"));
    push_line(&mut s, &format!("typedef /*gpuglmem*/ int8_t* {name}Data;"));
    push_line(
        &mut s,
        &format!(
            "\n/*gpufun*/\nvoid {name}_track_local_particle({name}Data mon, LocalParticle* part){{"
        ),
    );
    s.push_str(
        r#"    /*gpuglmem*/ int64_t* header = (/*gpuglmem*/ int64_t*) mon;
    int64_t const start = header[0];
    int64_t const stop = header[1];
    int64_t const turn = part->at_turn;
    if (turn < start || turn >= stop){
        return;
    }
    /*gpuglmem*/ double* rec = ((/*gpuglmem*/ double*) (mon + 32))
        + (part->ipart * (stop - start) + (turn - start)) * RINGTRACK_MONITOR_RECORD_LEN;
"#,
    );
    let mut i = 0;
    for f in PARTICLE_F64 {
        push_line(&mut s, &format!("    rec[{i}] = part->{f};"));
        i += 1;
    }
    for f in PARTICLE_I64 {
        push_line(&mut s, &format!("    rec[{i}] = (double) part->{f};"));
        i += 1;
    }
    push_line(&mut s, &format!("    rec[{i}] = 1.;"));
    s.push_str("}\n");
    s
}

fn shape_accessors(shape: &Shape) -> String {
    let data = shape.data_type();
    let mut s = String::new();
    push_line(&mut s, &format!("typedef /*gpuglmem*/ int8_t* {data};"));
    for (i, field) in shape.fields.iter().enumerate() {
        push_line(
            &mut s,
            &format!(
                "/*gpufun*/\ndouble {data}_get_{field}({data} el){{ return ((/*gpuglmem*/ double*) el)[{i}]; }}"
            ),
        );
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_core::LocalParticle;
    use ringtrack_element::{ElementView, ShapeKind, SourceFragment};

    fn noop(_: &ElementView<'_>, _: &mut LocalParticle) {}

    const SHARED: SourceFragment = SourceFragment {
        name: "shared_helper",
        text: "/*gpufun*/\nvoid shared_helper(void){}\n",
    };
    const SHARED_OTHER: SourceFragment = SourceFragment {
        name: "shared_helper",
        text: "/*gpufun*/\nvoid shared_helper(int x){}\n",
    };

    static GAP: Shape = Shape {
        name: "Gap",
        fields: &["length"],
        kind: ShapeKind::Drift,
        track: noop,
        source: "/*gpufun*/\nvoid Gap_track_local_particle(GapData el, LocalParticle* part){}\n",
        fragments: &[SHARED],
    };
    static KICK: Shape = Shape {
        name: "Kick",
        fields: &["k", "tilt"],
        kind: ShapeKind::Kick,
        track: noop,
        source: "/*gpufun*/\nvoid Kick_track_local_particle(KickData el, LocalParticle* part){}\n",
        fragments: &[SHARED],
    };
    static CLASH: Shape = Shape {
        name: "Clash",
        fields: &[],
        kind: ShapeKind::Transform,
        track: noop,
        source: "/*gpufun*/\nvoid Clash_track_local_particle(ClashData el, LocalParticle* part){}\n",
        fragments: &[SHARED_OTHER],
    };
    static SILENT: Shape = Shape {
        name: "Silent",
        fields: &[],
        kind: ShapeKind::Transform,
        track: noop,
        source: "/*gpufun*/\nvoid Silent_helper(void){}\n",
        fragments: &[],
    };

    fn registry(shapes: &[&'static Shape]) -> ShapeRegistry {
        let mut reg = ShapeRegistry::new();
        for s in shapes {
            reg.register(*s).unwrap();
        }
        reg
    }

    fn synth(shapes: &[&'static Shape], backend: Backend) -> Result<Synthesized, CompileError> {
        synthesize(&registry(shapes), backend, 1.0, ApertureCheckPolicy::DriftOnly)
    }

    #[test]
    fn output_is_deterministic() {
        let a = synth(&[&GAP, &KICK], Backend::CpuSerial).unwrap();
        let b = synth(&[&GAP, &KICK], Backend::CpuSerial).unwrap();
        assert_eq!(a.source, b.source);
    }

    #[test]
    fn header_is_one_define_per_line() {
        let text = header(Backend::CpuSerial, "#include <stdint.h>\n", 0.5);
        assert_eq!(
            text,
            "// ringtrack kernel for cpu_serial\n\
             #include <stdint.h>\n\
             #define RINGTRACK_GLOBAL_POSLIMIT (0.5)\n\
             #define RINGTRACK_LOST_APERTURE (0)\n\
             #define RINGTRACK_LOST_UNPHYSICAL (-1)\n"
        );
    }

    #[test]
    fn accessors_index_fields_in_layout_order() {
        let text = shape_accessors(&KICK);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "typedef /*gpuglmem*/ int8_t* KickData;");
        assert_eq!(
            lines[2],
            "double KickData_get_k(KickData el){ return ((/*gpuglmem*/ double*) el)[0]; }"
        );
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn fragments_are_emitted_once() {
        let out = synth(&[&GAP, &KICK], Backend::CpuSerial).unwrap();
        assert_eq!(out.source.matches("void shared_helper(void)").count(), 1);
    }

    #[test]
    fn conflicting_fragment_is_an_error() {
        let err = synth(&[&GAP, &CLASH], Backend::CpuSerial).unwrap_err();
        assert_eq!(
            err,
            CompileError::ConflictingFragment {
                name: "shared_helper".into()
            }
        );
    }

    #[test]
    fn missing_entry_point_carries_source() {
        let err = synth(&[&SILENT], Backend::CpuSerial).unwrap_err();
        match &err {
            CompileError::MissingEntryPoint { symbol, .. } => {
                assert_eq!(symbol, "Silent_track_local_particle")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.generated_source().unwrap().contains("Silent_helper"));
    }

    #[test]
    fn section_order_is_fixed() {
        let src = synth(&[&GAP, &KICK], Backend::CpuSerial).unwrap().source;
        let pos = |needle: &str| src.find(needle).unwrap_or_else(|| panic!("{needle}"));
        let order = [
            "#define RINGTRACK_GLOBAL_POSLIMIT (1.0)",
            "void shared_helper(void)",
            "} LocalParticle;",
            "void ParticlesMonitor_track_local_particle(",
            "double GapData_get_length(",
            "double KickData_get_tilt(",
            "void Gap_track_local_particle(",
            "void Kick_track_local_particle(",
            "void track_line(",
        ];
        for pair in order.windows(2) {
            assert!(pos(pair[0]) < pos(pair[1]), "{} before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn symbols_exposed_only_on_serial_host() {
        let serial = synth(&[&GAP], Backend::CpuSerial).unwrap().symbols;
        assert!(serial.is_exposed("Gap_track_local_particle"));
        assert_eq!(serial.all().len(), 3);
        let cuda = synth(&[&GAP], Backend::Cuda { device: 0 }).unwrap().symbols;
        assert_eq!(cuda.exposed(), &["track_line".to_string()]);
        assert!(!cuda.is_exposed("Gap_track_local_particle"));
    }

    #[test]
    fn qualifiers_rewritten_for_backend() {
        let cpu = synth(&[&GAP], Backend::CpuSerial).unwrap().source;
        assert!(cpu.contains("/*gpufun*/ static inline"));
        let cuda = synth(&[&GAP], Backend::Cuda { device: 0 }).unwrap().source;
        assert!(cuda.contains("/*gpufun*/ __device__"));
        assert!(cuda.contains("/*gpukern*/ extern \"C\" __global__"));
    }

    #[test]
    fn empty_registry_synthesizes() {
        let out = synth(&[], Backend::CpuSerial).unwrap();
        assert!(out.source.contains("switch (ee_type){"));
        assert_eq!(out.symbols.all().len(), 2);
    }
}
