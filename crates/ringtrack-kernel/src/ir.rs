//! Backend-agnostic kernel IR.
//!
//! The fused tracking kernel is described once as a small tree of typed
//! instructions. Emitters lower it to C-family text per backend; the host
//! executor interprets it directly. Loop structure, liveness checks and
//! the type switch therefore exist in exactly one place.
//!
//! The tree built by [`KernelIr::track_line`]:
//!
//! ```text
//! ThreadPrologue
//! GuardParticleRange
//!   LoadParticle
//!   TurnLoop
//!     IfAlive
//!       SetTurn
//!       RecordMonitor
//!     ElementLoop
//!       IfAlive
//!         SetElement
//!         Dispatch [case 0, case 1, ...]
//!   StoreParticle
//! ```

use ringtrack_core::{ApertureCheckPolicy, CompileError, ShapeId};
use ringtrack_element::{Shape, ShapeKind, ShapeRegistry};

/// One arm of the per-element type switch.
#[derive(Clone, Copy, Debug)]
pub struct DispatchCase {
    /// Tag matched against the element's type id.
    pub type_id: ShapeId,
    /// Shape whose transform the arm invokes.
    pub shape: &'static Shape,
    /// Whether the global rectangular aperture check runs before the
    /// transform.
    pub aperture_check: bool,
}

/// A kernel instruction.
#[derive(Clone, Debug)]
pub enum Instr {
    /// Map the logical thread to a particle slot.
    ThreadPrologue,
    /// Run the body only if the slot is inside the batch.
    GuardParticleRange(Vec<Instr>),
    /// Copy the slot into the thread's working particle.
    LoadParticle,
    /// `for iturn in 0..num_turns`.
    TurnLoop(Vec<Instr>),
    /// Run the body only while the working particle is alive.
    IfAlive(Vec<Instr>),
    /// `at_turn = iturn`.
    SetTurn,
    /// Append a monitor record if monitoring is enabled.
    RecordMonitor,
    /// `for ee in ele_start..ele_start + num_elements`.
    ElementLoop(Vec<Instr>),
    /// `at_element = ee`.
    SetElement,
    /// Switch on the element's type id.
    Dispatch(Vec<DispatchCase>),
    /// Copy the working particle back to its slot.
    StoreParticle,
}

/// Whether `policy` puts the global aperture check ahead of `kind`.
pub fn needs_aperture_check(policy: ApertureCheckPolicy, kind: ShapeKind) -> bool {
    match policy {
        ApertureCheckPolicy::DriftOnly => kind == ShapeKind::Drift,
        ApertureCheckPolicy::AllElements => true,
        ApertureCheckPolicy::Never => false,
    }
}

/// The instruction tree of one kernel.
#[derive(Clone, Debug)]
pub struct KernelIr {
    body: Vec<Instr>,
}

impl KernelIr {
    /// Wrap an instruction list. Use [`validate`](Self::validate) before
    /// lowering a hand-built tree.
    pub fn new(body: Vec<Instr>) -> Self {
        Self { body }
    }

    /// The standard `track_line` kernel over the shapes of `registry`.
    pub fn track_line(registry: &ShapeRegistry, policy: ApertureCheckPolicy) -> Self {
        let cases = registry
            .iter()
            .map(|(type_id, shape)| DispatchCase {
                type_id,
                shape,
                aperture_check: needs_aperture_check(policy, shape.kind),
            })
            .collect();
        Self::new(vec![
            Instr::ThreadPrologue,
            Instr::GuardParticleRange(vec![
                Instr::LoadParticle,
                Instr::TurnLoop(vec![
                    Instr::IfAlive(vec![Instr::SetTurn, Instr::RecordMonitor]),
                    Instr::ElementLoop(vec![Instr::IfAlive(vec![
                        Instr::SetElement,
                        Instr::Dispatch(cases),
                    ])]),
                ]),
                Instr::StoreParticle,
            ]),
        ])
    }

    /// Top-level instructions.
    pub fn body(&self) -> &[Instr] {
        &self.body
    }

    /// Arms of the type switch, or `None` if the tree has no dispatch.
    pub fn cases(&self) -> Option<&[DispatchCase]> {
        fn find(instrs: &[Instr]) -> Option<&[DispatchCase]> {
            instrs.iter().find_map(|i| match i {
                Instr::Dispatch(cases) => Some(cases.as_slice()),
                other => children(other).and_then(find),
            })
        }
        find(&self.body)
    }

    /// Check the structural rules every lowering relies on:
    ///
    /// - the kernel starts with a thread prologue,
    /// - exactly one dispatch exists, inside an element loop,
    /// - dispatch arms are numbered `0..n` in order.
    pub fn validate(&self) -> Result<(), CompileError> {
        let malformed = |reason: &str| CompileError::MalformedIr {
            reason: reason.to_string(),
        };
        if !matches!(self.body.first(), Some(Instr::ThreadPrologue)) {
            return Err(malformed("kernel must begin with a thread prologue"));
        }
        let mut dispatches = 0;
        count_dispatches(&self.body, false, &mut dispatches)
            .map_err(|reason| malformed(&reason))?;
        if dispatches != 1 {
            return Err(malformed(&format!(
                "expected one dispatch, found {dispatches}"
            )));
        }
        if let Some(cases) = self.cases() {
            for (i, case) in cases.iter().enumerate() {
                if case.type_id.index() != i {
                    return Err(malformed(&format!(
                        "dispatch arm {i} carries type id {}",
                        case.type_id
                    )));
                }
            }
        }
        Ok(())
    }
}

fn children(instr: &Instr) -> Option<&[Instr]> {
    match instr {
        Instr::GuardParticleRange(body)
        | Instr::TurnLoop(body)
        | Instr::IfAlive(body)
        | Instr::ElementLoop(body) => Some(body),
        _ => None,
    }
}

fn count_dispatches(instrs: &[Instr], in_element_loop: bool, n: &mut usize) -> Result<(), String> {
    for instr in instrs {
        match instr {
            Instr::Dispatch(_) if !in_element_loop => {
                return Err("dispatch outside element loop".to_string());
            }
            Instr::Dispatch(_) => *n += 1,
            Instr::ElementLoop(body) => count_dispatches(body, true, n)?,
            other => {
                if let Some(body) = children(other) {
                    count_dispatches(body, in_element_loop, n)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_core::LocalParticle;
    use ringtrack_element::ElementView;

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

    fn registry() -> ShapeRegistry {
        let mut r = ShapeRegistry::new();
        r.register(&KICK).unwrap();
        r.register(&GAP).unwrap();
        r
    }

    #[test]
    fn track_line_is_valid() {
        let ir = KernelIr::track_line(&registry(), ApertureCheckPolicy::DriftOnly);
        ir.validate().unwrap();
        let cases = ir.cases().unwrap();
        assert_eq!(cases.len(), 2);
        assert!(!cases[0].aperture_check);
        assert!(cases[1].aperture_check);
    }

    #[test]
    fn policy_controls_aperture_flag() {
        let all = KernelIr::track_line(&registry(), ApertureCheckPolicy::AllElements);
        assert!(all.cases().unwrap().iter().all(|c| c.aperture_check));
        let never = KernelIr::track_line(&registry(), ApertureCheckPolicy::Never);
        assert!(never.cases().unwrap().iter().all(|c| !c.aperture_check));
    }

    #[test]
    fn empty_registry_still_has_dispatch() {
        let ir = KernelIr::track_line(&ShapeRegistry::new(), ApertureCheckPolicy::DriftOnly);
        ir.validate().unwrap();
        assert_eq!(ir.cases().map(<[_]>::len), Some(0));
    }

    #[test]
    fn dispatch_outside_element_loop_is_rejected() {
        let ir = KernelIr::new(vec![Instr::ThreadPrologue, Instr::Dispatch(Vec::new())]);
        assert!(matches!(
            ir.validate(),
            Err(CompileError::MalformedIr { .. })
        ));
    }

    #[test]
    fn missing_prologue_is_rejected() {
        let ir = KernelIr::new(vec![Instr::ElementLoop(vec![Instr::Dispatch(Vec::new())])]);
        assert!(ir.validate().is_err());
    }

    #[test]
    fn misnumbered_arms_are_rejected() {
        let ir = KernelIr::new(vec![
            Instr::ThreadPrologue,
            Instr::ElementLoop(vec![Instr::Dispatch(vec![DispatchCase {
                type_id: ShapeId(3),
                shape: &GAP,
                aperture_check: false,
            }])]),
        ]);
        assert!(ir.validate().is_err());
    }
}
