//! Element-by-element reference tracker.
//!
//! Walks the element objects directly, never the arena or the kernel, so
//! it can serve as an oracle for both.

use ringtrack_core::{ApertureCheckPolicy, LocalParticle};
use ringtrack_element::{Element, ElementView, ShapeKind};

/// Parameters of a reference run, mirroring a tracking request.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceRun {
    pub num_turns: usize,
    pub ele_start: usize,
    pub num_elements: usize,
    pub global_xy_limit: f64,
    pub policy: ApertureCheckPolicy,
}

impl ReferenceRun {
    /// One turn over all `n` elements with the default limit and policy.
    pub fn full(n: usize) -> Self {
        Self {
            num_turns: 1,
            ele_start: 0,
            num_elements: n,
            global_xy_limit: 1.0,
            policy: ApertureCheckPolicy::DriftOnly,
        }
    }

    pub fn turns(mut self, num_turns: usize) -> Self {
        self.num_turns = num_turns;
        self
    }
}

fn checked(policy: ApertureCheckPolicy, kind: ShapeKind) -> bool {
    match policy {
        ApertureCheckPolicy::DriftOnly => kind == ShapeKind::Drift,
        ApertureCheckPolicy::AllElements => true,
        ApertureCheckPolicy::Never => false,
    }
}

/// Track every particle one element at a time.
pub fn track_reference(elements: &[&dyn Element], particles: &mut [LocalParticle], run: ReferenceRun) {
    let end = run.ele_start + run.num_elements;
    let prepared: Vec<_> = elements[run.ele_start..end]
        .iter()
        .map(|e| (e.shape(), e.field_values()))
        .collect();
    for p in particles.iter_mut() {
        for iturn in 0..run.num_turns {
            if !p.is_alive() {
                break;
            }
            p.at_turn = iturn as i64;
            for (offset, (shape, values)) in prepared.iter().enumerate() {
                if !p.is_alive() {
                    break;
                }
                p.at_element = (run.ele_start + offset) as i64;
                if checked(run.policy, shape.kind) {
                    p.global_aperture_check(run.global_xy_limit);
                    if !p.is_alive() {
                        break;
                    }
                }
                (shape.track)(&ElementView::new(shape, values), p);
            }
        }
    }
}

/// Panic unless every coordinate of `actual` is within
/// `atol + rtol * |expected|` and the bookkeeping matches exactly.
pub fn assert_close(actual: &LocalParticle, expected: &LocalParticle, rtol: f64, atol: f64) {
    assert_eq!(actual.particle_id, expected.particle_id);
    assert_eq!(actual.state, expected.state, "state of {:?}", actual.particle_id);
    assert_eq!(actual.at_turn, expected.at_turn, "at_turn of {:?}", actual.particle_id);
    assert_eq!(
        actual.at_element, expected.at_element,
        "at_element of {:?}",
        actual.particle_id
    );
    let pairs = [
        ("x", actual.x, expected.x),
        ("px", actual.px, expected.px),
        ("y", actual.y, expected.y),
        ("py", actual.py, expected.py),
        ("zeta", actual.zeta, expected.zeta),
        ("delta", actual.delta, expected.delta),
        ("s", actual.s, expected.s),
    ];
    for (name, a, e) in pairs {
        let tol = atol + rtol * e.abs();
        assert!(
            (a - e).abs() <= tol,
            "{name} of {:?}: {a} vs {e} (tol {tol})",
            actual.particle_id
        );
    }
}
