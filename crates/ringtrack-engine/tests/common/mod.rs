//! Shared helpers for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ringtrack_engine::{Line, Particles};
use ringtrack_test_utils::{fodo_cell, sample_coordinates, RefLine};

/// Convert a fixture line into an engine line.
pub fn to_line(reference: RefLine) -> Line {
    Line::from_parts(
        reference.elements.into_iter().map(Arc::from).collect(),
        reference.names,
    )
    .unwrap()
}

pub fn fodo_line() -> Line {
    to_line(fodo_cell())
}

/// A seeded proton batch at 450 GeV.
pub fn beam(n: usize, seed: u64, amplitude: f64) -> Particles {
    let c = sample_coordinates(n, seed, amplitude);
    Particles::builder()
        .p0c(450e9)
        .x(c.x)
        .px(c.px)
        .y(c.y)
        .py(c.py)
        .zeta(c.zeta)
        .delta(c.delta)
        .build()
        .unwrap()
}
