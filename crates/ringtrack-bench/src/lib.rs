//! Benchmark profiles for the ringtrack particle tracker.
//!
//! - [`ring_profile`]: a ring of focusing cells using every stock shape
//! - [`beam_profile`]: a seeded uniform proton beam

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ringtrack_core::ConfigError;
use ringtrack_elements::{Drift, LimitRect, Multipole, MultipoleError, SRotation, XYShift};
use ringtrack_engine::{Line, Particles};

/// A ring of `cells` focusing cells.
///
/// Each cell: focusing quadrupole, drift, sextupole, drift, defocusing
/// quadrupole, drift, a small misalignment and roll, and an aperture.
/// Strengths vary slightly per cell so no two cells share field values.
pub fn ring_profile(cells: usize) -> Result<Line, MultipoleError> {
    let mut line = Line::new();
    for c in 0..cells {
        let tweak = 1.0 + 1e-3 * c as f64;
        line.push(format!("qf.{c}"), Multipole::builder().knl(&[0.0, 0.1 * tweak]).build()?);
        line.push(format!("d1.{c}"), Drift::new(3.0));
        line.push(
            format!("sx.{c}"),
            Multipole::builder().knl(&[0.0, 0.0, 0.3 * tweak]).build()?,
        );
        line.push(format!("d2.{c}"), Drift::new(3.0));
        line.push(format!("qd.{c}"), Multipole::builder().knl(&[0.0, -0.1 * tweak]).build()?);
        line.push(format!("d3.{c}"), Drift::new(3.0));
        line.push(format!("mis.{c}"), XYShift { dx: 1e-5, dy: -1e-5 });
        line.push(format!("roll.{c}"), SRotation::from_degrees(0.01));
        line.push(format!("ap.{c}"), LimitRect::new(-0.03, 0.03, -0.02, 0.02));
    }
    Ok(line)
}

/// `n` protons at 450 GeV, positions uniform within ±`amplitude`.
pub fn beam_profile(n: usize, seed: u64, amplitude: f64) -> Result<Particles, ConfigError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut column = |scale: f64| -> Vec<f64> {
        (0..n).map(|_| rng.gen_range(-scale..=scale)).collect()
    };
    Particles::builder()
        .p0c(450e9)
        .x(column(amplitude))
        .px(column(amplitude * 0.05))
        .y(column(amplitude))
        .py(column(amplitude * 0.05))
        .delta(column(5e-4))
        .build()
}
