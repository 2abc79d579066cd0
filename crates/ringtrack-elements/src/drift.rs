//! Field-free drift in the expanded (paraxial) approximation.

use ringtrack_core::LocalParticle;
use ringtrack_element::{Element, ElementView, Shape, ShapeKind};
use serde::{Deserialize, Serialize};

use crate::fragments::TRANSVERSE_SHIFT;

/// Straight field-free section of length `length`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Drift {
    /// Length \[m\].
    pub length: f64,
}

impl Drift {
    /// A drift of the given length.
    pub fn new(length: f64) -> Self {
        Self { length }
    }
}

/// Shape of [`Drift`].
pub static DRIFT: Shape = Shape {
    name: "Drift",
    fields: &["length"],
    kind: ShapeKind::Drift,
    track: track_drift,
    source: DRIFT_SOURCE,
    fragments: &[TRANSVERSE_SHIFT],
};

const DRIFT_SOURCE: &str = r#"
/*gpufun*/
void Drift_track_local_particle(DriftData el, LocalParticle* part){
    double const length = DriftData_get_length(el);
    double const rpp = LocalParticle_get_rpp(part);
    double const xp = LocalParticle_get_px(part) * rpp;
    double const yp = LocalParticle_get_py(part) * rpp;
    double const dzeta = LocalParticle_get_rvv(part) - (1. + (xp*xp + yp*yp) / 2.);
    LocalParticle_shift_xy(part, xp * length, yp * length);
    LocalParticle_add_to_s(part, length);
    LocalParticle_add_to_zeta(part, length * dzeta);
}
"#;

fn track_drift(el: &ElementView<'_>, p: &mut LocalParticle) {
    let length = el.field(0);
    let xp = p.px * p.rpp;
    let yp = p.py * p.rpp;
    let dzeta = p.rvv - (1.0 + (xp * xp + yp * yp) / 2.0);
    p.x += xp * length;
    p.y += yp * length;
    p.add_to_s(length);
    p.zeta += length * dzeta;
}

impl Element for Drift {
    fn shape(&self) -> &'static Shape {
        &DRIFT
    }

    fn field_values(&self) -> Vec<f64> {
        vec![self.length]
    }

    fn length(&self) -> f64 {
        self.length
    }
}
