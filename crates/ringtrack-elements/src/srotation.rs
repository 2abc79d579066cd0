//! Rotation of the transverse frame about the longitudinal axis.

use ringtrack_core::LocalParticle;
use ringtrack_element::{Element, ElementView, Shape, ShapeKind};
use serde::{Deserialize, Serialize};

/// Rotates `(x, y)` and `(px, py)` by an angle, stored as its cosine and
/// sine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SRotation {
    /// Cosine of the rotation angle.
    pub cos_z: f64,
    /// Sine of the rotation angle.
    pub sin_z: f64,
}

impl SRotation {
    /// Rotation by `angle` degrees.
    pub fn from_degrees(angle: f64) -> Self {
        let (sin_z, cos_z) = angle.to_radians().sin_cos();
        Self { cos_z, sin_z }
    }
}

impl Default for SRotation {
    fn default() -> Self {
        Self {
            cos_z: 1.0,
            sin_z: 0.0,
        }
    }
}

/// Shape of [`SRotation`].
pub static SROTATION: Shape = Shape {
    name: "SRotation",
    fields: &["cos_z", "sin_z"],
    kind: ShapeKind::Transform,
    track: track_srotation,
    source: SROTATION_SOURCE,
    fragments: &[],
};

const SROTATION_SOURCE: &str = r#"
/*gpufun*/
void SRotation_track_local_particle(SRotationData el, LocalParticle* part){
    double const c = SRotationData_get_cos_z(el);
    double const s = SRotationData_get_sin_z(el);
    double const x = LocalParticle_get_x(part);
    double const y = LocalParticle_get_y(part);
    double const px = LocalParticle_get_px(part);
    double const py = LocalParticle_get_py(part);
    LocalParticle_set_x(part, c * x + s * y);
    LocalParticle_set_y(part, -s * x + c * y);
    LocalParticle_set_px(part, c * px + s * py);
    LocalParticle_set_py(part, -s * px + c * py);
}
"#;

fn track_srotation(el: &ElementView<'_>, p: &mut LocalParticle) {
    let (c, s) = (el.field(0), el.field(1));
    let (x, y, px, py) = (p.x, p.y, p.px, p.py);
    p.x = c * x + s * y;
    p.y = -s * x + c * y;
    p.px = c * px + s * py;
    p.py = -s * px + c * py;
}

impl Element for SRotation {
    fn shape(&self) -> &'static Shape {
        &SROTATION
    }

    fn field_values(&self) -> Vec<f64> {
        vec![self.cos_z, self.sin_z]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_core::ParticleId;

    #[test]
    fn quarter_turn_swaps_axes() {
        let rot = SRotation::from_degrees(90.0);
        let values = rot.field_values();
        let mut p = LocalParticle::on_axis(ParticleId(0), 1.0);
        p.x = 1.0;
        p.px = 0.5;
        (SROTATION.track)(&ElementView::new(&SROTATION, &values), &mut p);
        assert!(p.x.abs() < 1e-15);
        assert!((p.y + 1.0).abs() < 1e-15);
        assert!((p.py + 0.5).abs() < 1e-15);
    }
}
