//! Transverse frame offset.

use ringtrack_core::LocalParticle;
use ringtrack_element::{Element, ElementView, Shape, ShapeKind};
use serde::{Deserialize, Serialize};

use crate::fragments::TRANSVERSE_SHIFT;

/// Moves the reference frame by `(dx, dy)`; particle coordinates shift by
/// the opposite amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct XYShift {
    /// Horizontal offset \[m\].
    pub dx: f64,
    /// Vertical offset \[m\].
    pub dy: f64,
}

/// Shape of [`XYShift`].
pub static XYSHIFT: Shape = Shape {
    name: "XYShift",
    fields: &["dx", "dy"],
    kind: ShapeKind::Transform,
    track: track_xyshift,
    source: XYSHIFT_SOURCE,
    fragments: &[TRANSVERSE_SHIFT],
};

const XYSHIFT_SOURCE: &str = r#"
/*gpufun*/
void XYShift_track_local_particle(XYShiftData el, LocalParticle* part){
    LocalParticle_shift_xy(part, -XYShiftData_get_dx(el), -XYShiftData_get_dy(el));
}
"#;

fn track_xyshift(el: &ElementView<'_>, p: &mut LocalParticle) {
    p.x -= el.field(0);
    p.y -= el.field(1);
}

impl Element for XYShift {
    fn shape(&self) -> &'static Shape {
        &XYSHIFT
    }

    fn field_values(&self) -> Vec<f64> {
        vec![self.dx, self.dy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_core::ParticleId;

    #[test]
    fn shift_is_opposite_to_frame_offset() {
        let e = XYShift { dx: 0.1, dy: -0.2 };
        let values = e.field_values();
        let mut p = LocalParticle::on_axis(ParticleId(3), 1.0);
        (XYSHIFT.track)(&ElementView::new(&XYSHIFT, &values), &mut p);
        assert_eq!(p.x, -0.1);
        assert_eq!(p.y, 0.2);
        assert_eq!(p.s, 0.0);
    }
}
