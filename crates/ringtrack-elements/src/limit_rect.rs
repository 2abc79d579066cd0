//! Rectangular aperture.

use ringtrack_core::{LocalParticle, LossCode};
use ringtrack_element::{Element, ElementView, Shape, ShapeKind};
use serde::{Deserialize, Serialize};

/// Marks particles outside `[min_x, max_x] x [min_y, max_y]` as lost.
/// Never changes coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitRect {
    /// Lower horizontal bound \[m\].
    pub min_x: f64,
    /// Upper horizontal bound \[m\].
    pub max_x: f64,
    /// Lower vertical bound \[m\].
    pub min_y: f64,
    /// Upper vertical bound \[m\].
    pub max_y: f64,
}

impl LimitRect {
    /// Aperture with the given bounds.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Whether `(x, y)` is inside the bounds (inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Shape of [`LimitRect`].
pub static LIMIT_RECT: Shape = Shape {
    name: "LimitRect",
    fields: &["min_x", "max_x", "min_y", "max_y"],
    kind: ShapeKind::Aperture,
    track: track_limit_rect,
    source: LIMIT_RECT_SOURCE,
    fragments: &[],
};

const LIMIT_RECT_SOURCE: &str = r#"
/*gpufun*/
void LimitRect_track_local_particle(LimitRectData el, LocalParticle* part){
    double const x = LocalParticle_get_x(part);
    double const y = LocalParticle_get_y(part);
    int64_t const is_alive = (int64_t)(
        (x >= LimitRectData_get_min_x(el)) &&
        (x <= LimitRectData_get_max_x(el)) &&
        (y >= LimitRectData_get_min_y(el)) &&
        (y <= LimitRectData_get_max_y(el)));
    if (!is_alive){
        LocalParticle_mark_lost(part, RINGTRACK_LOST_APERTURE);
    }
}
"#;

fn track_limit_rect(el: &ElementView<'_>, p: &mut LocalParticle) {
    let inside = p.x >= el.field(0) && p.x <= el.field(1) && p.y >= el.field(2) && p.y <= el.field(3);
    if !inside {
        p.mark_lost(LossCode::Aperture);
    }
}

impl Element for LimitRect {
    fn shape(&self) -> &'static Shape {
        &LIMIT_RECT
    }

    fn field_values(&self) -> Vec<f64> {
        vec![self.min_x, self.max_x, self.min_y, self.max_y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ringtrack_core::ParticleId;

    fn apply(rect: &LimitRect, x: f64, y: f64) -> LocalParticle {
        let values = rect.field_values();
        let mut p = LocalParticle::on_axis(ParticleId(0), 1.0);
        p.x = x;
        p.y = y;
        (LIMIT_RECT.track)(&ElementView::new(&LIMIT_RECT, &values), &mut p);
        p
    }

    #[test]
    fn bounds_are_inclusive() {
        let rect = LimitRect::new(-0.1, 0.2, 0.2, 0.3);
        assert!(apply(&rect, 0.2, 0.3).is_alive());
        assert!(apply(&rect, -0.1, 0.2).is_alive());
        assert_eq!(apply(&rect, 0.0, 0.0).state, LossCode::Aperture.state());
    }

    proptest! {
        #[test]
        fn loss_matches_containment_and_never_moves(
            x in -0.35f64..0.35,
            y in -0.35f64..0.35,
        ) {
            let rect = LimitRect::new(-0.1, 0.2, 0.2, 0.3);
            let p = apply(&rect, x, y);
            prop_assert_eq!(p.is_alive(), rect.contains(x, y));
            prop_assert_eq!(p.x, x);
            prop_assert_eq!(p.y, y);
        }
    }
}
