//! Thin multipole kick up to a fixed maximum order.
//!
//! Strengths are given as integrated normal (`knl`) and skew (`ksl`)
//! coefficients. They are stored pre-divided by `n!` and interleaved
//! (`bal[2n] = knl[n]/n!`, `bal[2n+1] = ksl[n]/n!`) so both the host and
//! device transforms evaluate the field with one Horner loop.

use ringtrack_core::LocalParticle;
use ringtrack_element::{Element, ElementView, Shape, ShapeKind};
use smallvec::SmallVec;

/// Highest supported multipole order (0 = dipole, 1 = quadrupole, ...).
pub const MAX_ORDER: usize = 5;

/// Offset of `bal_0` in the field layout.
const BAL_START: usize = 4;

/// Errors from [`MultipoleBuilder::build`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum MultipoleError {
    /// More coefficients than [`MAX_ORDER`] allows.
    #[error("multipole order {order} exceeds maximum {max}")]
    OrderTooHigh {
        /// Requested order.
        order: usize,
        /// Supported maximum.
        max: usize,
    },
    /// A parameter is NaN or infinite.
    #[error("multipole parameter '{field}' is not finite")]
    NonFinite {
        /// Offending parameter.
        field: &'static str,
    },
}

/// Thin multipole kick.
///
/// Zero physical length: `length` only scales the curvature correction
/// and never advances `s`.
#[derive(Clone, Debug, PartialEq)]
pub struct Multipole {
    knl: SmallVec<[f64; MAX_ORDER + 1]>,
    ksl: SmallVec<[f64; MAX_ORDER + 1]>,
    hxl: f64,
    hyl: f64,
    length: f64,
}

/// Builder for [`Multipole`].
///
/// All coefficients default to zero; the order is inferred from the
/// longer of `knl` and `ksl`.
#[derive(Clone, Debug, Default)]
pub struct MultipoleBuilder {
    knl: Vec<f64>,
    ksl: Vec<f64>,
    hxl: f64,
    hyl: f64,
    length: f64,
}

impl Multipole {
    /// Start building a multipole.
    pub fn builder() -> MultipoleBuilder {
        MultipoleBuilder::default()
    }

    /// Multipole order.
    pub fn order(&self) -> usize {
        self.knl.len().saturating_sub(1)
    }

    /// Integrated normal strengths.
    pub fn knl(&self) -> &[f64] {
        &self.knl
    }

    /// Integrated skew strengths.
    pub fn ksl(&self) -> &[f64] {
        &self.ksl
    }
}

impl MultipoleBuilder {
    /// Integrated normal strengths, index = order.
    pub fn knl(mut self, knl: &[f64]) -> Self {
        self.knl = knl.to_vec();
        self
    }

    /// Integrated skew strengths, index = order.
    pub fn ksl(mut self, ksl: &[f64]) -> Self {
        self.ksl = ksl.to_vec();
        self
    }

    /// Horizontal curvature times length.
    pub fn hxl(mut self, hxl: f64) -> Self {
        self.hxl = hxl;
        self
    }

    /// Vertical curvature times length.
    pub fn hyl(mut self, hyl: f64) -> Self {
        self.hyl = hyl;
        self
    }

    /// Equivalent length used by the curvature correction.
    pub fn length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<Multipole, MultipoleError> {
        let n = self.knl.len().max(self.ksl.len()).max(1);
        if n > MAX_ORDER + 1 {
            return Err(MultipoleError::OrderTooHigh {
                order: n - 1,
                max: MAX_ORDER,
            });
        }
        for (field, v) in [("hxl", self.hxl), ("hyl", self.hyl), ("length", self.length)] {
            if !v.is_finite() {
                return Err(MultipoleError::NonFinite { field });
            }
        }
        if self.knl.iter().any(|v| !v.is_finite()) {
            return Err(MultipoleError::NonFinite { field: "knl" });
        }
        if self.ksl.iter().any(|v| !v.is_finite()) {
            return Err(MultipoleError::NonFinite { field: "ksl" });
        }
        let pad = |src: &[f64]| {
            let mut out: SmallVec<[f64; MAX_ORDER + 1]> = src.iter().copied().collect();
            out.resize(n, 0.0);
            out
        };
        Ok(Multipole {
            knl: pad(&self.knl),
            ksl: pad(&self.ksl),
            hxl: self.hxl,
            hyl: self.hyl,
            length: self.length,
        })
    }
}

/// Shape of [`Multipole`].
pub static MULTIPOLE: Shape = Shape {
    name: "Multipole",
    fields: &[
        "order", "length", "hxl", "hyl", "bal_0", "bal_1", "bal_2", "bal_3", "bal_4", "bal_5",
        "bal_6", "bal_7", "bal_8", "bal_9", "bal_10", "bal_11",
    ],
    kind: ShapeKind::Kick,
    track: track_multipole,
    source: MULTIPOLE_SOURCE,
    fragments: &[],
};

const MULTIPOLE_SOURCE: &str = r#"
/*gpufun*/
double MultipoleData_get_bal(MultipoleData el, int64_t i){
    return ((/*gpuglmem*/ double*) el)[4 + i];
}

/*gpufun*/
void Multipole_track_local_particle(MultipoleData el, LocalParticle* part){
    int64_t order = (int64_t) MultipoleData_get_order(el);
    int64_t index_x = 2 * order;
    int64_t index_y = index_x + 1;
    double dpx = MultipoleData_get_bal(el, index_x);
    double dpy = MultipoleData_get_bal(el, index_y);
    double const x = LocalParticle_get_x(part);
    double const y = LocalParticle_get_y(part);
    double const chi = LocalParticle_get_chi(part);
    double const hxl = MultipoleData_get_hxl(el);
    double const hyl = MultipoleData_get_hyl(el);

    while (index_x > 0){
        double const zre = dpx * x - dpy * y;
        double const zim = dpx * y + dpy * x;
        index_x -= 2;
        index_y -= 2;
        dpx = MultipoleData_get_bal(el, index_x) + zre;
        dpy = MultipoleData_get_bal(el, index_y) + zim;
    }
    dpx = -chi * dpx;
    dpy = chi * dpy;

    if (hxl != 0. || hyl != 0.){
        double const delta = LocalParticle_get_delta(part);
        double const length = MultipoleData_get_length(el);
        double const hxlx = x * hxl;
        double const hyly = y * hyl;
        LocalParticle_add_to_zeta(part, chi * (hyly - hxlx));
        dpx += hxl + hxl * delta;
        dpy -= hyl + hyl * delta;
        if (length != 0.){
            double const b1l = chi * MultipoleData_get_bal(el, 0);
            double const a1l = chi * MultipoleData_get_bal(el, 1);
            dpx -= b1l * hxlx / length;
            dpy += a1l * hyly / length;
        }
    }
    LocalParticle_add_to_px(part, dpx);
    LocalParticle_add_to_py(part, dpy);
}
"#;

fn track_multipole(el: &ElementView<'_>, p: &mut LocalParticle) {
    let order = (el.field(0) as usize).min(MAX_ORDER);
    let length = el.field(1);
    let hxl = el.field(2);
    let hyl = el.field(3);
    let bal = &el.values()[BAL_START..];
    let (x, y, chi) = (p.x, p.y, p.chi);

    let mut ix = 2 * order;
    let mut dpx = bal[ix];
    let mut dpy = bal[ix + 1];
    while ix > 0 {
        let zre = dpx * x - dpy * y;
        let zim = dpx * y + dpy * x;
        ix -= 2;
        dpx = bal[ix] + zre;
        dpy = bal[ix + 1] + zim;
    }
    dpx *= -chi;
    dpy *= chi;

    if hxl != 0.0 || hyl != 0.0 {
        let hxlx = x * hxl;
        let hyly = y * hyl;
        p.zeta += chi * (hyly - hxlx);
        dpx += hxl + hxl * p.delta;
        dpy -= hyl + hyl * p.delta;
        if length != 0.0 {
            dpx -= chi * bal[0] * hxlx / length;
            dpy += chi * bal[1] * hyly / length;
        }
    }
    p.px += dpx;
    p.py += dpy;
}

impl Element for Multipole {
    fn shape(&self) -> &'static Shape {
        &MULTIPOLE
    }

    fn field_values(&self) -> Vec<f64> {
        let mut values = vec![0.0; MULTIPOLE.fields.len()];
        values[0] = self.order() as f64;
        values[1] = self.length;
        values[2] = self.hxl;
        values[3] = self.hyl;
        let mut factorial = 1.0;
        for (n, (kn, ks)) in self.knl.iter().zip(&self.ksl).enumerate() {
            if n > 0 {
                factorial *= n as f64;
            }
            values[BAL_START + 2 * n] = kn / factorial;
            values[BAL_START + 2 * n + 1] = ks / factorial;
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use ringtrack_core::ParticleId;

    fn kick(m: &Multipole, x: f64, y: f64) -> LocalParticle {
        let values = m.field_values();
        let mut p = LocalParticle::on_axis(ParticleId(0), 1.0);
        p.x = x;
        p.y = y;
        (MULTIPOLE.track)(&ElementView::new(&MULTIPOLE, &values), &mut p);
        p
    }

    #[test]
    fn dipole_kick_is_constant() {
        let m = Multipole::builder().knl(&[1e-3]).build().unwrap();
        let p = kick(&m, 0.01, 0.02);
        assert_eq!(p.px, -1e-3);
        assert_eq!(p.py, 0.0);
        assert_eq!((p.x, p.y), (0.01, 0.02));
    }

    #[test]
    fn quadrupole_kick_is_linear() {
        let m = Multipole::builder().knl(&[0.0, 0.5]).build().unwrap();
        let p = kick(&m, 0.01, 0.02);
        assert!((p.px + 0.5 * 0.01).abs() < 1e-16);
        assert!((p.py - 0.5 * 0.02).abs() < 1e-16);
    }

    #[test]
    fn layout_is_fixed_width() {
        let m = Multipole::builder().knl(&[0.0, 0.0, 2.0]).build().unwrap();
        let values = m.field_values();
        assert_eq!(values.len(), MULTIPOLE.fields.len());
        assert_eq!(values[0], 2.0);
        // bal_4 = knl[2] / 2!
        assert_eq!(values[BAL_START + 4], 1.0);
    }

    #[test]
    fn builder_rejects_bad_input() {
        let too_high = Multipole::builder().knl(&[0.0; MAX_ORDER + 2]).build();
        assert_eq!(
            too_high,
            Err(MultipoleError::OrderTooHigh {
                order: MAX_ORDER + 1,
                max: MAX_ORDER
            })
        );
        let nan = Multipole::builder().hxl(f64::NAN).build();
        assert_eq!(nan, Err(MultipoleError::NonFinite { field: "hxl" }));
    }

    #[test]
    fn ksl_shorter_than_knl_is_padded() {
        let m = Multipole::builder()
            .knl(&[0.0, 1.0, 2.0])
            .ksl(&[0.5])
            .build()
            .unwrap();
        assert_eq!(m.order(), 2);
        assert_eq!(m.ksl(), &[0.5, 0.0, 0.0]);
    }

    proptest! {
        #[test]
        fn sextupole_matches_closed_form(x in -0.05f64..0.05, y in -0.05f64..0.05, k2 in -10.0f64..10.0) {
            let m = Multipole::builder().knl(&[0.0, 0.0, k2]).build().unwrap();
            let p = kick(&m, x, y);
            let px = -k2 / 2.0 * (x * x - y * y);
            let py = k2 * x * y;
            prop_assert!((p.px - px).abs() <= 1e-12 * (1.0 + px.abs()));
            prop_assert!((p.py - py).abs() <= 1e-12 * (1.0 + py.abs()));
        }
    }
}
