//! Reference lines built from the stock elements.

use ringtrack_element::Element;
use ringtrack_elements::{Drift, LimitRect, Multipole, SRotation, XYShift};

/// An owned line: boxed elements plus parallel names.
#[derive(Debug, Default)]
pub struct RefLine {
    pub elements: Vec<Box<dyn Element>>,
    pub names: Vec<String>,
}

impl RefLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element named `{prefix}{index}`.
    pub fn push(mut self, prefix: &str, element: impl Element) -> Self {
        self.names.push(format!("{prefix}{}", self.elements.len()));
        self.elements.push(Box::new(element));
        self
    }

    /// Borrowed element list.
    pub fn refs(&self) -> Vec<&dyn Element> {
        self.elements.iter().map(|e| e.as_ref()).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Names `e0, e1, ...` for `n` elements.
pub fn names_for(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("e{i}")).collect()
}

fn quad(k1l: f64) -> Multipole {
    Multipole::builder()
        .knl(&[0.0, k1l])
        .build()
        .expect("quadrupole strengths are finite")
}

fn sextupole(k2l: f64) -> Multipole {
    Multipole::builder()
        .knl(&[0.0, 0.0, k2l])
        .ksl(&[0.0, 0.0, 0.1 * k2l])
        .build()
        .expect("sextupole strengths are finite")
}

/// A small focusing cell that touches every stock shape:
///
/// ```text
/// qf | d | shift | sext | rot | d | qd | d | aperture
/// ```
pub fn fodo_cell() -> RefLine {
    RefLine::new()
        .push("qf", quad(0.12))
        .push("d", Drift::new(2.5))
        .push("shift", XYShift { dx: 1e-4, dy: -5e-5 })
        .push("sext", sextupole(0.4))
        .push("rot", SRotation::from_degrees(0.5))
        .push("d", Drift::new(2.5))
        .push("qd", quad(-0.12))
        .push("d", Drift::new(1.0))
        .push("ap", LimitRect::new(-0.02, 0.02, -0.015, 0.015))
}

/// Two drifts of `length` with a horizontal wall at `x_max` between them.
pub fn drift_wall_drift(length: f64, x_max: f64) -> RefLine {
    RefLine::new()
        .push("d", Drift::new(length))
        .push("wall", LimitRect::new(-x_max, x_max, -1.0, 1.0))
        .push("d", Drift::new(length))
}
