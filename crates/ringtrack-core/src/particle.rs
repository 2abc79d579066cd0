//! The per-thread particle working copy and loss codes.
//!
//! A kernel thread loads one slot of the particle batch into a
//! [`LocalParticle`], runs every turn and element against it, and stores
//! it back. Element transforms receive `&mut LocalParticle` and must not
//! touch any other particle.

use serde::{Deserialize, Serialize};

use crate::id::ParticleId;

/// Reason codes written to `state` when a particle is lost.
///
/// Any `state <= 0` means lost. Positive values mean alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LossCode {
    /// Outside an aperture (element or global).
    Aperture,
    /// An element's physical validity condition failed.
    Unphysical,
}

impl LossCode {
    /// The `state` value written for this loss.
    pub const fn state(self) -> i64 {
        match self {
            Self::Aperture => 0,
            Self::Unphysical => -1,
        }
    }
}

/// `state` value of a particle that is alive.
pub const STATE_ALIVE: i64 = 1;

/// Working copy of one particle slot.
///
/// Coordinates follow the usual accelerator conventions: transverse
/// positions `x`, `y` and momenta `px`, `py`; longitudinal `zeta`; relative
/// momentum deviation `delta`. `rpp = 1/(1+delta)` and `rvv = beta/beta0`
/// are kept consistent with `delta` by whoever writes `delta`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalParticle {
    /// Horizontal position \[m\].
    pub x: f64,
    /// Horizontal momentum, normalized to the reference momentum.
    pub px: f64,
    /// Vertical position \[m\].
    pub y: f64,
    /// Vertical momentum, normalized to the reference momentum.
    pub py: f64,
    /// Longitudinal position \[m\].
    pub zeta: f64,
    /// Relative momentum deviation.
    pub delta: f64,
    /// `1 / (1 + delta)`.
    pub rpp: f64,
    /// Ratio of particle velocity to reference velocity.
    pub rvv: f64,
    /// Charge-to-mass ratio relative to the reference particle.
    pub chi: f64,
    /// Reference relativistic beta.
    pub beta0: f64,
    /// Accumulated path length \[m\].
    pub s: f64,
    /// Batch-unique particle id.
    pub particle_id: ParticleId,
    /// `> 0` alive, `<= 0` lost with a reason code.
    pub state: i64,
    /// Turn counter written at the start of each tracked turn.
    pub at_turn: i64,
    /// Index of the element currently (or last) being tracked.
    pub at_element: i64,
}

impl LocalParticle {
    /// An alive on-axis, on-momentum particle with the given id and beta0.
    pub fn on_axis(particle_id: ParticleId, beta0: f64) -> Self {
        Self {
            x: 0.0,
            px: 0.0,
            y: 0.0,
            py: 0.0,
            zeta: 0.0,
            delta: 0.0,
            rpp: 1.0,
            rvv: 1.0,
            chi: 1.0,
            beta0,
            s: 0.0,
            particle_id,
            state: STATE_ALIVE,
            at_turn: 0,
            at_element: 0,
        }
    }

    /// Whether the particle is still being tracked.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.state > 0
    }

    /// Mark the particle lost. Already-lost particles keep their first code.
    #[inline]
    pub fn mark_lost(&mut self, code: LossCode) {
        if self.is_alive() {
            self.state = code.state();
        }
    }

    /// Advance the path length.
    #[inline]
    pub fn add_to_s(&mut self, length: f64) {
        self.s += length;
    }

    /// Apply the global rectangular aperture: lost if `|x|` or `|y|`
    /// exceeds `limit`. NaN coordinates are lost as well.
    #[inline]
    pub fn global_aperture_check(&mut self, limit: f64) {
        let inside =
            self.x >= -limit && self.x <= limit && self.y >= -limit && self.y <= limit;
        if !inside {
            self.mark_lost(LossCode::Aperture);
        }
    }

    /// Set `delta` and recompute `rpp` and `rvv` from it.
    pub fn update_delta(&mut self, delta: f64) {
        let (rpp, rvv) = delta_derived(delta, self.beta0);
        self.delta = delta;
        self.rpp = rpp;
        self.rvv = rvv;
    }
}

/// `(rpp, rvv)` for momentum deviation `delta` at reference `beta0`.
///
/// An ultra-relativistic reference (`beta0 >= 1`) has `rvv = 1`.
pub fn delta_derived(delta: f64, beta0: f64) -> (f64, f64) {
    let rpp = 1.0 / (1.0 + delta);
    if beta0 >= 1.0 {
        return (rpp, 1.0);
    }
    let gamma0 = 1.0 / (1.0 - beta0 * beta0).sqrt();
    let beta_gamma = (1.0 + delta) * beta0 * gamma0;
    let beta = beta_gamma / (1.0 + beta_gamma * beta_gamma).sqrt();
    (rpp, beta / beta0)
}
