//! The particle batch.
//!
//! [`Particles`] stores one column per coordinate (struct of arrays), the
//! layout kernels read and write. A launch gathers each slot into a
//! [`LocalParticle`], tracks it, and scatters it back.
//!
//! Batch-level reference quantities (`mass0`, `q0`, `p0c`) are shared by
//! every particle; `beta0` and `gamma0` are derived from them.

use ringtrack_core::{delta_derived, ConfigError, LocalParticle, ParticleId, STATE_ALIVE};
use serde::{Deserialize, Serialize};

/// Proton rest energy \[eV\].
pub const PROTON_MASS_EV: f64 = 938.272_088_16e6;

/// Electron rest energy \[eV\].
pub const ELECTRON_MASS_EV: f64 = 0.510_998_950_00e6;

/// A per-particle input column: one value per particle, or one value
/// broadcast to every particle.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// Same value for every particle.
    Scalar(f64),
    /// One value per particle.
    Values(Vec<f64>),
}

impl Default for Column {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl From<f64> for Column {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Self::Values(v)
    }
}

impl From<&[f64]> for Column {
    fn from(v: &[f64]) -> Self {
        Self::Values(v.to_vec())
    }
}

impl Column {
    fn len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Values(v) => Some(v.len()),
        }
    }

    fn expand(self, n: usize) -> Vec<f64> {
        match self {
            Self::Scalar(v) => vec![v; n],
            Self::Values(v) => v,
        }
    }
}

/// Builder for [`Particles`].
///
/// Every coordinate defaults to zero and `chi` to one. Columns given as
/// vectors must agree in length; scalars broadcast.
#[derive(Clone, Debug)]
pub struct ParticlesBuilder {
    mass0: f64,
    q0: f64,
    p0c: f64,
    num_particles: Option<usize>,
    x: Column,
    px: Column,
    y: Column,
    py: Column,
    zeta: Column,
    delta: Column,
    chi: Column,
}

impl Default for ParticlesBuilder {
    fn default() -> Self {
        Self {
            mass0: PROTON_MASS_EV,
            q0: 1.0,
            p0c: 7e12,
            num_particles: None,
            x: Column::default(),
            px: Column::default(),
            y: Column::default(),
            py: Column::default(),
            zeta: Column::default(),
            delta: Column::default(),
            chi: Column::Scalar(1.0),
        }
    }
}

macro_rules! column_setters {
    ($($name:ident => $doc:literal),* $(,)?) => {
        $(
            #[doc = $doc]
            pub fn $name(mut self, values: impl Into<Column>) -> Self {
                self.$name = values.into();
                self
            }
        )*
    };
}

impl ParticlesBuilder {
    /// Reference rest energy \[eV\]. Default: proton.
    pub fn mass0(mut self, mass0: f64) -> Self {
        self.mass0 = mass0;
        self
    }

    /// Reference charge in units of the elementary charge. Default: 1.
    pub fn q0(mut self, q0: f64) -> Self {
        self.q0 = q0;
        self
    }

    /// Reference momentum times c \[eV\]. Default: 7 TeV.
    pub fn p0c(mut self, p0c: f64) -> Self {
        self.p0c = p0c;
        self
    }

    /// Batch size when every column is a scalar. Default: 1.
    pub fn num_particles(mut self, n: usize) -> Self {
        self.num_particles = Some(n);
        self
    }

    column_setters! {
        x => "Horizontal positions \\[m\\].",
        px => "Horizontal momenta.",
        y => "Vertical positions \\[m\\].",
        py => "Vertical momenta.",
        zeta => "Longitudinal positions \\[m\\].",
        delta => "Relative momentum deviations.",
        chi => "Charge-to-mass ratios relative to the reference particle.",
    }

    /// Validate and build.
    pub fn build(self) -> Result<Particles, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidParticles { reason };
        let (beta0, gamma0) = reference_kinematics(self.mass0, self.p0c, self.q0)?;

        let columns = [
            ("x", &self.x),
            ("px", &self.px),
            ("y", &self.y),
            ("py", &self.py),
            ("zeta", &self.zeta),
            ("delta", &self.delta),
            ("chi", &self.chi),
        ];
        let mut n = self.num_particles;
        for (name, column) in columns {
            if let Some(len) = column.len() {
                match n {
                    Some(expected) if expected != len => {
                        return Err(invalid(format!(
                            "column {name} has {len} values, expected {expected}"
                        )))
                    }
                    _ => n = Some(len),
                }
            }
        }
        let n = n.unwrap_or(1);

        let delta = self.delta.expand(n);
        if let Some(bad) = delta.iter().find(|d| d.is_nan() || **d <= -1.0) {
            return Err(invalid(format!("delta must exceed -1, got {bad}")));
        }
        let (rpp, rvv): (Vec<f64>, Vec<f64>) = delta.iter().map(|d| delta_derived(*d, beta0)).unzip();

        Ok(Particles {
            mass0: self.mass0,
            q0: self.q0,
            p0c: self.p0c,
            beta0,
            gamma0,
            x: self.x.expand(n),
            px: self.px.expand(n),
            y: self.y.expand(n),
            py: self.py.expand(n),
            zeta: self.zeta.expand(n),
            delta,
            rpp,
            rvv,
            chi: self.chi.expand(n),
            s: vec![0.0; n],
            particle_id: (0..n as u64).collect(),
            state: vec![STATE_ALIVE; n],
            at_turn: vec![0; n],
            at_element: vec![0; n],
        })
    }
}

/// A batch of particles, one column per quantity.
///
/// Deserialized batches are checked like built ones: every column must
/// have one value per particle id, and `beta0`/`gamma0` are derived again
/// from `mass0` and `p0c`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParticlesRecord")]
pub struct Particles {
    mass0: f64,
    q0: f64,
    p0c: f64,
    beta0: f64,
    gamma0: f64,
    x: Vec<f64>,
    px: Vec<f64>,
    y: Vec<f64>,
    py: Vec<f64>,
    zeta: Vec<f64>,
    delta: Vec<f64>,
    rpp: Vec<f64>,
    rvv: Vec<f64>,
    chi: Vec<f64>,
    s: Vec<f64>,
    particle_id: Vec<u64>,
    state: Vec<i64>,
    at_turn: Vec<i64>,
    at_element: Vec<i64>,
}

/// Serialized form of [`Particles`], validated on the way in.
#[derive(Deserialize)]
struct ParticlesRecord {
    mass0: f64,
    q0: f64,
    p0c: f64,
    x: Vec<f64>,
    px: Vec<f64>,
    y: Vec<f64>,
    py: Vec<f64>,
    zeta: Vec<f64>,
    delta: Vec<f64>,
    rpp: Vec<f64>,
    rvv: Vec<f64>,
    chi: Vec<f64>,
    s: Vec<f64>,
    particle_id: Vec<u64>,
    state: Vec<i64>,
    at_turn: Vec<i64>,
    at_element: Vec<i64>,
}

impl TryFrom<ParticlesRecord> for Particles {
    type Error = ConfigError;

    fn try_from(r: ParticlesRecord) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidParticles { reason };
        let (beta0, gamma0) = reference_kinematics(r.mass0, r.p0c, r.q0)?;
        let n = r.particle_id.len();
        let lengths = [
            ("x", r.x.len()),
            ("px", r.px.len()),
            ("y", r.y.len()),
            ("py", r.py.len()),
            ("zeta", r.zeta.len()),
            ("delta", r.delta.len()),
            ("rpp", r.rpp.len()),
            ("rvv", r.rvv.len()),
            ("chi", r.chi.len()),
            ("s", r.s.len()),
            ("state", r.state.len()),
            ("at_turn", r.at_turn.len()),
            ("at_element", r.at_element.len()),
        ];
        if let Some((name, len)) = lengths.iter().find(|(_, len)| *len != n) {
            return Err(invalid(format!(
                "column {name} has {len} values for {n} particles"
            )));
        }
        if let Some(bad) = r.delta.iter().find(|d| d.is_nan() || **d <= -1.0) {
            return Err(invalid(format!("delta must exceed -1, got {bad}")));
        }
        Ok(Self {
            mass0: r.mass0,
            q0: r.q0,
            p0c: r.p0c,
            beta0,
            gamma0,
            x: r.x,
            px: r.px,
            y: r.y,
            py: r.py,
            zeta: r.zeta,
            delta: r.delta,
            rpp: r.rpp,
            rvv: r.rvv,
            chi: r.chi,
            s: r.s,
            particle_id: r.particle_id,
            state: r.state,
            at_turn: r.at_turn,
            at_element: r.at_element,
        })
    }
}

/// `(beta0, gamma0)` of the reference particle.
fn reference_kinematics(mass0: f64, p0c: f64, q0: f64) -> Result<(f64, f64), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidParticles { reason };
    for (name, v) in [("mass0", mass0), ("p0c", p0c)] {
        if !(v.is_finite() && v > 0.0) {
            return Err(invalid(format!("{name} must be finite and positive, got {v}")));
        }
    }
    if !q0.is_finite() {
        return Err(invalid(format!("q0 must be finite, got {q0}")));
    }
    let energy0 = p0c.hypot(mass0);
    Ok((p0c / energy0, energy0 / mass0))
}

macro_rules! column_getters {
    ($($name:ident : $ty:ty => $doc:literal),* $(,)?) => {
        $(
            #[doc = $doc]
            pub fn $name(&self) -> &[$ty] {
                &self.$name
            }
        )*
    };
}

impl Particles {
    /// Start building a batch.
    pub fn builder() -> ParticlesBuilder {
        ParticlesBuilder::default()
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.particle_id.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.particle_id.is_empty()
    }

    /// Reference rest energy \[eV\].
    pub fn mass0(&self) -> f64 {
        self.mass0
    }

    /// Reference charge.
    pub fn q0(&self) -> f64 {
        self.q0
    }

    /// Reference momentum times c \[eV\].
    pub fn p0c(&self) -> f64 {
        self.p0c
    }

    /// Reference relativistic beta.
    pub fn beta0(&self) -> f64 {
        self.beta0
    }

    /// Reference relativistic gamma.
    pub fn gamma0(&self) -> f64 {
        self.gamma0
    }

    column_getters! {
        x: f64 => "Horizontal positions.",
        px: f64 => "Horizontal momenta.",
        y: f64 => "Vertical positions.",
        py: f64 => "Vertical momenta.",
        zeta: f64 => "Longitudinal positions.",
        delta: f64 => "Relative momentum deviations.",
        rpp: f64 => "`1 / (1 + delta)` per particle.",
        rvv: f64 => "`beta / beta0` per particle.",
        chi: f64 => "Relative charge-to-mass ratios.",
        s: f64 => "Path lengths.",
        particle_id: u64 => "Particle ids.",
        state: i64 => "Alive (`> 0`) or loss code (`<= 0`).",
        at_turn: i64 => "Last turn each particle started.",
        at_element: i64 => "Last element each particle entered.",
    }

    /// Working copy of slot `i`.
    pub fn get(&self, i: usize) -> Option<LocalParticle> {
        if i >= self.len() {
            return None;
        }
        Some(LocalParticle {
            x: self.x[i],
            px: self.px[i],
            y: self.y[i],
            py: self.py[i],
            zeta: self.zeta[i],
            delta: self.delta[i],
            rpp: self.rpp[i],
            rvv: self.rvv[i],
            chi: self.chi[i],
            beta0: self.beta0,
            s: self.s[i],
            particle_id: ParticleId(self.particle_id[i]),
            state: self.state[i],
            at_turn: self.at_turn[i],
            at_element: self.at_element[i],
        })
    }

    /// Overwrite slot `i` from a working copy. The slot keeps its id.
    ///
    /// A lost slot is frozen: writing to it is an error.
    pub fn set(&mut self, i: usize, p: &LocalParticle) -> Result<(), ConfigError> {
        if i >= self.len() {
            return Err(ConfigError::InvalidParticles {
                reason: format!("slot {i} out of range for {} particles", self.len()),
            });
        }
        if self.state[i] <= 0 {
            return Err(ConfigError::InvalidParticles {
                reason: format!("slot {i} was lost with state {}", self.state[i]),
            });
        }
        self.x[i] = p.x;
        self.px[i] = p.px;
        self.y[i] = p.y;
        self.py[i] = p.py;
        self.zeta[i] = p.zeta;
        self.delta[i] = p.delta;
        self.rpp[i] = p.rpp;
        self.rvv[i] = p.rvv;
        self.chi[i] = p.chi;
        self.s[i] = p.s;
        self.state[i] = p.state;
        self.at_turn[i] = p.at_turn;
        self.at_element[i] = p.at_element;
        Ok(())
    }

    /// Set `delta` of slot `i`, keeping `rpp` and `rvv` consistent. Lost
    /// slots are refused like in [`set`](Self::set).
    pub fn update_delta(&mut self, i: usize, delta: f64) -> Result<(), ConfigError> {
        let mut p = self.get(i).ok_or_else(|| ConfigError::InvalidParticles {
            reason: format!("slot {i} out of range for {} particles", self.len()),
        })?;
        p.update_delta(delta);
        self.set(i, &p)
    }

    /// Working copies of every slot.
    pub fn gather(&self) -> Vec<LocalParticle> {
        (0..self.len()).filter_map(|i| self.get(i)).collect()
    }

    /// Write working copies back, slot by slot. Slots already lost are
    /// left as they are.
    pub fn scatter(&mut self, local: &[LocalParticle]) -> Result<(), ConfigError> {
        if local.len() != self.len() {
            return Err(ConfigError::InvalidParticles {
                reason: format!("{} working copies for {} particles", local.len(), self.len()),
            });
        }
        for (i, p) in local.iter().enumerate() {
            if self.state[i] > 0 {
                self.set(i, p)?;
            }
        }
        Ok(())
    }

    /// Particles still being tracked.
    pub fn num_alive(&self) -> usize {
        self.state.iter().filter(|s| **s > 0).count()
    }

    /// Particles lost so far.
    pub fn num_lost(&self) -> usize {
        self.len() - self.num_alive()
    }
}
