//! Seeded particle coordinates.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ringtrack_core::{LocalParticle, ParticleId};

/// Per-particle phase-space columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Coordinates {
    pub x: Vec<f64>,
    pub px: Vec<f64>,
    pub y: Vec<f64>,
    pub py: Vec<f64>,
    pub zeta: Vec<f64>,
    pub delta: Vec<f64>,
}

impl Coordinates {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Working copies with ids `0..n` and derived quantities for `beta0`.
    pub fn to_local(&self, beta0: f64) -> Vec<LocalParticle> {
        (0..self.len())
            .map(|i| {
                let mut p = LocalParticle::on_axis(ParticleId(i as u64), beta0);
                p.x = self.x[i];
                p.px = self.px[i];
                p.y = self.y[i];
                p.py = self.py[i];
                p.zeta = self.zeta[i];
                p.update_delta(self.delta[i]);
                p
            })
            .collect()
    }
}

/// `n` particles uniform in `[-amplitude, amplitude]` for positions and
/// `[-amplitude/10, amplitude/10]` for angles, `delta` within ±1e-3.
pub fn sample_coordinates(n: usize, seed: u64, amplitude: f64) -> Coordinates {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut column = |scale: f64| -> Vec<f64> {
        (0..n).map(|_| rng.gen_range(-scale..=scale)).collect()
    };
    Coordinates {
        x: column(amplitude),
        px: column(amplitude / 10.0),
        y: column(amplitude),
        py: column(amplitude / 10.0),
        zeta: column(amplitude),
        delta: column(1e-3),
    }
}
