use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_DIST_SQR: f64 = 1e-12;
const OVERLAP_ENERGY: f64 = 1e10;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum PotentialError {
    #[error("Invalid Lennard-Jones parameter '{name}': {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// 12-6 Lennard-Jones potential, truncated at `cutoff` and shifted so it vanishes there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LennardJones {
    epsilon: f64,
    sigma: f64,
    cutoff: f64,
    shift: f64,
}

impl LennardJones {
    /// Creates the potential with the shift chosen automatically as `V(cutoff)`.
    pub fn new(epsilon: f64, sigma: f64, cutoff: f64) -> Result<Self, PotentialError> {
        let mut potential = Self::unshifted(epsilon, sigma, cutoff)?;
        potential.shift = potential.raw_energy_sqr(cutoff * cutoff);
        Ok(potential)
    }

    /// Creates the potential without any energy shift.
    pub fn unshifted(epsilon: f64, sigma: f64, cutoff: f64) -> Result<Self, PotentialError> {
        if !epsilon.is_finite() {
            return Err(PotentialError::InvalidParameter {
                name: "epsilon",
                value: epsilon,
            });
        }
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(PotentialError::InvalidParameter {
                name: "sigma",
                value: sigma,
            });
        }
        if !(cutoff.is_finite() && cutoff > 0.0) {
            return Err(PotentialError::InvalidParameter {
                name: "cutoff",
                value: cutoff,
            });
        }
        Ok(Self {
            epsilon,
            sigma,
            cutoff,
            shift: 0.0,
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn cutoff_sqr(&self) -> f64 {
        self.cutoff * self.cutoff
    }

    pub fn shift(&self) -> f64 {
        self.shift
    }

    #[inline]
    fn raw_energy_sqr(&self, dist_sqr: f64) -> f64 {
        if dist_sqr < MIN_DIST_SQR {
            return OVERLAP_ENERGY;
        }
        let frac2 = self.sigma * self.sigma / dist_sqr;
        let frac6 = frac2 * frac2 * frac2;
        4.0 * self.epsilon * (frac6 * frac6 - frac6)
    }

    /// Shifted energy for a squared distance; zero at and beyond the cutoff.
    #[inline]
    pub fn energy_sqr(&self, dist_sqr: f64) -> f64 {
        if dist_sqr >= self.cutoff_sqr() {
            return 0.0;
        }
        self.raw_energy_sqr(dist_sqr) - self.shift
    }

    #[inline]
    pub fn energy(&self, dist: f64) -> f64 {
        self.energy_sqr(dist * dist)
    }
}
