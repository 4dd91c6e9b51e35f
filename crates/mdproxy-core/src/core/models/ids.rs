use serde::{Deserialize, Serialize};
use std::fmt;

/// Permanent identifier of a particle, stable across migrations between ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticleId(pub usize);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Particle type index used to look up pair potentials.
pub type TypeId = usize;
