use super::local::LocalError;
use super::protocol::LangevinParams;
use crate::core::bc::OrthorhombicBC;
use crate::core::forcefield::table::PotentialTable;
use crate::core::models::particle::Particle;
use crate::core::rng::SimRng;
use crate::pmi::Rank;

/// What a rank hands to its propagator for one `run` request.
pub struct StepContext<'a> {
    pub rank: Rank,
    /// Particles owned by this rank. Positions may leave the primary box; the system
    /// folds them back on the next resort.
    pub particles: &'a mut [Particle],
    pub bc: &'a OrthorhombicBC,
    /// Pair potentials of every interaction registered with the system.
    pub potentials: Vec<&'a PotentialTable>,
    pub time_step: f64,
    /// Value of the integrator's step counter before this run.
    pub first_step: u64,
    pub steps: u64,
    pub thermostat: Option<LangevinParams>,
    pub rng: &'a mut SimRng,
}

/// Per-rank kernel that advances owned particles by a number of time steps.
pub trait Propagator: Send {
    fn advance(&mut self, ctx: StepContext<'_>) -> Result<(), LocalError>;
}

/// Leaves particles where they are; only the integrator clock moves.
#[derive(Debug, Default, Clone, Copy)]
pub struct HoldPositions;

impl Propagator for HoldPositions {
    fn advance(&mut self, _ctx: StepContext<'_>) -> Result<(), LocalError> {
        Ok(())
    }
}

