use super::ensure_positive;
use super::system::System;
use crate::core::forcefield::potentials::LennardJones;
use crate::core::forcefield::table::PotentialTable;
use crate::core::models::ids::TypeId;
use crate::engine::error::EngineError;
use crate::engine::protocol::{ObjectId, ObjectKind, Request};
use tracing::debug;

/// Handle to a Lennard-Jones pair interaction evaluated over a Verlet-style neighbor range.
///
/// The neighbor range is `cutoff + skin`, with the skin taken from the system.
pub struct LennardJonesInteraction<'a> {
    system: &'a System,
    id: ObjectId,
    cutoff: f64,
    potentials: PotentialTable,
}

impl<'a> LennardJonesInteraction<'a> {
    pub fn new(system: &'a System, cutoff: f64) -> Result<Self, EngineError> {
        let cutoff = ensure_positive("cutoff", cutoff)?;
        let range = cutoff + system.skin();
        let id = system
            .session()
            .create(ObjectKind::Interaction, |id| Request::CreateInteraction {
                id,
                system: system.id(),
                range,
            })?;
        Ok(Self {
            system,
            id,
            cutoff,
            potentials: PotentialTable::new(),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn range(&self) -> f64 {
        self.cutoff + self.system.skin()
    }

    /// Sets the potential between two particle types (in either order).
    pub fn set_potential(
        &mut self,
        type_a: TypeId,
        type_b: TypeId,
        potential: LennardJones,
    ) -> Result<(), EngineError> {
        self.system.session().call(Request::SetPotential {
            interaction: self.id,
            type_a,
            type_b,
            potential,
        })?;
        debug!(type_a, type_b, shift = potential.shift(), "Pair potential set.");
        self.potentials.set(type_a, type_b, potential);
        Ok(())
    }

    pub fn potential(&self, type_a: TypeId, type_b: TypeId) -> Option<&LennardJones> {
        self.potentials.get(type_a, type_b)
    }

    /// Total potential energy of the system under this interaction.
    pub fn compute_energy(&self) -> Result<f64, EngineError> {
        self.system
            .session()
            .sum_energies(Request::ComputeEnergy {
                interaction: self.id,
            })
    }
}

impl Drop for LennardJonesInteraction<'_> {
    fn drop(&mut self) {
        self.system.session().release(self.id);
    }
}
