use super::propagator::{Propagator, StepContext};
use super::protocol::{LangevinParams, ObjectId, ObjectKind, Request, Response, SystemSetup};
use crate::core::analysis::KineticSums;
use crate::core::bc::{BoundaryError, OrthorhombicBC};
use crate::core::decomp::{DecompositionError, DomainLayout};
use crate::core::forcefield::potentials::LennardJones;
use crate::core::forcefield::table::PotentialTable;
use crate::core::models::grid::Int3D;
use crate::core::models::ids::{ParticleId, TypeId};
use crate::core::models::particle::Particle;
use crate::core::rng::SimRng;
use crate::pmi::{Rank, Worker};
use slotmap::SecondaryMap;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, PartialEq)]
pub enum LocalError {
    #[error("No {kind} with id {id:?} exists on this rank")]
    UnknownObject { kind: ObjectKind, id: ObjectId },

    #[error("Object id {0:?} is already in use")]
    DuplicateObject(ObjectId),

    #[error("System {0:?} has no storage decomposition yet")]
    NotDecomposed(ObjectId),

    #[error("Particle {0} already exists")]
    DuplicateParticle(ParticleId),

    #[error("Potential cutoff {cutoff} exceeds the interaction range {range}")]
    CutoffExceedsRange { cutoff: f64, range: f64 },

    #[error("Objects {first:?} and {second:?} belong to different systems")]
    SystemMismatch { first: ObjectId, second: ObjectId },

    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Decomposition(#[from] DecompositionError),

    #[error("Propagation failed: {0}")]
    Propagation(String),
}

fn unknown(kind: ObjectKind, id: ObjectId) -> LocalError {
    LocalError::UnknownObject { kind, id }
}

/// Rank-local part of a system: the particles this rank owns plus a replica of the
/// complete set for pair lookups across domain borders.
#[derive(Debug)]
pub struct LocalSystem {
    rank: Rank,
    bc: OrthorhombicBC,
    rng: SimRng,
    layout: Option<DomainLayout>,
    owned: Vec<Particle>,
    replica: Vec<Particle>,
    index: HashMap<ParticleId, usize>,
    interactions: Vec<ObjectId>,
}

impl LocalSystem {
    fn new(rank: Rank, setup: SystemSetup) -> Result<Self, LocalError> {
        Ok(Self {
            rank,
            bc: OrthorhombicBC::new(setup.box_l)?,
            rng: SimRng::for_rank(setup.seed, rank),
            layout: None,
            owned: Vec::new(),
            replica: Vec::new(),
            index: HashMap::new(),
            interactions: Vec::new(),
        })
    }

    pub fn owned(&self) -> &[Particle] {
        &self.owned
    }

    pub fn replica_len(&self) -> usize {
        self.replica.len()
    }

    pub fn layout(&self) -> Option<&DomainLayout> {
        self.layout.as_ref()
    }

    fn decompose(&mut self, node_grid: Int3D, cell_grid: Int3D) -> Result<(), LocalError> {
        let layout = DomainLayout::new(self.bc.box_l(), node_grid, cell_grid)?;
        debug!(
            rank = self.rank,
            cell_size = ?layout.cell_size(),
            "Storage decomposed."
        );
        self.layout = Some(layout);
        let particles = std::mem::take(&mut self.replica);
        self.owned.clear();
        self.index.clear();
        self.insert(particles);
        Ok(())
    }

    /// Adds a batch, keeping the particles whose folded position lies in this rank's
    /// domain. The batch is rejected as a whole if any id is already present.
    fn add(&mut self, system: ObjectId, particles: &[Particle]) -> Result<usize, LocalError> {
        self.check_batch(system, particles, true)?;
        let before = self.owned.len();
        self.insert(particles.iter().cloned());
        Ok(self.owned.len() - before)
    }

    /// Swaps in a new particle set. A rejected batch leaves the current one in place.
    fn replace(&mut self, system: ObjectId, particles: &[Particle]) -> Result<usize, LocalError> {
        self.check_batch(system, particles, false)?;
        self.owned.clear();
        self.replica.clear();
        self.index.clear();
        self.insert(particles.iter().cloned());
        Ok(self.owned.len())
    }

    fn check_batch(
        &self,
        system: ObjectId,
        particles: &[Particle],
        against_stored: bool,
    ) -> Result<(), LocalError> {
        if self.layout.is_none() {
            return Err(LocalError::NotDecomposed(system));
        }
        let mut batch = HashSet::with_capacity(particles.len());
        for p in particles {
            if (against_stored && self.index.contains_key(&p.id)) || !batch.insert(p.id) {
                return Err(LocalError::DuplicateParticle(p.id));
            }
        }
        Ok(())
    }

    fn insert(&mut self, particles: impl IntoIterator<Item = Particle>) {
        let Some(layout) = &self.layout else {
            return;
        };
        for mut p in particles {
            self.bc.fold_position(&mut p.position, &mut p.image);
            if layout.owner_of(&p.position) == self.rank {
                self.owned.push(p.clone());
            }
            self.index.insert(p.id, self.replica.len());
            self.replica.push(p);
        }
    }

    /// Copies the state of owned particles into the replica.
    fn sync_replica(&mut self) {
        for p in &self.owned {
            if let Some(&slot) = self.index.get(&p.id) {
                self.replica[slot] = p.clone();
            }
        }
    }

    /// Potential energy of all pairs whose lower-id member is owned by this rank.
    pub fn pair_energy(&self, table: &PotentialTable) -> f64 {
        let bc = &self.bc;
        let replica = &self.replica;
        let per_particle = |p: &Particle| -> f64 {
            replica
                .iter()
                .filter(|q| q.id > p.id)
                .filter_map(|q| {
                    let potential = table.get(p.type_id, q.type_id)?;
                    let d = bc.minimum_image_vector(&p.position, &q.position);
                    Some(potential.energy_sqr(d.norm_squared()))
                })
                .sum::<f64>()
        };

        #[cfg(not(feature = "parallel"))]
        let iterator = self.owned.iter();

        #[cfg(feature = "parallel")]
        let iterator = self.owned.par_iter();

        iterator.map(per_particle).sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct LocalIntegrator {
    system: ObjectId,
    time_step: f64,
    step: u64,
    thermostat: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy)]
struct LocalThermostat {
    system: ObjectId,
    params: LangevinParams,
}

#[derive(Debug)]
struct LocalInteraction {
    system: ObjectId,
    range: f64,
    potentials: PotentialTable,
}

/// Object registry of one rank. Ids come from the controller, so every rank stores the
/// same object under the same key.
pub struct LocalWorker {
    rank: Rank,
    propagator: Box<dyn Propagator>,
    systems: SecondaryMap<ObjectId, LocalSystem>,
    integrators: SecondaryMap<ObjectId, LocalIntegrator>,
    thermostats: SecondaryMap<ObjectId, LocalThermostat>,
    interactions: SecondaryMap<ObjectId, LocalInteraction>,
}

impl LocalWorker {
    pub fn new(rank: Rank, propagator: Box<dyn Propagator>) -> Self {
        Self {
            rank,
            propagator,
            systems: SecondaryMap::new(),
            integrators: SecondaryMap::new(),
            thermostats: SecondaryMap::new(),
            interactions: SecondaryMap::new(),
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn system(&self, id: ObjectId) -> Option<&LocalSystem> {
        self.systems.get(id)
    }

    fn is_taken(&self, id: ObjectId) -> bool {
        self.systems.contains_key(id)
            || self.integrators.contains_key(id)
            || self.thermostats.contains_key(id)
            || self.interactions.contains_key(id)
    }

    fn ensure_free(&self, id: ObjectId) -> Result<(), LocalError> {
        if self.is_taken(id) {
            Err(LocalError::DuplicateObject(id))
        } else {
            Ok(())
        }
    }

    fn system_mut(&mut self, id: ObjectId) -> Result<&mut LocalSystem, LocalError> {
        self.systems
            .get_mut(id)
            .ok_or_else(|| unknown(ObjectKind::System, id))
    }

    fn system_ref(&self, id: ObjectId) -> Result<&LocalSystem, LocalError> {
        self.systems
            .get(id)
            .ok_or_else(|| unknown(ObjectKind::System, id))
    }

    fn create_interaction(
        &mut self,
        id: ObjectId,
        system: ObjectId,
        range: f64,
    ) -> Result<(), LocalError> {
        self.ensure_free(id)?;
        let owner = self.system_ref(system)?;
        if let Some(layout) = owner.layout() {
            if !layout.supports_range(range) && self.rank == 0 {
                warn!(
                    range,
                    cell_size = ?layout.cell_size(),
                    "Cells are smaller than the interaction range."
                );
            }
        }
        self.interactions.insert(
            id,
            LocalInteraction {
                system,
                range,
                potentials: PotentialTable::new(),
            },
        );
        Ok(())
    }

    fn set_potential(
        &mut self,
        interaction: ObjectId,
        type_a: TypeId,
        type_b: TypeId,
        potential: LennardJones,
    ) -> Result<(), LocalError> {
        let entry = self
            .interactions
            .get_mut(interaction)
            .ok_or_else(|| unknown(ObjectKind::Interaction, interaction))?;
        if potential.cutoff() > entry.range {
            return Err(LocalError::CutoffExceedsRange {
                cutoff: potential.cutoff(),
                range: entry.range,
            });
        }
        entry.potentials.set(type_a, type_b, potential);
        Ok(())
    }

    fn add_interaction(&mut self, system: ObjectId, interaction: ObjectId) -> Result<(), LocalError> {
        let owner = self
            .interactions
            .get(interaction)
            .ok_or_else(|| unknown(ObjectKind::Interaction, interaction))?
            .system;
        if owner != system {
            return Err(LocalError::SystemMismatch {
                first: system,
                second: interaction,
            });
        }
        let target = self.system_mut(system)?;
        if !target.interactions.contains(&interaction) {
            target.interactions.push(interaction);
        }
        Ok(())
    }

    fn attach_thermostat(
        &mut self,
        integrator: ObjectId,
        thermostat: Option<ObjectId>,
    ) -> Result<(), LocalError> {
        let integrator_system = self
            .integrators
            .get(integrator)
            .ok_or_else(|| unknown(ObjectKind::Integrator, integrator))?
            .system;
        if let Some(t) = thermostat {
            let thermostat_system = self
                .thermostats
                .get(t)
                .ok_or_else(|| unknown(ObjectKind::Thermostat, t))?
                .system;
            if thermostat_system != integrator_system {
                return Err(LocalError::SystemMismatch {
                    first: integrator,
                    second: t,
                });
            }
        }
        if let Some(entry) = self.integrators.get_mut(integrator) {
            entry.thermostat = thermostat;
        }
        Ok(())
    }

    fn run(&mut self, integrator_id: ObjectId, steps: u64) -> Result<u64, LocalError> {
        let integrator = *self
            .integrators
            .get(integrator_id)
            .ok_or_else(|| unknown(ObjectKind::Integrator, integrator_id))?;
        let thermostat = match integrator.thermostat {
            Some(t) => Some(
                self.thermostats
                    .get(t)
                    .ok_or_else(|| unknown(ObjectKind::Thermostat, t))?
                    .params,
            ),
            None => None,
        };

        let system = self
            .systems
            .get_mut(integrator.system)
            .ok_or_else(|| unknown(ObjectKind::System, integrator.system))?;
        let potentials = system
            .interactions
            .iter()
            .filter_map(|id| self.interactions.get(*id))
            .map(|interaction| &interaction.potentials)
            .collect();

        self.propagator.advance(StepContext {
            rank: self.rank,
            particles: &mut system.owned,
            bc: &system.bc,
            potentials,
            time_step: integrator.time_step,
            first_step: integrator.step,
            steps,
            thermostat,
            rng: &mut system.rng,
        })?;
        system.sync_replica();

        let step = integrator.step + steps;
        if let Some(entry) = self.integrators.get_mut(integrator_id) {
            entry.step = step;
        }
        trace!(rank = self.rank, step, "Integrator advanced.");
        Ok(step)
    }

    fn compute_energy(&self, interaction: ObjectId) -> Result<f64, LocalError> {
        let entry = self
            .interactions
            .get(interaction)
            .ok_or_else(|| unknown(ObjectKind::Interaction, interaction))?;
        let system = self.system_ref(entry.system)?;
        Ok(system.pair_energy(&entry.potentials))
    }

    /// Drops an object along with every reference other objects hold to it. Unknown ids are
    /// ignored so that a release after a partially failed creation is harmless.
    fn release(&mut self, id: ObjectId) {
        if self.systems.remove(id).is_some() {
            self.integrators.retain(|_, i| i.system != id);
            self.thermostats.retain(|_, t| t.system != id);
            self.interactions.retain(|_, i| i.system != id);
        } else if self.thermostats.remove(id).is_some() {
            for (_, integrator) in self.integrators.iter_mut() {
                if integrator.thermostat == Some(id) {
                    integrator.thermostat = None;
                }
            }
        } else if self.interactions.remove(id).is_some() {
            for (_, system) in self.systems.iter_mut() {
                system.interactions.retain(|i| *i != id);
            }
        } else {
            self.integrators.remove(id);
        }
    }
}

impl Worker for LocalWorker {
    type Request = Request;
    type Response = Response;
    type Error = LocalError;

    fn handle(&mut self, request: Request) -> Result<Response, LocalError> {
        match request {
            Request::CreateSystem { id, setup } => {
                self.ensure_free(id)?;
                let system = LocalSystem::new(self.rank, setup)?;
                self.systems.insert(id, system);
                Ok(Response::Done)
            }
            Request::Decompose {
                system,
                node_grid,
                cell_grid,
            } => {
                self.system_mut(system)?.decompose(node_grid, cell_grid)?;
                Ok(Response::Done)
            }
            Request::AddParticles { system, particles } => {
                let kept = self.system_mut(system)?.add(system, &particles)?;
                Ok(Response::Count(kept))
            }
            Request::ReplaceParticles { system, particles } => {
                let kept = self.system_mut(system)?.replace(system, &particles)?;
                Ok(Response::Count(kept))
            }
            Request::CountParticles { system } => {
                Ok(Response::Count(self.system_ref(system)?.owned.len()))
            }
            Request::SnapshotParticles { system } => {
                Ok(Response::Particles(self.system_ref(system)?.owned.clone()))
            }
            Request::CreateIntegrator {
                id,
                system,
                time_step,
            } => {
                self.ensure_free(id)?;
                self.system_ref(system)?;
                self.integrators.insert(
                    id,
                    LocalIntegrator {
                        system,
                        time_step,
                        step: 0,
                        thermostat: None,
                    },
                );
                Ok(Response::Done)
            }
            Request::SetTimeStep {
                integrator,
                time_step,
            } => {
                self.integrators
                    .get_mut(integrator)
                    .ok_or_else(|| unknown(ObjectKind::Integrator, integrator))?
                    .time_step = time_step;
                Ok(Response::Done)
            }
            Request::CreateLangevin { id, system, params } => {
                self.ensure_free(id)?;
                self.system_ref(system)?;
                self.thermostats
                    .insert(id, LocalThermostat { system, params });
                Ok(Response::Done)
            }
            Request::SetLangevin { thermostat, params } => {
                self.thermostats
                    .get_mut(thermostat)
                    .ok_or_else(|| unknown(ObjectKind::Thermostat, thermostat))?
                    .params = params;
                Ok(Response::Done)
            }
            Request::AttachThermostat {
                integrator,
                thermostat,
            } => {
                self.attach_thermostat(integrator, thermostat)?;
                Ok(Response::Done)
            }
            Request::CreateInteraction { id, system, range } => {
                self.create_interaction(id, system, range)?;
                Ok(Response::Done)
            }
            Request::SetPotential {
                interaction,
                type_a,
                type_b,
                potential,
            } => {
                self.set_potential(interaction, type_a, type_b, potential)?;
                Ok(Response::Done)
            }
            Request::AddInteraction {
                system,
                interaction,
            } => {
                self.add_interaction(system, interaction)?;
                Ok(Response::Done)
            }
            Request::Run { integrator, steps } => Ok(Response::Step(self.run(integrator, steps)?)),
            Request::ComputeEnergy { interaction } => {
                Ok(Response::Energy(self.compute_energy(interaction)?))
            }
            Request::ComputeKinetic { system } => Ok(Response::Kinetic(
                KineticSums::from_particles(&self.system_ref(system)?.owned),
            )),
            Request::Release { id } => {
                self.release(id);
                Ok(Response::Done)
            }
        }
    }
}
