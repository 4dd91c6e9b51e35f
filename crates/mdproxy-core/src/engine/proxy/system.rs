use super::ensure_non_negative;
use super::interaction::LennardJonesInteraction;
use crate::core::bc::OrthorhombicBC;
use crate::core::decomp::DomainLayout;
use crate::core::lattice::random_particles;
use crate::core::models::grid::Int3D;
use crate::core::models::particle::Particle;
use crate::core::rng::SimRng;
use crate::engine::error::EngineError;
use crate::engine::protocol::{ObjectId, ObjectKind, Request, SystemSetup};
use crate::engine::session::Session;
use nalgebra::{Point3, Vector3};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument};

/// Handle to a simulation system distributed over all ranks of a session.
pub struct System {
    session: Arc<Session>,
    id: ObjectId,
    bc: OrthorhombicBC,
    skin: f64,
    rng: Mutex<SimRng>,
    layout: Mutex<Option<DomainLayout>>,
}

impl System {
    pub fn new(session: Arc<Session>, setup: SystemSetup) -> Result<Self, EngineError> {
        let skin = ensure_non_negative("skin", setup.skin)?;
        let bc = OrthorhombicBC::new(setup.box_l)?;
        let id = session.create(ObjectKind::System, |id| Request::CreateSystem { id, setup })?;
        Ok(Self {
            session,
            id,
            bc,
            skin,
            rng: Mutex::new(SimRng::new(setup.seed)),
            layout: Mutex::new(None),
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn bc(&self) -> &OrthorhombicBC {
        &self.bc
    }

    pub fn box_l(&self) -> Vector3<f64> {
        self.bc.box_l()
    }

    pub fn skin(&self) -> f64 {
        self.skin
    }

    /// The storage layout, once [`decompose`](Self::decompose) has run.
    pub fn layout(&self) -> Option<DomainLayout> {
        self.layout
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets up domain-decomposition storage. The node grid must account for every rank.
    #[instrument(skip(self), fields(system = ?self.id))]
    pub fn decompose(&self, node_grid: Int3D, cell_grid: Int3D) -> Result<(), EngineError> {
        if node_grid.product() != self.session.size() {
            return Err(EngineError::GridMismatch {
                grid: node_grid.to_string(),
                workers: self.session.size(),
            });
        }
        let layout = DomainLayout::new(self.box_l(), node_grid, cell_grid)?;
        self.session.call(Request::Decompose {
            system: self.id,
            node_grid,
            cell_grid,
        })?;
        *self.layout.lock().unwrap_or_else(PoisonError::into_inner) = Some(layout);
        Ok(())
    }

    pub fn add_particle(
        &self,
        id: usize,
        position: Point3<f64>,
    ) -> Result<(), EngineError> {
        self.add_particles(std::iter::once(Particle::new(id, position)))
            .map(|_| ())
    }

    /// Broadcasts particles to every rank. Returns how many were added; each one ends up
    /// owned by exactly one rank.
    pub fn add_particles(
        &self,
        particles: impl IntoIterator<Item = Particle>,
    ) -> Result<usize, EngineError> {
        let particles: Arc<[Particle]> = particles.into_iter().collect();
        let expected = particles.len();
        let kept = self.session.sum_counts(Request::AddParticles {
            system: self.id,
            particles,
        })?;
        if kept != expected {
            return Err(EngineError::Internal(format!(
                "{} particles were sent but {} are owned",
                expected, kept
            )));
        }
        debug!(system = ?self.id, added = expected, "Particles added.");
        Ok(expected)
    }

    /// Gathers every particle from its current owner and redistributes the set after
    /// folding positions back into the primary box.
    #[instrument(level = "debug", skip(self), fields(system = ?self.id))]
    pub fn resort(&self) -> Result<(), EngineError> {
        let particles: Arc<[Particle]> = self
            .session
            .gather_particles(Request::SnapshotParticles { system: self.id })?
            .into();
        let expected = particles.len();
        let kept = self.session.sum_counts(Request::ReplaceParticles {
            system: self.id,
            particles,
        })?;
        if kept != expected {
            return Err(EngineError::Internal(format!(
                "resort lost particles: {} gathered, {} owned afterwards",
                expected, kept
            )));
        }
        Ok(())
    }

    pub fn particle_count(&self) -> Result<usize, EngineError> {
        self.session
            .sum_counts(Request::CountParticles { system: self.id })
    }

    /// All particles, sorted by id.
    pub fn snapshot(&self) -> Result<Vec<Particle>, EngineError> {
        let mut particles = self
            .session
            .gather_particles(Request::SnapshotParticles { system: self.id })?;
        particles.sort_by_key(|p| p.id);
        Ok(particles)
    }

    /// Makes the interaction part of the forces seen by this system's integrators.
    pub fn add_interaction(
        &self,
        interaction: &LennardJonesInteraction<'_>,
    ) -> Result<(), EngineError> {
        self.session.call(Request::AddInteraction {
            system: self.id,
            interaction: interaction.id(),
        })
    }

    /// A uniformly random position inside the box, drawn from the system's generator.
    pub fn random_position(&self) -> Point3<f64> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.bc.random_position(&mut *rng)
    }

    /// `count` particles at random positions, ids starting at `first_id`.
    pub fn random_particles(&self, count: usize, first_id: usize) -> Vec<Particle> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        random_particles(count, first_id, &self.bc, &mut *rng)
    }
}

impl Drop for System {
    fn drop(&mut self) {
        self.session.release(self.id);
    }
}
