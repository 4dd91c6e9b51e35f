use super::ensure_positive;
use super::langevin::Langevin;
use super::system::System;
use crate::engine::error::EngineError;
use crate::engine::protocol::{ObjectId, ObjectKind, Request};
use tracing::{debug, instrument};

/// Handle to a velocity-Verlet integrator living on every rank.
///
/// The proxy does no integration itself: `run` is forwarded to the ranks, which advance
/// their own particles, and the system is resorted afterwards so that every particle is
/// owned by the rank whose domain contains it.
pub struct VelocityVerlet<'a> {
    system: &'a System,
    id: ObjectId,
    time_step: f64,
    step: u64,
    thermostat: Option<ObjectId>,
}

impl<'a> VelocityVerlet<'a> {
    /// Time step a freshly created integrator uses when none is given.
    pub const DEFAULT_TIME_STEP: f64 = 0.001;

    pub fn new(system: &'a System, time_step: f64) -> Result<Self, EngineError> {
        let time_step = ensure_positive("time_step", time_step)?;
        let id = system
            .session()
            .create(ObjectKind::Integrator, |id| Request::CreateIntegrator {
                id,
                system: system.id(),
                time_step,
            })?;
        Ok(Self {
            system,
            id,
            time_step,
            step: 0,
            thermostat: None,
        })
    }

    pub fn with_default_time_step(system: &'a System) -> Result<Self, EngineError> {
        Self::new(system, Self::DEFAULT_TIME_STEP)
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn system(&self) -> &'a System {
        self.system
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn set_time_step(&mut self, time_step: f64) -> Result<(), EngineError> {
        let time_step = ensure_positive("time_step", time_step)?;
        self.system.session().call(Request::SetTimeStep {
            integrator: self.id,
            time_step,
        })?;
        self.time_step = time_step;
        Ok(())
    }

    /// Number of steps performed since creation.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn thermostat(&self) -> Option<ObjectId> {
        self.thermostat
    }

    /// Attaches a thermostat, or detaches the current one with `None`.
    pub fn set_thermostat(
        &mut self,
        thermostat: Option<&Langevin<'a>>,
    ) -> Result<(), EngineError> {
        let thermostat = thermostat.map(Langevin::id);
        self.system.session().call(Request::AttachThermostat {
            integrator: self.id,
            thermostat,
        })?;
        self.thermostat = thermostat;
        Ok(())
    }

    /// Advances the system by `steps` time steps.
    #[instrument(level = "debug", skip(self), fields(integrator = ?self.id, from = self.step))]
    pub fn run(&mut self, steps: u64) -> Result<(), EngineError> {
        let step = self.system.session().agreed_step(Request::Run {
            integrator: self.id,
            steps,
        })?;
        self.step = step;
        self.system.resort()?;
        debug!(step, "Run finished.");
        Ok(())
    }
}

impl Drop for VelocityVerlet<'_> {
    fn drop(&mut self) {
        self.system.session().release(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decomp::{cell_grid, node_grid};
    use crate::core::lattice::perturbed_lattice;
    use crate::core::models::particle::Particle;
    use crate::engine::local::LocalError;
    use crate::engine::propagator::{Propagator, StepContext};
    use crate::engine::protocol::SystemSetup;
    use crate::engine::session::Session;
    use nalgebra::Vector3;
    use std::sync::Arc;

    fn setup() -> SystemSetup {
        SystemSetup {
            box_l: Vector3::new(10.0, 10.0, 10.0),
            skin: 0.3,
            seed: 9,
        }
    }

    fn populate(system: &System, per_side: usize) {
        let nodes = node_grid(system.session().size());
        system
            .decompose(nodes, cell_grid(&system.box_l(), &nodes, 2.8))
            .unwrap();
        system
            .add_particles(perturbed_lattice(per_side, &system.box_l()))
            .unwrap();
    }

    /// Moves every particle along its velocity and shifts it by one box length along z,
    /// so that resorting has to fold it back.
    struct Drift;

    impl Propagator for Drift {
        fn advance(&mut self, ctx: StepContext<'_>) -> Result<(), LocalError> {
            let elapsed = ctx.time_step * ctx.steps as f64;
            for p in ctx.particles.iter_mut() {
                p.position += p.velocity * elapsed;
                p.position.z += ctx.bc.box_l().z;
            }
            Ok(())
        }
    }

    struct FailOnRank(usize);

    impl Propagator for FailOnRank {
        fn advance(&mut self, ctx: StepContext<'_>) -> Result<(), LocalError> {
            if ctx.rank == self.0 {
                Err(LocalError::Propagation("blew up".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn run_accumulates_steps() {
        let system = System::new(Session::start(2).unwrap(), setup()).unwrap();
        populate(&system, 4);
        let mut integrator = VelocityVerlet::new(&system, 0.005).unwrap();
        integrator.run(20).unwrap();
        integrator.run(20).unwrap();
        assert_eq!(integrator.step(), 40);
        assert_eq!(system.particle_count().unwrap(), 64);
    }

    #[test]
    fn time_step_is_validated() {
        let system = System::new(Session::start(1).unwrap(), setup()).unwrap();
        let mut integrator = VelocityVerlet::with_default_time_step(&system).unwrap();
        assert_eq!(integrator.time_step(), 0.001);
        integrator.set_time_step(0.005).unwrap();
        assert_eq!(integrator.time_step(), 0.005);
        assert!(integrator.set_time_step(-0.1).is_err());
        assert!(integrator.set_time_step(f64::INFINITY).is_err());
        assert_eq!(integrator.time_step(), 0.005);
    }

    #[test]
    fn resort_after_run_refolds_and_migrates() {
        let session = Session::start_with(3, |_| Box::new(Drift)).unwrap();
        let system = System::new(session, setup()).unwrap();
        let nodes = node_grid(3);
        system
            .decompose(nodes, cell_grid(&system.box_l(), &nodes, 2.8))
            .unwrap();
        system
            .add_particles([
                Particle::new(0, [1.0, 1.0, 1.0].into())
                    .with_velocity(Vector3::new(0.0, 0.0, 100.0)),
                Particle::new(1, [5.0, 5.0, 5.0].into()),
            ])
            .unwrap();

        let mut integrator = VelocityVerlet::new(&system, 0.01).unwrap();
        integrator.run(5).unwrap();

        let snapshot = system.snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
        // 1 + 100 * 0.05 + 10 = 16, folded to 6 with one box crossing.
        assert!((snapshot[0].position.z - 6.0).abs() < 1e-9);
        assert_eq!(snapshot[0].image.z, 1);
        assert!((snapshot[1].position.z - 5.0).abs() < 1e-9);
        assert_eq!(system.particle_count().unwrap(), 2);
    }

    #[test]
    fn thermostat_can_be_attached_and_detached() {
        let system = System::new(Session::start(2).unwrap(), setup()).unwrap();
        populate(&system, 3);
        let mut integrator = VelocityVerlet::new(&system, 0.005).unwrap();
        let mut thermostat = Langevin::new(&system).unwrap();
        thermostat.set_gamma(1.0).unwrap();
        thermostat.set_temperature(4.0).unwrap();

        integrator.set_thermostat(Some(&thermostat)).unwrap();
        assert_eq!(integrator.thermostat(), Some(thermostat.id()));
        integrator.run(10).unwrap();

        integrator.set_thermostat(None).unwrap();
        assert_eq!(integrator.thermostat(), None);
        integrator.run(10).unwrap();
        assert_eq!(integrator.step(), 20);
    }

    #[test]
    fn failing_rank_is_reported_and_pool_survives() {
        let session: Arc<Session> = Session::start_with(3, |_| Box::new(FailOnRank(1))).unwrap();
        let system = System::new(session, setup()).unwrap();
        populate(&system, 3);
        let mut integrator = VelocityVerlet::new(&system, 0.005).unwrap();

        let err = integrator.run(1).unwrap_err();
        match err {
            EngineError::Pmi { source } => assert_eq!(source.rank(), Some(1)),
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(integrator.step(), 0);
        assert_eq!(system.particle_count().unwrap(), 27);
    }
}
