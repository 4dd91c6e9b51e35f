use super::error::EngineError;
use super::local::LocalWorker;
use super::propagator::{HoldPositions, Propagator};
use super::protocol::{ObjectId, ObjectKind, Request, Response};
use crate::core::analysis::KineticSums;
use crate::core::models::particle::Particle;
use crate::pmi::{Controller, Rank};
use slotmap::SlotMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A running worker pool together with the registry of objects created on it.
///
/// Proxies hold an `Arc<Session>` and address their remote counterparts by [`ObjectId`].
pub struct Session {
    pmi: Controller<LocalWorker>,
    registry: Mutex<SlotMap<ObjectId, ObjectKind>>,
}

impl Session {
    /// Starts `workers` ranks whose integrators only advance the clock.
    pub fn start(workers: usize) -> Result<Arc<Self>, EngineError> {
        Self::start_with(workers, |_| Box::new(HoldPositions))
    }

    /// Starts `workers` ranks, building each rank's propagator with `propagator`.
    pub fn start_with<F>(workers: usize, mut propagator: F) -> Result<Arc<Self>, EngineError>
    where
        F: FnMut(Rank) -> Box<dyn Propagator>,
    {
        let pmi = Controller::spawn(workers, |rank| LocalWorker::new(rank, propagator(rank)))?;
        info!(workers, "Session started.");
        Ok(Arc::new(Self {
            pmi,
            registry: Mutex::new(SlotMap::with_key()),
        }))
    }

    /// Number of worker ranks.
    pub fn size(&self) -> usize {
        self.pmi.size()
    }

    /// Number of objects currently alive on the workers.
    pub fn live_objects(&self) -> usize {
        self.registry().len()
    }

    pub fn kind_of(&self, id: ObjectId) -> Option<ObjectKind> {
        self.registry().get(id).copied()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, SlotMap<ObjectId, ObjectKind>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocates an id and creates the object on every rank. On failure the id is
    /// released again so no rank keeps a half-created object.
    pub(crate) fn create<F>(&self, kind: ObjectKind, request: F) -> Result<ObjectId, EngineError>
    where
        F: FnOnce(ObjectId) -> Request,
    {
        let id = self.registry().insert(kind);
        match self.pmi.call(request(id)) {
            Ok(()) => {
                debug!(%kind, ?id, "Remote object created.");
                Ok(id)
            }
            Err(err) => {
                self.release(id);
                Err(err.into())
            }
        }
    }

    /// Destroys the object on every rank. Failures are logged, not returned, since this
    /// runs from `Drop`.
    pub(crate) fn release(&self, id: ObjectId) {
        if let Err(err) = self.pmi.call(Request::Release { id }) {
            warn!(?id, error = %err, "Failed to release remote object.");
        }
        self.registry().remove(id);
    }

    pub(crate) fn call(&self, request: Request) -> Result<(), EngineError> {
        Ok(self.pmi.call(request)?)
    }

    pub(crate) fn invoke(&self, request: Request) -> Result<Vec<Response>, EngineError> {
        Ok(self.pmi.invoke(request)?)
    }

    /// Sums the per-rank counts of a request answered with [`Response::Count`].
    pub(crate) fn sum_counts(&self, request: Request) -> Result<usize, EngineError> {
        self.invoke(request)?
            .into_iter()
            .map(Response::into_count)
            .sum()
    }

    pub(crate) fn sum_energies(&self, request: Request) -> Result<f64, EngineError> {
        self.invoke(request)?
            .into_iter()
            .map(Response::into_energy)
            .sum()
    }

    pub(crate) fn sum_kinetic(&self, request: Request) -> Result<KineticSums, EngineError> {
        self.invoke(request)?
            .into_iter()
            .map(Response::into_kinetic)
            .sum()
    }

    pub(crate) fn gather_particles(&self, request: Request) -> Result<Vec<Particle>, EngineError> {
        let mut all = Vec::new();
        for response in self.invoke(request)? {
            all.extend(response.into_particles()?);
        }
        Ok(all)
    }

    /// Step counter after a run; every rank must agree on it.
    pub(crate) fn agreed_step(&self, request: Request) -> Result<u64, EngineError> {
        let mut agreed = None;
        for response in self.invoke(request)? {
            let step = response.into_step()?;
            match agreed {
                None => agreed = Some(step),
                Some(prev) if prev != step => {
                    return Err(EngineError::Internal(format!(
                        "ranks disagree on the step counter ({} vs {})",
                        prev, step
                    )));
                }
                Some(_) => {}
            }
        }
        agreed.ok_or_else(|| EngineError::Internal("no rank answered the run request".into()))
    }
}

fn unexpected(expected: &str, got: &Response) -> EngineError {
    EngineError::Internal(format!("expected a {} reply, got {:?}", expected, got))
}

impl Response {
    fn into_count(self) -> Result<usize, EngineError> {
        match self {
            Response::Count(n) => Ok(n),
            other => Err(unexpected("count", &other)),
        }
    }

    fn into_energy(self) -> Result<f64, EngineError> {
        match self {
            Response::Energy(e) => Ok(e),
            other => Err(unexpected("energy", &other)),
        }
    }

    fn into_kinetic(self) -> Result<KineticSums, EngineError> {
        match self {
            Response::Kinetic(k) => Ok(k),
            other => Err(unexpected("kinetic", &other)),
        }
    }

    fn into_particles(self) -> Result<Vec<Particle>, EngineError> {
        match self {
            Response::Particles(p) => Ok(p),
            other => Err(unexpected("particles", &other)),
        }
    }

    fn into_step(self) -> Result<u64, EngineError> {
        match self {
            Response::Step(s) => Ok(s),
            other => Err(unexpected("step", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::local::LocalError;
    use crate::engine::protocol::SystemSetup;
    use crate::pmi::PmiError;
    use nalgebra::Vector3;

    fn setup(box_len: f64) -> SystemSetup {
        SystemSetup {
            box_l: Vector3::new(box_len, box_len, box_len),
            skin: 0.3,
            seed: 1,
        }
    }

    #[test]
    fn zero_workers_is_an_error() {
        assert!(matches!(
            Session::start(0),
            Err(EngineError::Pmi {
                source: PmiError::EmptyPool
            })
        ));
    }

    #[test]
    fn create_registers_and_release_forgets() {
        let session = Session::start(2).unwrap();
        let id = session
            .create(ObjectKind::System, |id| Request::CreateSystem {
                id,
                setup: setup(5.0),
            })
            .unwrap();
        assert_eq!(session.kind_of(id), Some(ObjectKind::System));
        assert_eq!(session.live_objects(), 1);

        session.release(id);
        assert_eq!(session.live_objects(), 0);
        assert_eq!(session.kind_of(id), None);
    }

    #[test]
    fn failed_creation_leaves_no_object_behind() {
        let session = Session::start(3).unwrap();
        let err = session
            .create(ObjectKind::System, |id| Request::CreateSystem {
                id,
                setup: setup(-1.0),
            })
            .unwrap_err();
        match err {
            EngineError::Pmi {
                source: PmiError::Remote { rank, source },
            } => {
                assert_eq!(rank, 0);
                assert!(matches!(source, LocalError::Boundary(_)));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(session.live_objects(), 0);
    }

    #[test]
    fn mismatched_replies_are_internal_errors() {
        let session = Session::start(1).unwrap();
        let id = session
            .create(ObjectKind::System, |id| Request::CreateSystem {
                id,
                setup: setup(5.0),
            })
            .unwrap();
        let err = session
            .sum_energies(Request::CountParticles { system: id })
            .unwrap_err();
        assert!(matches!(err, EngineError::Internal(_)));
    }
}
