use crate::core::analysis::KineticSums;
use crate::core::forcefield::potentials::LennardJones;
use crate::core::models::grid::Int3D;
use crate::core::models::ids::TypeId;
use crate::core::models::particle::Particle;
use nalgebra::Vector3;
use slotmap::new_key_type;
use std::fmt;
use std::sync::Arc;

new_key_type! {
    /// Identifier of a remote object, allocated by the controller and shared by all ranks.
    pub struct ObjectId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    System,
    Integrator,
    Thermostat,
    Interaction,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::System => "system",
            ObjectKind::Integrator => "integrator",
            ObjectKind::Thermostat => "thermostat",
            ObjectKind::Interaction => "interaction",
        };
        f.write_str(name)
    }
}

/// Construction parameters of a system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSetup {
    pub box_l: Vector3<f64>,
    pub skin: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LangevinParams {
    pub gamma: f64,
    pub temperature: f64,
}

/// Everything a controller can ask of a rank.
#[derive(Debug, Clone)]
pub enum Request {
    CreateSystem {
        id: ObjectId,
        setup: SystemSetup,
    },
    Decompose {
        system: ObjectId,
        node_grid: Int3D,
        cell_grid: Int3D,
    },
    /// Broadcast of new particles; each rank keeps the ones inside its domain.
    AddParticles {
        system: ObjectId,
        particles: Arc<[Particle]>,
    },
    /// Replaces the full particle set, redistributing ownership.
    ReplaceParticles {
        system: ObjectId,
        particles: Arc<[Particle]>,
    },
    CountParticles {
        system: ObjectId,
    },
    SnapshotParticles {
        system: ObjectId,
    },
    CreateIntegrator {
        id: ObjectId,
        system: ObjectId,
        time_step: f64,
    },
    SetTimeStep {
        integrator: ObjectId,
        time_step: f64,
    },
    CreateLangevin {
        id: ObjectId,
        system: ObjectId,
        params: LangevinParams,
    },
    SetLangevin {
        thermostat: ObjectId,
        params: LangevinParams,
    },
    AttachThermostat {
        integrator: ObjectId,
        thermostat: Option<ObjectId>,
    },
    CreateInteraction {
        id: ObjectId,
        system: ObjectId,
        range: f64,
    },
    SetPotential {
        interaction: ObjectId,
        type_a: TypeId,
        type_b: TypeId,
        potential: LennardJones,
    },
    AddInteraction {
        system: ObjectId,
        interaction: ObjectId,
    },
    Run {
        integrator: ObjectId,
        steps: u64,
    },
    ComputeEnergy {
        interaction: ObjectId,
    },
    ComputeKinetic {
        system: ObjectId,
    },
    Release {
        id: ObjectId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Done,
    Count(usize),
    Particles(Vec<Particle>),
    Energy(f64),
    Kinetic(KineticSums),
    Step(u64),
}
