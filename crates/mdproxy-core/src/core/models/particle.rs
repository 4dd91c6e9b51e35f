use super::ids::{ParticleId, TypeId};
use nalgebra::{Point3, Vector3};

/// A point particle as stored by the domain-decomposition backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub type_id: TypeId,
    pub mass: f64,
    pub position: Point3<f64>,
    pub velocity: Vector3<f64>,
    /// Number of box lengths the particle has been folded by along each axis.
    pub image: Vector3<i32>,
}

impl Particle {
    /// Creates a particle of type 0 and unit mass at rest.
    pub fn new(id: usize, position: Point3<f64>) -> Self {
        Self {
            id: ParticleId(id),
            type_id: 0,
            mass: 1.0,
            position,
            velocity: Vector3::zeros(),
            image: Vector3::zeros(),
        }
    }

    pub fn with_type(mut self, type_id: TypeId) -> Self {
        self.type_id = type_id;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.velocity = velocity;
        self
    }

    /// Twice the kinetic energy, `m v²`.
    #[inline]
    pub fn mv2(&self) -> f64 {
        self.mass * self.velocity.norm_squared()
    }
}
