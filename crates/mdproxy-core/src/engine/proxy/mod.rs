//! Controller-side handles to objects living on the worker ranks.
//!
//! Every proxy except [`System`] borrows the system it was created for, so a system
//! always outlives its integrators, thermostats and interactions. Dropping a proxy
//! releases its remote counterpart.

mod integrator;
mod interaction;
mod langevin;
mod system;
mod temperature;

pub use integrator::VelocityVerlet;
pub use interaction::LennardJonesInteraction;
pub use langevin::Langevin;
pub use system::System;
pub use temperature::Temperature;

use super::error::EngineError;

fn ensure_positive(name: &'static str, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EngineError::InvalidParameter { name, value })
    }
}

fn ensure_non_negative(name: &'static str, value: f64) -> Result<f64, EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EngineError::InvalidParameter { name, value })
    }
}
