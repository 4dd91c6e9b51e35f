use super::system::System;
use crate::core::analysis::KineticSums;
use crate::engine::error::EngineError;
use crate::engine::protocol::Request;

/// Instantaneous temperature of a system, reduced over all ranks.
pub struct Temperature<'a> {
    system: &'a System,
}

impl<'a> Temperature<'a> {
    pub fn new(system: &'a System) -> Self {
        Self { system }
    }

    /// Sum of `m v²` and the particle count over every rank.
    pub fn kinetic_sums(&self) -> Result<KineticSums, EngineError> {
        self.system.session().sum_kinetic(Request::ComputeKinetic {
            system: self.system.id(),
        })
    }

    /// `Σ m v² / (3 N)`, or 0 for an empty system.
    pub fn compute(&self) -> Result<f64, EngineError> {
        Ok(self.kinetic_sums()?.temperature())
    }
}
