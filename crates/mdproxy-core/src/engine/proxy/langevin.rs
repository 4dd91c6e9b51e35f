use super::ensure_non_negative;
use super::system::System;
use crate::engine::error::EngineError;
use crate::engine::protocol::{LangevinParams, ObjectId, ObjectKind, Request};

/// Handle to a Langevin thermostat. Both parameters start at zero.
pub struct Langevin<'a> {
    system: &'a System,
    id: ObjectId,
    params: LangevinParams,
}

impl<'a> Langevin<'a> {
    pub fn new(system: &'a System) -> Result<Self, EngineError> {
        let params = LangevinParams::default();
        let id = system
            .session()
            .create(ObjectKind::Thermostat, |id| Request::CreateLangevin {
                id,
                system: system.id(),
                params,
            })?;
        Ok(Self { system, id, params })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn system(&self) -> &'a System {
        self.system
    }

    /// Friction coefficient.
    pub fn gamma(&self) -> f64 {
        self.params.gamma
    }

    pub fn set_gamma(&mut self, gamma: f64) -> Result<(), EngineError> {
        let gamma = ensure_non_negative("gamma", gamma)?;
        self.push(LangevinParams {
            gamma,
            ..self.params
        })
    }

    /// Target temperature.
    pub fn temperature(&self) -> f64 {
        self.params.temperature
    }

    pub fn set_temperature(&mut self, temperature: f64) -> Result<(), EngineError> {
        let temperature = ensure_non_negative("temperature", temperature)?;
        self.push(LangevinParams {
            temperature,
            ..self.params
        })
    }

    fn push(&mut self, params: LangevinParams) -> Result<(), EngineError> {
        self.system.session().call(Request::SetLangevin {
            thermostat: self.id,
            params,
        })?;
        self.params = params;
        Ok(())
    }
}

impl Drop for Langevin<'_> {
    fn drop(&mut self) {
        self.system.session().release(self.id);
    }
}
