use crate::core::models::ids::TypeId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SystemConfig {
    pub box_l: [f64; 3],
    pub skin: f64,
    pub seed: u64,
}

/// Where the initial particle set comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleSource {
    /// `per_side³` particles on a perturbed cubic lattice.
    Lattice { per_side: usize },
    /// `count` particles at uniformly random positions.
    Random { count: usize },
    /// Particles (and box) read from an XYZ snapshot.
    Snapshot { path: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairPotentialConfig {
    pub type_a: TypeId,
    pub type_b: TypeId,
    pub epsilon: f64,
    pub sigma: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionConfig {
    /// Pair cutoff; the neighbor range adds the system skin on top.
    pub cutoff: f64,
    pub potentials: Vec<PairPotentialConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermostatConfig {
    pub gamma: f64,
    pub temperature: f64,
}

/// One phase of the run schedule: `blocks` integration blocks of `steps_per_block` steps,
/// sampled after every block.
#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub name: String,
    pub blocks: usize,
    pub steps_per_block: u64,
    pub thermostat: Option<ThermostatConfig>,
}

impl StageConfig {
    pub fn total_steps(&self) -> u64 {
        self.blocks as u64 * self.steps_per_block
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub system: SystemConfig,
    pub workers: usize,
    pub particles: ParticleSource,
    pub interaction: InteractionConfig,
    pub time_step: f64,
    pub schedule: Vec<StageConfig>,
    pub snapshot_path: Option<PathBuf>,
}

impl SimulationConfig {
    pub fn total_steps(&self) -> u64 {
        self.schedule.iter().map(StageConfig::total_steps).sum()
    }
}

#[derive(Default)]
pub struct SimulationConfigBuilder {
    box_l: Option<[f64; 3]>,
    skin: Option<f64>,
    seed: Option<u64>,
    workers: Option<usize>,
    particles: Option<ParticleSource>,
    cutoff: Option<f64>,
    potentials: Vec<PairPotentialConfig>,
    time_step: Option<f64>,
    schedule: Vec<StageConfig>,
    snapshot_path: Option<PathBuf>,
}

impl SimulationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn box_l(mut self, box_l: [f64; 3]) -> Self {
        self.box_l = Some(box_l);
        self
    }
    pub fn skin(mut self, skin: f64) -> Self {
        self.skin = Some(skin);
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
    pub fn particles(mut self, source: ParticleSource) -> Self {
        self.particles = Some(source);
        self
    }
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn potential(mut self, potential: PairPotentialConfig) -> Self {
        self.potentials.push(potential);
        self
    }
    pub fn potentials(mut self, potentials: Vec<PairPotentialConfig>) -> Self {
        self.potentials = potentials;
        self
    }
    pub fn time_step(mut self, dt: f64) -> Self {
        self.time_step = Some(dt);
        self
    }
    pub fn stage(mut self, stage: StageConfig) -> Self {
        self.schedule.push(stage);
        self
    }
    pub fn schedule(mut self, schedule: Vec<StageConfig>) -> Self {
        self.schedule = schedule;
        self
    }
    pub fn snapshot_path(mut self, path: Option<PathBuf>) -> Self {
        self.snapshot_path = path;
        self
    }

    pub fn build(self) -> Result<SimulationConfig, ConfigError> {
        let system = SystemConfig {
            box_l: self.box_l.ok_or(ConfigError::MissingParameter("box_l"))?,
            skin: self.skin.ok_or(ConfigError::MissingParameter("skin"))?,
            seed: self.seed.ok_or(ConfigError::MissingParameter("seed"))?,
        };
        let interaction = InteractionConfig {
            cutoff: self.cutoff.ok_or(ConfigError::MissingParameter("cutoff"))?,
            potentials: self.potentials,
        };
        let config = SimulationConfig {
            system,
            workers: self.workers.ok_or(ConfigError::MissingParameter("workers"))?,
            particles: self
                .particles
                .ok_or(ConfigError::MissingParameter("particles"))?,
            interaction,
            time_step: self
                .time_step
                .ok_or(ConfigError::MissingParameter("time_step"))?,
            schedule: self.schedule,
            snapshot_path: self.snapshot_path,
        };
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &SimulationConfig) -> Result<(), ConfigError> {
    if config.workers == 0 {
        return Err(invalid("workers", "at least one worker is required"));
    }
    if let Some(l) = config.system.box_l.iter().find(|l| !l.is_finite() || **l <= 0.0) {
        return Err(invalid("box_l", format!("box lengths must be positive, got {}", l)));
    }
    if !config.system.skin.is_finite() || config.system.skin < 0.0 {
        return Err(invalid(
            "skin",
            format!("must be non-negative, got {}", config.system.skin),
        ));
    }
    if !config.interaction.cutoff.is_finite() || config.interaction.cutoff <= 0.0 {
        return Err(invalid(
            "cutoff",
            format!("must be positive, got {}", config.interaction.cutoff),
        ));
    }
    if !config.time_step.is_finite() || config.time_step <= 0.0 {
        return Err(invalid(
            "time_step",
            format!("must be positive, got {}", config.time_step),
        ));
    }
    match &config.particles {
        ParticleSource::Lattice { per_side: 0 } | ParticleSource::Random { count: 0 } => {
            return Err(invalid("particles", "the particle source is empty"));
        }
        _ => {}
    }
    for stage in &config.schedule {
        if let Some(thermostat) = &stage.thermostat {
            if thermostat.gamma < 0.0 || thermostat.temperature < 0.0 {
                return Err(invalid(
                    "thermostat",
                    format!(
                        "stage '{}' needs non-negative gamma and temperature",
                        stage.name
                    ),
                ));
            }
        }
    }
    Ok(())
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.into(),
    }
}
