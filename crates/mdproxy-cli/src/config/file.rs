use crate::error::{CliError, Result};
use mdproxy::engine::config as core_config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub workers: Option<usize>,
    pub time_step: Option<f64>,
    pub snapshot_out: Option<PathBuf>,
    pub system: Option<FileSystemConfig>,
    pub particles: Option<FileParticleSource>,
    pub interaction: Option<FileInteractionConfig>,
    pub stages: Option<Vec<FileStageConfig>>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSystemConfig {
    /// One value for a cube, three for x, y and z.
    #[serde(rename = "box")]
    pub box_l: Option<Vec<f64>>,
    pub skin: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case",
    tag = "type"
)]
pub enum FileParticleSource {
    Lattice { per_side: usize },
    Random { count: usize },
    Snapshot { path: PathBuf },
}

impl From<FileParticleSource> for core_config::ParticleSource {
    fn from(p: FileParticleSource) -> Self {
        match p {
            FileParticleSource::Lattice { per_side } => Self::Lattice { per_side },
            FileParticleSource::Random { count } => Self::Random { count },
            FileParticleSource::Snapshot { path } => Self::Snapshot { path },
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileInteractionConfig {
    pub cutoff: Option<f64>,
    pub potentials: Option<Vec<FilePairPotential>>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FilePairPotential {
    pub type_a: usize,
    pub type_b: usize,
    pub epsilon: f64,
    pub sigma: f64,
}

impl From<FilePairPotential> for core_config::PairPotentialConfig {
    fn from(p: FilePairPotential) -> Self {
        Self {
            type_a: p.type_a,
            type_b: p.type_b,
            epsilon: p.epsilon,
            sigma: p.sigma,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileStageConfig {
    pub name: String,
    pub blocks: usize,
    pub steps_per_block: Option<u64>,
    pub thermostat: Option<FileThermostatConfig>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct FileThermostatConfig {
    pub gamma: f64,
    pub temperature: f64,
}

impl From<FileThermostatConfig> for core_config::ThermostatConfig {
    fn from(t: FileThermostatConfig) -> Self {
        Self {
            gamma: t.gamma,
            temperature: t.temperature,
        }
    }
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
