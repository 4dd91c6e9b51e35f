use super::config::ConfigError;
use super::local::LocalError;
use crate::core::bc::BoundaryError;
use crate::core::decomp::DecompositionError;
use crate::core::forcefield::potentials::PotentialError;
use crate::core::io::xyz::XyzError;
use crate::pmi::PmiError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid value for '{name}': {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Invalid simulation box: {source}")]
    Boundary {
        #[from]
        source: BoundaryError,
    },

    #[error("Invalid pair potential: {source}")]
    Potential {
        #[from]
        source: PotentialError,
    },

    #[error("Domain decomposition error: {source}")]
    Decomposition {
        #[from]
        source: DecompositionError,
    },

    #[error("Node grid {grid} does not match the {workers} worker(s) of the session")]
    GridMismatch { grid: String, workers: usize },

    #[error("Worker pool error: {source}")]
    Pmi {
        #[from]
        source: PmiError<LocalError>,
    },

    #[error("Snapshot file '{path}': {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: XyzError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
