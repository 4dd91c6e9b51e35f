use super::worker::Rank;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PmiError<E: std::error::Error + 'static> {
    #[error("Cannot start a worker pool with zero workers")]
    EmptyPool,

    #[error("Failed to spawn worker {rank}: {source}")]
    Spawn {
        rank: Rank,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker {rank} disconnected")]
    Disconnected { rank: Rank },

    #[error("Worker {rank} failed: {source}")]
    Remote {
        rank: Rank,
        #[source]
        source: E,
    },
}

impl<E: std::error::Error + 'static> PmiError<E> {
    /// Rank the failure originated from, if it is tied to one.
    pub fn rank(&self) -> Option<Rank> {
        match self {
            PmiError::EmptyPool => None,
            PmiError::Spawn { rank, .. }
            | PmiError::Disconnected { rank }
            | PmiError::Remote { rank, .. } => Some(*rank),
        }
    }
}
