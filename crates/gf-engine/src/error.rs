//! Error types for the gf-engine orchestration layer.

use std::path::PathBuf;

use gf_model::ModelError;
use gf_solver::SolverError;

/// Orchestration-level errors. Per-segment failures are not errors; they are
/// reported as segment statuses in the round report.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Worker pool has been shut down")]
    PoolShutDown,

    #[error("Worker slot {slot} is no longer running")]
    SlotUnavailable { slot: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
