//! Error types for solver operations.

use gf_core::GfError;
use gf_model::ModelError;
use thiserror::Error;

use crate::method::CalculationMethod;

/// Errors raised while building or solving a segment network.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Network build error: {what}")]
    Build { what: String },

    #[error("Singular system: {what}")]
    Singular { what: String },

    #[error("Calculation method {method} is not supported by this solver factory")]
    Unsupported { method: CalculationMethod },

    #[error("Unknown calculation method: {name}")]
    UnknownMethod { name: String },

    #[error("{entity} refers to bus {bus} which is not part of the network")]
    UnknownBus { entity: String, bus: String },

    #[error("Export error: {what}")]
    Export { what: String },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for GfError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Unsupported { .. } | SolverError::UnknownMethod { .. } => {
                GfError::InvalidArgument(e.to_string())
            }
            SolverError::Model(model) => model.into(),
            other => GfError::Invariant(other.to_string()),
        }
    }
}
