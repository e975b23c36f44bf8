//! Model-specific error types.

use gf_core::GfError;
use thiserror::Error;

/// Model construction, validation and file errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Two entities of the same kind share a name.
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    /// An edge or injection refers to a bus that doesn't exist.
    #[error("{kind} {entity} refers to non-existent bus {bus}")]
    UnknownBus {
        kind: &'static str,
        entity: String,
        bus: String,
    },

    /// An edge connects a bus to itself.
    #[error("{kind} {name} connects bus {bus} to itself")]
    SelfLoop {
        kind: &'static str,
        name: String,
        bus: String,
    },

    /// A numeric parameter is NaN or infinite.
    #[error("{kind} {name}: {source}")]
    NonFinite {
        kind: &'static str,
        name: String,
        source: GfError,
    },

    /// A snapshot list must contain at least one index.
    #[error("Snapshot list is empty")]
    EmptySnapshots,

    /// A segmentation result doesn't partition the input buses.
    #[error("Malformed partition: {what}")]
    Partition { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl From<ModelError> for GfError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::NonFinite { source, .. } => source,
            ModelError::Partition { .. } => GfError::Invariant(err.to_string()),
            other => GfError::InvalidArgument(other.to_string()),
        }
    }
}
