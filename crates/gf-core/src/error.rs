//! Error type shared by the gridflow crates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GfError {
    #[error("{what} is not finite ({value})")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal invariant broken: {0}")]
    Invariant(String),
}

impl GfError {
    /// Errors caused by caller input rather than by a defect.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, GfError::Invariant(_))
    }
}

pub type GfResult<T> = Result<T, GfError>;
