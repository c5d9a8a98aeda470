//! Errors raised by the HELM engine.
//!
//! Only malformed input ends a solve with `Err`. Numerical trouble during the
//! coefficient recurrence is reported through
//! [`Termination::PrecisionExhausted`](crate::Termination) instead.

use gat_core::{GatError, SolveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelmError {
    #[error("network has no slack bus")]
    NoSlack,

    #[error("admittance matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("{what} has length {got}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("slack index {0} is out of range")]
    SlackIndexOutOfRange(usize),

    #[error("bus {0} is listed as slack but not typed Slack (or vice versa)")]
    InconsistentSlack(usize),

    #[error("reduced admittance matrix is singular: {0}")]
    SingularReducedMatrix(String),

    #[error("invalid bus type: {0}")]
    InvalidBusType(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HelmResult<T> = Result<T, HelmError>;

impl From<toml::de::Error> for HelmError {
    fn from(err: toml::de::Error) -> Self {
        HelmError::Config(err.to_string())
    }
}

impl From<HelmError> for GatError {
    fn from(err: HelmError) -> Self {
        match err {
            HelmError::NoSlack
            | HelmError::SingularReducedMatrix(_)
            | HelmError::InconsistentSlack(_) => GatError::Network(err.to_string()),
            HelmError::Config(msg) => GatError::Config(msg),
            HelmError::Io(io) => GatError::Io(io),
            other => GatError::Validation(other.to_string()),
        }
    }
}

impl HelmError {
    pub(crate) fn singular(err: SolveError) -> Self {
        HelmError::SingularReducedMatrix(err.to_string())
    }
}
