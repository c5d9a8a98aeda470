//! Unified error types for the GAT ecosystem
//!
//! This module provides a common error type [`GatError`] that can represent
//! errors from any part of the system. Domain-specific error types (such as
//! [`SolveError`](crate::solver::SolveError) or the HELM engine's own error
//! enum) convert into `GatError` for uniform handling at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use gat_core::{GatError, GatResult};
//!
//! fn run(problem: &Problem) -> GatResult<()> {
//!     let solution = solve_helm(problem)?;
//!     report(&solution)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all GAT operations.
#[derive(Error, Debug)]
pub enum GatError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input validation errors (dimension mismatches, bad bus codes)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/algorithm errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network structure errors (no reference bus, singular reduced system)
    #[error("Network error: {0}")]
    Network(String),
}

/// Convenience type alias for Results using GatError.
pub type GatResult<T> = Result<T, GatError>;

impl From<crate::solver::SolveError> for GatError {
    fn from(err: crate::solver::SolveError) -> Self {
        GatError::Solver(err.to_string())
    }
}
