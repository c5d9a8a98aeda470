//! Power flow solvers
//!
//! - [`helm`]: non-iterative holomorphic embedding solver
//! - [`mismatch`]: bus power recovery and the convergence criterion

pub mod helm;
pub mod mismatch;

pub use helm::{solve_helm, HelmSolution, HelmSolver, Termination};
pub use mismatch::{compute_power, evaluate_mismatch, PowerMismatch};
