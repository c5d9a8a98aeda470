//! Dense linear-system backends shared by the solvers in this workspace.

pub mod backend;
pub mod registry;

pub use backend::{FaerSolver, GaussSolver, LinearSystemBackend, SolveError};
pub use registry::SolverKind;
