//! # gat-core: Power Grid Analysis Core
//!
//! Shared foundation for the solver crates of the workspace:
//!
//! - [`BusType`] - PQ / PV / Slack classification with the conventional
//!   integer codes (1 / 2 / 3)
//! - [`GatError`] / [`GatResult`] - unified error type at API boundaries
//! - [`diagnostics`] - warnings and errors collected during a solve without
//!   aborting it
//! - [`solver`] - dense complex linear-system backends (Gaussian elimination
//!   and faer LU) selected through [`SolverKind`]
//!
//! ## Quick Start
//!
//! ```rust
//! use gat_core::{BusType, SolverKind};
//! use num_complex::Complex64;
//!
//! let types = BusType::from_codes(&[3, 1, 2]).unwrap();
//! assert_eq!(types[0], BusType::Slack);
//!
//! let solver = SolverKind::Faer.build_solver();
//! let a = vec![vec![Complex64::new(2.0, 0.0)]];
//! let x = solver.solve(&a, &[Complex64::new(4.0, 2.0)]).unwrap();
//! assert!((x[0] - Complex64::new(2.0, 1.0)).norm() < 1e-12);
//! ```

pub mod bus;
pub mod diagnostics;
pub mod error;
pub mod solver;

pub use bus::BusType;
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{GatError, GatResult};
pub use solver::*;
