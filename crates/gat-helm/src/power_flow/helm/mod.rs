//! Holomorphic Embedding Load-flow Method.
//!
//! The bus voltages are embedded in a complex parameter `s` so that `s = 0`
//! is a trivially solvable no-load state and `s = 1` is the physical power
//! flow. The voltage series in `s` is built order by order, continued to
//! `s = 1` by an accelerator, and checked against the power balance after
//! every order.
//!
//! - [`recurrence`]: impedance-domain coefficient recurrence
//! - [`admittance`]: admittance-domain recurrence with PV reactive unknowns
//! - [`pade`], [`epsilon`]: series continuation
//! - [`solver`]: convergence loop, [`HelmSolver`] and [`solve_helm`]
//! - [`stability`]: sigma approximants and Padé-pole nose estimates

pub mod accelerate;
pub mod admittance;
pub mod config;
pub mod epsilon;
pub mod pade;
pub mod precision;
pub mod recurrence;
mod solver;
pub mod stability;

pub use accelerate::{EpsilonAccelerator, PadeAccelerator, Refresh, SeriesAccelerator};
pub use admittance::AdmittanceRecurrence;
pub use config::{Acceleration, Formulation, HelmConfig};
pub use epsilon::{epsilon_step, EpsilonTables};
pub use pade::{pade_approximant, pade_degree, PadeResult};
pub use precision::Precision;
pub use recurrence::{CoefficientRecurrence, ImpedanceRecurrence};
pub use solver::{solve_helm, HelmSolution, HelmSolver, OrderRecord, Termination};
pub use stability::{
    analyze_stability, nose_curve, nose_point, sigma_approximant, sigma_margin, BusStability,
    StabilityReport,
};
