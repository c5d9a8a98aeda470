//! # gat-helm: Holomorphic Embedding Power Flow
//!
//! Solves the AC power flow equations with the Holomorphic Embedding
//! Load-flow Method. Instead of iterating from an initial guess, the voltage
//! of every bus is expanded as a power series in an embedding parameter and
//! the series is analytically continued to the physical operating point.
//!
//! ## Pipeline
//!
//! | Stage | Module |
//! |-------|--------|
//! | Slack elimination, `Zred = Yred⁻¹` | [`sparse`] |
//! | Coefficient recurrence | [`power_flow::helm::recurrence`], [`power_flow::helm::admittance`] |
//! | Padé approximants / Wynn epsilon | [`power_flow::helm::pade`], [`power_flow::helm::epsilon`] |
//! | Convergence loop | [`HelmSolver`] |
//! | Sigma and nose-point indicators | [`power_flow::helm::stability`] |
//! | Power mismatch | [`power_flow::mismatch`] |
//!
//! Coefficient tables live in a per-solve [`arena`]. Solves share no state,
//! so independent networks can be solved concurrently by the caller.
//!
//! ## Example
//!
//! ```
//! use gat_helm::solve_helm;
//! use num_complex::Complex64;
//! use sprs::TriMat;
//!
//! // slack bus 0 feeding a 0.5 + j0.2 p.u. load on bus 1
//! let y = Complex64::new(0.01, 0.1).inv();
//! let mut tri = TriMat::new((2, 2));
//! tri.add_triplet(0, 0, y);
//! tri.add_triplet(1, 1, y);
//! tri.add_triplet(0, 1, -y);
//! tri.add_triplet(1, 0, -y);
//!
//! let (v, converged, norm_f) = solve_helm(
//!     &tri.to_csr(),
//!     &[0],
//!     15,
//!     &[Complex64::new(0.0, 0.0), Complex64::new(-0.5, -0.2)],
//!     &[Complex64::new(1.0, 0.0); 2],
//!     &[3, 1],
//!     1e-9,
//!     true,
//! )
//! .unwrap();
//! assert!(converged);
//! assert!(norm_f < 1e-9);
//! assert!(v[1].norm() < 1.0);
//! ```

pub mod arena;
pub mod error;
pub mod power_flow;
pub mod sparse;
#[doc(hidden)]
pub mod test_utils;

pub use error::{HelmError, HelmResult};
pub use power_flow::helm::{
    solve_helm, Acceleration, Formulation, HelmConfig, HelmSolution, HelmSolver, OrderRecord,
    PadeResult, Precision, StabilityReport, Termination,
};
pub use power_flow::mismatch::{evaluate_mismatch, PowerMismatch};
pub use sparse::{reduce_network, ReducedNetwork};
