//! Sparse admittance handling.
//!
//! The caller assembles the bus admittance matrix; this module only slices
//! it into the reduced system the HELM recurrences work on.

pub mod reduce;

pub use reduce::{reduce_network, ReducedNetwork};
