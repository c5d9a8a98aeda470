//! Voltage-stability indicators computed from the voltage series.
//!
//! Both indicators reuse the coefficients a solve has already produced.
//!
//! # Sigma approximants
//!
//! Writing the embedded voltage as `U(s) = 1 + σ(s) · X(s)` with
//! `X(s) = 1 / conj(U(s))`, `σ` is fitted as a rational function from the
//! `U` and `X` series:
//!
//! ```text
//! Q(s) · (U(s) − 1) = P(s) · X(s) + O(s^{2M+2})
//! P(s) = Σ_{j=0}^{M} p_j s^{j+1}        Q(s) = 1 + Σ_{j=1}^{M} q_j s^j
//! σ(1) = Σ p_j / (1 + Σ q_j)
//! ```
//!
//! For a single line `σ = Z · conj(S)` exactly, and the load flow has a
//! solution only while `Re σ + 1/4 − (Im σ)² ≥ 0` ([`sigma_margin`]).
//!
//! # Nose point
//!
//! The voltage series of a loaded network has a branch point on the positive
//! real axis at the loading multiple where the solution disappears. Poles of
//! the diagonal Padé approximant accumulate there, so the smallest pole close
//! to the positive real axis estimates the maximum loadability. Estimates
//! approach the true point from above as the order grows.

use faer::{complex_native::c64, prelude::*, Mat};
use gat_core::LinearSystemBackend;
use num_complex::Complex64;
use tracing::debug;

use super::pade::{pade_approximant, pade_coefficients, PadeResult};
use super::recurrence::CoefficientRecurrence;
use crate::sparse::ReducedNetwork;

/// Largest `|Im z| / Re z` of a pole counted as lying on the positive real axis.
const REAL_AXIS_TOLERANCE: f64 = 0.05;

/// Stability indicators of one non-slack bus.
#[derive(Debug, Clone, PartialEq)]
pub struct BusStability {
    /// Bus index in the full network
    pub bus: usize,
    /// `None` when the sigma system was singular
    pub sigma: Option<Complex64>,
    /// Estimated loading multiple at the nose of the PV curve
    pub nose: Option<f64>,
}

impl BusStability {
    pub fn sigma_margin(&self) -> Option<f64> {
        self.sigma.map(sigma_margin)
    }
}

/// Per-bus stability indicators of one solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StabilityReport {
    pub buses: Vec<BusStability>,
}

impl StabilityReport {
    /// Smallest nose estimate over all buses.
    pub fn nose_point(&self) -> Option<f64> {
        self.buses
            .iter()
            .filter_map(|b| b.nose)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Bus with the smallest sigma margin.
    pub fn weakest_bus(&self) -> Option<&BusStability> {
        self.buses
            .iter()
            .filter(|b| b.sigma.is_some())
            .min_by(|a, b| {
                let ma = a.sigma_margin().unwrap_or(f64::INFINITY);
                let mb = b.sigma_margin().unwrap_or(f64::INFINITY);
                ma.total_cmp(&mb)
            })
    }
}

/// Series of `1 / conj(U(s))` from the series of `U(s)`.
pub fn reciprocal_series(u: &[Complex64]) -> Vec<Complex64> {
    let mut x = Vec::with_capacity(u.len());
    let Some(&u0) = u.first() else {
        return x;
    };
    let u0 = u0.conj();
    x.push(u0.inv());
    for n in 1..u.len() {
        let acc: Complex64 = (0..n).map(|l| x[l] * u[n - l].conj()).sum();
        x.push(-acc / u0);
    }
    x
}

/// Sigma value at `s = 1` from the voltage series `u` and its reciprocal
/// series `x`, both scaled by the slack voltage `v0`.
///
/// With `order = u.len() − 1` the fit uses `M = order / 2 − 1` for even
/// orders and `M = order / 2` for odd ones.
pub fn sigma_approximant(
    u: &[Complex64],
    x: &[Complex64],
    v0: Complex64,
    backend: &dyn LinearSystemBackend,
) -> PadeResult {
    let order = u.len().saturating_sub(1);
    if order == 0 {
        return PadeResult::Singular;
    }
    let m = if order % 2 == 0 {
        order / 2 - 1
    } else {
        order / 2
    };
    let dim = 2 * m + 1;
    if x.len() < dim {
        return PadeResult::Singular;
    }

    let a: Vec<Complex64> = u[1..=dim].iter().map(|v| v / v0).collect();
    let b: Vec<Complex64> = x[..dim].iter().map(|v| v / v0).collect();
    let zero = Complex64::new(0.0, 0.0);
    let matrix: Vec<Vec<Complex64>> = (0..dim)
        .map(|r| {
            (0..dim)
                .map(|i| {
                    if i < m {
                        if r > i {
                            a[r - 1 - i]
                        } else {
                            zero
                        }
                    } else if r + m >= i {
                        -b[r + m - i]
                    } else {
                        zero
                    }
                })
                .collect()
        })
        .collect();
    let rhs: Vec<Complex64> = a.iter().map(|v| -v).collect();

    let Ok(lhs) = backend.solve(&matrix, &rhs) else {
        return PadeResult::Singular;
    };
    let numerator: Complex64 = lhs[m..].iter().sum();
    let denominator: Complex64 = lhs[..m].iter().sum::<Complex64>() + 1.0;
    let sigma = numerator / denominator;
    if sigma.re.is_finite() && sigma.im.is_finite() {
        PadeResult::Value(sigma)
    } else {
        PadeResult::Singular
    }
}

/// Signed distance-like margin to the solvability boundary
/// `Re σ = (Im σ)² − 1/4`. Negative once the load flow has no solution.
pub fn sigma_margin(sigma: Complex64) -> f64 {
    sigma.re + 0.25 - sigma.im * sigma.im
}

/// Roots of `q(s) = Σ b_j s^j` as eigenvalues of its companion matrix.
pub fn polynomial_roots(b: &[Complex64]) -> Vec<Complex64> {
    let Some(lead) = b.iter().rposition(|v| v.norm() > 0.0) else {
        return Vec::new();
    };
    if lead == 0 {
        return Vec::new();
    }
    let top = b[lead];
    let companion = Mat::<c64>::from_fn(lead, lead, |i, j| {
        if j == lead - 1 {
            let v = -b[i] / top;
            c64::new(v.re, v.im)
        } else if i == j + 1 {
            c64::new(1.0, 0.0)
        } else {
            c64::new(0.0, 0.0)
        }
    });
    companion
        .complex_eigenvalues()
        .into_iter()
        .map(|z| Complex64::new(z.re, z.im))
        .collect()
}

/// Loading multiple at the nose of the PV curve, from the poles of the
/// diagonal Padé approximant of `series`.
///
/// `None` when the Padé system is singular or no pole lies near the positive
/// real axis.
pub fn nose_point(series: &[Complex64], backend: &dyn LinearSystemBackend) -> Option<f64> {
    let (_, b) = pade_coefficients(series, backend)?;
    polynomial_roots(&b)
        .into_iter()
        .filter(|z| z.re > 0.0 && z.im.abs() <= REAL_AXIS_TOLERANCE * z.re)
        .map(|z| z.norm())
        .filter(|r| r.is_finite())
        .min_by(|a, b| a.total_cmp(b))
}

/// Voltage along the PV curve at `points` loading multiples evenly spaced
/// from 1 (inclusive) to `nose` (exclusive).
///
/// Loading multiples whose approximant is singular are skipped. Empty when
/// `nose <= 1`.
pub fn nose_curve(
    series: &[Complex64],
    nose: f64,
    points: usize,
    backend: &dyn LinearSystemBackend,
) -> Vec<(f64, Complex64)> {
    if nose.is_nan() || nose <= 1.0 || points == 0 {
        return Vec::new();
    }
    (0..points)
        .filter_map(|i| {
            let lambda = 1.0 + (nose - 1.0) * i as f64 / points as f64;
            match pade_approximant(series, lambda, backend) {
                PadeResult::Value(v) => Some((lambda, v)),
                PadeResult::Singular => None,
            }
        })
        .collect()
}

/// Stability indicators for every reduced bus from the first `orders`
/// coefficients of `recurrence`.
pub fn analyze_stability(
    recurrence: &dyn CoefficientRecurrence,
    net: &ReducedNetwork,
    orders: usize,
    v0: Complex64,
    backend: &dyn LinearSystemBackend,
) -> StabilityReport {
    let buses = net
        .non_slack
        .iter()
        .enumerate()
        .map(|(k, &bus)| {
            let u: Vec<Complex64> = (0..orders).map(|n| recurrence.voltage(n, k)).collect();
            let x = reciprocal_series(&u);
            let sigma = match sigma_approximant(&u, &x, v0, backend) {
                PadeResult::Value(s) => Some(s),
                PadeResult::Singular => None,
            };
            let nose = nose_point(&u, backend);
            debug!(bus, ?sigma, ?nose, "stability indicators");
            BusStability { bus, sigma, nose }
        })
        .collect();
    StabilityReport { buses }
}
