//! Convergence loop and public entry points.
//!
//! ```text
//!            ┌──────────── order n ────────────┐
//!  Growing ──┤ advance → accelerate → mismatch ├──► Converged          (norm_f < tol)
//!            └─────────────────────────────────┘──► PrecisionExhausted (non-finite)
//!                                                ──► MaxOrderReached    (n = max)
//! ```
//!
//! The best voltage seen so far is kept at every order, so a solve that
//! stops without converging still returns the closest profile it reached.

use std::mem::size_of;

use gat_core::{BusType, Diagnostics, SolverKind};
use num_complex::Complex64;
use serde::Serialize;
use sprs::CsMat;
use tracing::{debug, info, warn};

use super::accelerate::{EpsilonAccelerator, PadeAccelerator, SeriesAccelerator};
use super::admittance::AdmittanceRecurrence;
use super::config::{Acceleration, Formulation, HelmConfig};
use super::precision::Precision;
use super::recurrence::{CoefficientRecurrence, ImpedanceRecurrence};
use super::stability::{analyze_stability, StabilityReport};
use crate::arena::ArenaContext;
use crate::error::{HelmError, HelmResult};
use crate::power_flow::mismatch::evaluate_mismatch;
use crate::sparse::ReducedNetwork;

/// Terminal state of the convergence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Termination {
    Converged,
    PrecisionExhausted,
    MaxOrderReached,
}

/// Mismatch bookkeeping for one completed order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub order: usize,
    pub norm_f: f64,
    /// Smallest mismatch over orders `0..=order`
    pub best_norm_f: f64,
    /// Whether the accelerator produced new estimates at this order
    pub refreshed: bool,
}

/// Outcome of a HELM solve.
#[derive(Debug, Clone)]
pub struct HelmSolution {
    /// Best voltage found, one entry per bus
    pub voltage: Vec<Complex64>,
    pub converged: bool,
    /// Mismatch of `voltage`
    pub norm_f: f64,
    pub termination: Termination,
    /// Coefficient orders computed with finite values
    pub orders: usize,
    /// Bus powers at `voltage`, PV reactive power and slack power recovered
    pub power: Vec<Complex64>,
    pub history: Vec<OrderRecord>,
    pub diagnostics: Diagnostics,
    /// Present when stability analysis was requested
    pub stability: Option<StabilityReport>,
}

/// Configured HELM power flow solver.
///
/// # Example
///
/// ```
/// use gat_helm::{Acceleration, HelmSolver};
/// use gat_core::BusType;
/// use num_complex::Complex64;
/// use sprs::TriMat;
///
/// let y = Complex64::new(0.01, 0.1).inv();
/// let mut tri = TriMat::new((2, 2));
/// tri.add_triplet(0, 0, y);
/// tri.add_triplet(1, 1, y);
/// tri.add_triplet(0, 1, -y);
/// tri.add_triplet(1, 0, -y);
/// let ybus = tri.to_csr();
///
/// let solution = HelmSolver::new()
///     .with_tolerance(1e-9)
///     .with_acceleration(Acceleration::Epsilon)
///     .solve(
///         &ybus,
///         &[0],
///         &[Complex64::new(0.0, 0.0), Complex64::new(-0.5, -0.2)],
///         &[Complex64::new(1.0, 0.0); 2],
///         &[BusType::Slack, BusType::PQ],
///     )
///     .unwrap();
/// assert!(solution.converged);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HelmSolver {
    config: HelmConfig,
}

impl HelmSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: HelmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HelmConfig {
        &self.config
    }

    pub fn with_max_coefficients(mut self, max_coefficients: usize) -> Self {
        self.config.max_coefficients = max_coefficients;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    pub fn with_acceleration(mut self, acceleration: Acceleration) -> Self {
        self.config.acceleration = acceleration;
        self
    }

    pub fn with_formulation(mut self, formulation: Formulation) -> Self {
        self.config.formulation = formulation;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.config.precision = precision;
        self
    }

    pub fn with_linear_solver(mut self, kind: SolverKind) -> Self {
        self.config.linear_solver = kind;
        self
    }

    pub fn with_history(mut self, record: bool) -> Self {
        self.config.record_history = record;
        self
    }

    pub fn with_stability_analysis(mut self, enabled: bool) -> Self {
        self.config.stability_analysis = enabled;
        self
    }

    /// Solve the power flow of one network.
    ///
    /// Returns `Err` only for malformed input or a singular reduced matrix.
    /// Running out of orders or of numerical precision yields `Ok` with
    /// `converged == false`.
    pub fn solve(
        &self,
        admittance: &CsMat<Complex64>,
        slack: &[usize],
        power: &[Complex64],
        vset: &[Complex64],
        types: &[BusType],
    ) -> HelmResult<HelmSolution> {
        self.config.validate()?;
        validate_inputs(admittance, slack, power, vset, types)?;

        let net = ReducedNetwork::build(admittance, slack, power, vset, types)?;
        let pv: Vec<usize> = net.non_slack[net.npq..].to_vec();

        if net.m() == 0 {
            let mm = evaluate_mismatch(admittance, vset, power, &pv, &net.slack);
            info!(n_bus = net.n_bus, "slack-only network, nothing to solve");
            return Ok(HelmSolution {
                voltage: vset.to_vec(),
                converged: true,
                norm_f: 0.0,
                termination: Termination::Converged,
                orders: 0,
                power: mm.specified,
                history: Vec::new(),
                diagnostics: Diagnostics::new(),
                stability: self.config.stability_analysis.then(StabilityReport::default),
            });
        }

        let backend = self.config.linear_solver.build_solver();
        let capacity = self.config.max_coefficients + 1;
        let bytes = arena_bytes(net.m(), net.npv, capacity).ok_or_else(|| {
            HelmError::Config(format!(
                "coefficient tables for {} orders of {} buses exceed addressable memory",
                capacity,
                net.m()
            ))
        })?;
        let ctx = ArenaContext::with_capacity(bytes);

        let zred = match self.config.formulation {
            Formulation::Impedance => net.invert(backend.as_ref())?,
            Formulation::Admittance => Vec::new(),
        };
        let mut recurrence: Box<dyn CoefficientRecurrence + '_> = match self.config.formulation {
            Formulation::Impedance => Box::new(ImpedanceRecurrence::new(
                &ctx,
                &net,
                &zred,
                capacity,
                self.config.precision,
            )),
            Formulation::Admittance => Box::new(AdmittanceRecurrence::new(
                &ctx,
                &net,
                backend.as_ref(),
                capacity,
                self.config.precision,
            )?),
        };
        let mut accelerator: Box<dyn SeriesAccelerator + '_> = match self.config.acceleration {
            Acceleration::Pade => Box::new(PadeAccelerator::new(backend.as_ref())),
            Acceleration::Epsilon => Box::new(EpsilonAccelerator::new(
                &ctx,
                net.m(),
                capacity,
                self.config.precision,
            )),
        };

        let outcome = self.run(
            admittance,
            power,
            vset,
            &net,
            &pv,
            recurrence.as_mut(),
            accelerator.as_mut(),
        );

        let mut diagnostics = outcome.diagnostics;
        let stability = self.config.stability_analysis.then(|| {
            if net.slack.len() > 1 {
                diagnostics.add_warning(
                    "stability",
                    "several slack buses, sigma scaled by the first slack voltage",
                );
            }
            analyze_stability(
                recurrence.as_ref(),
                &net,
                outcome.orders,
                vset[net.slack[0]],
                backend.as_ref(),
            )
        });

        let (voltage, norm_f) = match outcome.best {
            Some(best) => best,
            None => {
                let mm = evaluate_mismatch(admittance, vset, power, &pv, &net.slack);
                (vset.to_vec(), mm.norm_f)
            }
        };
        let power = evaluate_mismatch(admittance, &voltage, power, &pv, &net.slack).specified;
        let converged = outcome.termination == Termination::Converged;

        info!(
            termination = ?outcome.termination,
            orders = outcome.orders,
            norm_f,
            formulation = ?self.config.formulation,
            acceleration = ?self.config.acceleration,
            "HELM solve finished"
        );

        Ok(HelmSolution {
            voltage,
            converged,
            norm_f,
            termination: outcome.termination,
            orders: outcome.orders,
            power,
            history: outcome.history,
            diagnostics,
            stability,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        admittance: &CsMat<Complex64>,
        power: &[Complex64],
        vset: &[Complex64],
        net: &ReducedNetwork,
        pv: &[usize],
        recurrence: &mut dyn CoefficientRecurrence,
        accelerator: &mut dyn SeriesAccelerator,
    ) -> LoopOutcome {
        let precision = self.config.precision;
        let mut diagnostics = Diagnostics::new();
        let mut history = Vec::new();
        let mut best: Option<(Vec<Complex64>, f64)> = None;
        let mut termination = Termination::MaxOrderReached;
        let mut orders = 0;

        let mut estimate = vec![Complex64::new(0.0, 0.0); net.m()];
        let mut voltage = vset.to_vec();

        for n in 0..=self.config.max_coefficients {
            if !recurrence.advance() {
                warn!(order = n, "non-finite series coefficients, stopping");
                diagnostics.add_error_at_order(
                    "precision",
                    "non-finite series coefficients",
                    n,
                );
                termination = Termination::PrecisionExhausted;
                break;
            }
            orders = n + 1;

            if n == 0 {
                report_zero_germ(recurrence, net, &mut diagnostics);
            }

            let mut next = estimate.clone();
            let step = accelerator.refresh(recurrence, n, &mut next);
            precision.round_slice(&mut next);
            if step.fallbacks > 0 {
                diagnostics.add_warning_at_order(
                    "pade",
                    &format!(
                        "{} singular Padé system(s), partial sum used",
                        step.fallbacks
                    ),
                    n,
                );
            }
            if next.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
                warn!(order = n, "non-finite voltage estimate, stopping");
                diagnostics.add_error_at_order(
                    "precision",
                    "non-finite voltage estimate",
                    n,
                );
                termination = Termination::PrecisionExhausted;
                break;
            }
            estimate = next;

            for (k, &bus) in net.non_slack.iter().enumerate() {
                voltage[bus] = estimate[k];
            }
            let norm_f = evaluate_mismatch(admittance, &voltage, power, pv, &net.slack).norm_f;

            let improved = match &best {
                Some((_, best_norm)) => norm_f < *best_norm,
                None => !norm_f.is_nan(),
            };
            if improved {
                best = Some((voltage.clone(), norm_f));
            }
            let best_norm_f = best.as_ref().map_or(f64::INFINITY, |(_, e)| *e);

            debug!(order = n, norm_f, best_norm_f, refreshed = step.refreshed, "HELM order");
            if self.config.record_history {
                history.push(OrderRecord {
                    order: n,
                    norm_f,
                    best_norm_f,
                    refreshed: step.refreshed,
                });
            }

            if norm_f < self.config.tolerance {
                termination = Termination::Converged;
                break;
            }
        }

        LoopOutcome {
            best,
            termination,
            orders,
            history,
            diagnostics,
        }
    }
}

struct LoopOutcome {
    best: Option<(Vec<Complex64>, f64)>,
    termination: Termination,
    orders: usize,
    history: Vec<OrderRecord>,
    diagnostics: Diagnostics,
}

fn report_zero_germ(
    recurrence: &dyn CoefficientRecurrence,
    net: &ReducedNetwork,
    diagnostics: &mut Diagnostics,
) {
    for (k, &bus) in net.non_slack.iter().enumerate() {
        if recurrence.voltage(0, k) == Complex64::new(0.0, 0.0) {
            warn!(bus, "zero germ coefficient");
            diagnostics.add_warning_with_entity(
                "germ",
                "zero germ voltage coefficient",
                &format!("bus {}", bus),
            );
        }
    }
}

/// Bytes needed for all coefficient tables of one solve, `None` on overflow.
fn arena_bytes(m: usize, npv: usize, capacity: usize) -> Option<usize> {
    // voltage and reciprocal series, four PV auxiliaries, epsilon tables
    let width = m.checked_mul(3)?.checked_add(npv.checked_mul(4)?)?;
    let cells = capacity.checked_mul(width)?.checked_add(m.checked_mul(4)?)?;
    cells.checked_mul(size_of::<Complex64>())
}

fn validate_inputs(
    admittance: &CsMat<Complex64>,
    slack: &[usize],
    power: &[Complex64],
    vset: &[Complex64],
    types: &[BusType],
) -> HelmResult<()> {
    let (rows, cols) = admittance.shape();
    if rows != cols {
        return Err(HelmError::NotSquare { rows, cols });
    }
    for (what, got) in [
        ("power_injections", power.len()),
        ("voltage_set_points", vset.len()),
        ("bus_types", types.len()),
    ] {
        if got != rows {
            return Err(HelmError::DimensionMismatch {
                what,
                got,
                expected: rows,
            });
        }
    }
    if slack.is_empty() {
        return Err(HelmError::NoSlack);
    }

    let mut listed = vec![false; rows];
    for &s in slack {
        if s >= rows {
            return Err(HelmError::SlackIndexOutOfRange(s));
        }
        if types[s] != BusType::Slack || listed[s] {
            return Err(HelmError::InconsistentSlack(s));
        }
        listed[s] = true;
    }
    if let Some(bus) = (0..rows).find(|&i| types[i] == BusType::Slack && !listed[i]) {
        return Err(HelmError::InconsistentSlack(bus));
    }
    Ok(())
}

/// Solve with integer bus codes (PQ = 1, PV = 2, Slack = 3).
///
/// Returns `(voltage, converged, norm_f)`. `use_pade` selects Padé
/// approximants, otherwise Wynn's epsilon algorithm. Every other setting
/// keeps its [`HelmConfig`] default.
#[allow(clippy::too_many_arguments)]
pub fn solve_helm(
    admittance: &CsMat<Complex64>,
    slack_indices: &[usize],
    max_coefficient_count: usize,
    power_injections: &[Complex64],
    voltage_set_points: &[Complex64],
    bus_types: &[i32],
    eps: f64,
    use_pade: bool,
) -> HelmResult<(Vec<Complex64>, bool, f64)> {
    let types = BusType::from_codes(bus_types)
        .map_err(|e| HelmError::InvalidBusType(e.to_string()))?;
    let acceleration = if use_pade {
        Acceleration::Pade
    } else {
        Acceleration::Epsilon
    };
    let solution = HelmSolver::new()
        .with_max_coefficients(max_coefficient_count)
        .with_tolerance(eps)
        .with_acceleration(acceleration)
        .with_history(false)
        .solve(
            admittance,
            slack_indices,
            power_injections,
            voltage_set_points,
            &types,
        )?;
    Ok((solution.voltage, solution.converged, solution.norm_f))
}
