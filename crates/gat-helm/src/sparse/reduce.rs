//! Slack elimination from the bus admittance matrix.
//!
//! Holding the slack buses at their set voltages turns their columns of Y
//! into known current injections:
//!
//! ```text
//! ┌              ┐ ┌        ┐   ┌        ┐
//! │ Yred  Yslack │ │ V_red  │ = │ I_red  │     Yred · V_red = I_red + Iind
//! └              ┘ │ Vslack │   └        ┘     Iind = −Yslack · Vslack
//!                  └        ┘
//! ```
//!
//! Non-slack buses are ordered `[PQ..., PV...]`, each group keeping the
//! relative order of the full bus list. The dense inverse `Zred = Yred⁻¹` is
//! computed once; every coefficient order then costs one dense mat-vec.

use gat_core::{BusType, LinearSystemBackend};
use num_complex::Complex64;
use sprs::{CsMat, TriMat};

use crate::error::{HelmError, HelmResult};

/// Admittance system with the slack buses removed.
#[derive(Debug, Clone)]
pub struct ReducedNetwork {
    /// Total number of buses
    pub n_bus: usize,
    /// Full-network indices of the non-slack buses, PQ first then PV
    pub non_slack: Vec<usize>,
    /// Full-network indices of the slack buses
    pub slack: Vec<usize>,
    /// Bus type of every reduced bus (parallel to `non_slack`)
    pub types_red: Vec<BusType>,
    /// Per full bus: position within the array of its own type
    pub map_idx: Vec<usize>,
    pub npq: usize,
    pub npv: usize,
    /// Reduced admittance (non-slack × non-slack), CSR
    pub yred: CsMat<Complex64>,
    /// Current injected into each non-slack bus by the slack buses at their set voltage
    pub iind: Vec<Complex64>,
    /// Same injection with every slack held at 1∠0
    pub islack_unit: Vec<Complex64>,
    /// Specified power injections of the reduced buses
    pub sred: Vec<Complex64>,
    /// Slack voltage set points (parallel to `slack`)
    pub vslack: Vec<Complex64>,
    /// Voltage set points of the reduced buses
    pub vset_red: Vec<Complex64>,
}

impl ReducedNetwork {
    /// Slice `y` into the reduced system.
    ///
    /// Inputs are assumed validated (lengths agree, indices in range, types
    /// consistent with `slack`); only the empty slack set is rejected here.
    pub fn build(
        y: &CsMat<Complex64>,
        slack: &[usize],
        power: &[Complex64],
        vset: &[Complex64],
        types: &[BusType],
    ) -> HelmResult<Self> {
        if slack.is_empty() {
            return Err(HelmError::NoSlack);
        }

        let y_csr;
        let y = if y.is_csr() {
            y
        } else {
            y_csr = y.to_csr();
            &y_csr
        };

        let n_bus = types.len();
        let mut is_slack = vec![false; n_bus];
        for &s in slack {
            is_slack[s] = true;
        }

        let pq: Vec<usize> = (0..n_bus)
            .filter(|&i| !is_slack[i] && types[i] == BusType::PQ)
            .collect();
        let pv: Vec<usize> = (0..n_bus)
            .filter(|&i| !is_slack[i] && types[i] == BusType::PV)
            .collect();
        let npq = pq.len();
        let npv = pv.len();

        let mut map_idx = vec![0usize; n_bus];
        for (local, &bus) in pq.iter().enumerate() {
            map_idx[bus] = local;
        }
        for (local, &bus) in pv.iter().enumerate() {
            map_idx[bus] = local;
        }
        for (local, &bus) in slack.iter().enumerate() {
            map_idx[bus] = local;
        }

        let mut non_slack = pq;
        non_slack.extend(pv);
        let m = non_slack.len();

        let mut position = vec![None; n_bus];
        for (k, &bus) in non_slack.iter().enumerate() {
            position[bus] = Some(k);
        }

        let vslack: Vec<Complex64> = slack.iter().map(|&s| vset[s]).collect();

        let zero = Complex64::new(0.0, 0.0);
        let mut triplets = TriMat::new((m, m));
        let mut iind = vec![zero; m];
        let mut islack_unit = vec![zero; m];

        for (row, row_vec) in y.outer_iterator().enumerate() {
            let Some(k) = position[row] else { continue };
            for (col, &value) in row_vec.iter() {
                if let Some(j) = position[col] {
                    triplets.add_triplet(k, j, value);
                } else if is_slack[col] {
                    iind[k] -= value * vset[col];
                    islack_unit[k] -= value;
                }
            }
        }
        let yred: CsMat<Complex64> = triplets.to_csr();

        let types_red = non_slack.iter().map(|&i| types[i]).collect();
        let sred = non_slack.iter().map(|&i| power[i]).collect();
        let vset_red = non_slack.iter().map(|&i| vset[i]).collect();

        Ok(Self {
            n_bus,
            non_slack,
            slack: slack.to_vec(),
            types_red,
            map_idx,
            npq,
            npv,
            yred,
            iind,
            islack_unit,
            sred,
            vslack,
            vset_red,
        })
    }

    /// Number of non-slack buses (M).
    pub fn m(&self) -> usize {
        self.non_slack.len()
    }

    /// Position of reduced bus `k` inside its own-type array (PQ or PV).
    #[inline]
    pub fn local_index(&self, k: usize) -> usize {
        self.map_idx[self.non_slack[k]]
    }

    /// Diagonal entry `Yred[k, k]`.
    pub fn yred_diag(&self, k: usize) -> Complex64 {
        self.yred
            .get(k, k)
            .copied()
            .unwrap_or(Complex64::new(0.0, 0.0))
    }

    pub fn dense_yred(&self) -> Vec<Vec<Complex64>> {
        let m = self.m();
        let mut dense = vec![vec![Complex64::new(0.0, 0.0); m]; m];
        for (k, row_vec) in self.yred.outer_iterator().enumerate() {
            for (j, &value) in row_vec.iter() {
                dense[k][j] += value;
            }
        }
        dense
    }

    /// Reduced buses whose admittance row is structurally empty.
    pub fn isolated_buses(&self) -> Vec<usize> {
        self.yred
            .outer_iterator()
            .enumerate()
            .filter(|(_, row)| row.iter().all(|(_, v)| *v == Complex64::new(0.0, 0.0)))
            .map(|(k, _)| self.non_slack[k])
            .collect()
    }

    /// Fail on a reduced bus with an empty admittance row.
    pub fn check_connected(&self) -> HelmResult<()> {
        match self.isolated_buses().first() {
            Some(bus) => Err(HelmError::SingularReducedMatrix(format!(
                "bus {} has no admittance to the rest of the network",
                bus
            ))),
            None => Ok(()),
        }
    }

    /// Dense inverse `Zred = Yred⁻¹`.
    ///
    /// A singular reduced matrix means the network is degenerate (an island
    /// without a reference, a bus with no connections) and is fatal.
    pub fn invert(&self, backend: &dyn LinearSystemBackend) -> HelmResult<Vec<Vec<Complex64>>> {
        self.check_connected()?;
        backend.invert(&self.dense_yred()).map_err(HelmError::singular)
    }
}

/// Reduce the network and factor the reduced matrix in one step.
///
/// Returns the reduced system together with `Zred`.
pub fn reduce_network(
    y: &CsMat<Complex64>,
    slack: &[usize],
    power: &[Complex64],
    vset: &[Complex64],
    types: &[BusType],
    backend: &dyn LinearSystemBackend,
) -> HelmResult<(ReducedNetwork, Vec<Vec<Complex64>>)> {
    let reduced = ReducedNetwork::build(y, slack, power, vset, types)?;
    let zred = reduced.invert(backend)?;
    Ok((reduced, zred))
}
