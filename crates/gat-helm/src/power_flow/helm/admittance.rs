//! Admittance-domain recurrence on an expanded real system.
//!
//! The admittance matrix is split as `Y = Yser + diag(ysh)` with `ysh` the row
//! sums, so the germ is the no-load profile of the series network. Slack
//! voltages are embedded as `1 + s·(Vslack − 1)` and every bus voltage as
//! `U(s)`, with `X(s) = 1 / conj(U(s))`. PV buses carry their reactive power
//! `Q(s)` as an extra real unknown per order.
//!
//! ```text
//! ┌             ┐ ┌       ┐   ┌        ┐
//! │ G   −B  XIM │ │ Re U  │   │ Re rhs │
//! │ B    G  XRE │ │ Im U  │ = │ Im rhs │      XIM/XRE: −Im X[0], Re X[0] on PV rows
//! │ VRE VIM  0  │ │ Q     │   │ |V|²   │      VRE/VIM: 2·Re U[0], 2·Im U[0]
//! └             ┘ └       ┘   └        ┘
//! ```
//!
//! The block matrix only depends on the germ and is factorized once.

use faer::{prelude::*, solvers::PartialPivLu, Mat};
use gat_core::LinearSystemBackend;
use num_complex::Complex64;

use super::precision::Precision;
use super::recurrence::CoefficientRecurrence;
use crate::arena::{ArenaContext, SeriesMatrix};
use crate::error::{HelmError, HelmResult};
use crate::sparse::ReducedNetwork;

pub struct AdmittanceRecurrence<'a> {
    net: &'a ReducedNetwork,
    u: SeriesMatrix<'a>,
    x: SeriesMatrix<'a>,
    /// Row `c − 1` is written while computing order `c`
    q: SeriesMatrix<'a>,
    u0: Vec<Complex64>,
    ysh: Vec<Complex64>,
    lu: PartialPivLu<f64>,
    rhs: Mat<f64>,
    precision: Precision,
}

impl<'a> AdmittanceRecurrence<'a> {
    /// Solve the germ and factorize the block system.
    ///
    /// Fails when the series part of the reduced admittance is singular.
    pub fn new(
        ctx: &'a ArenaContext,
        net: &'a ReducedNetwork,
        backend: &dyn LinearSystemBackend,
        capacity: usize,
        precision: Precision,
    ) -> HelmResult<Self> {
        net.check_connected()?;
        let m = net.m();
        let npv = net.npv;

        // row sum of the full row = row sum of Yred plus the slack columns
        let mut yser = net.dense_yred();
        let ysh: Vec<Complex64> = (0..m)
            .map(|k| yser[k].iter().sum::<Complex64>() - net.islack_unit[k])
            .collect();
        for k in 0..m {
            yser[k][k] -= ysh[k];
        }

        let u0 = backend
            .solve(&yser, &net.islack_unit)
            .map_err(HelmError::singular)?;
        let u0: Vec<Complex64> = u0.into_iter().map(|v| precision.round(v)).collect();

        let dim = 2 * m + npv;
        let mut mat = Mat::zeros(dim, dim);
        for i in 0..m {
            for j in 0..m {
                let y = yser[i][j];
                mat.write(i, j, y.re);
                mat.write(i, m + j, -y.im);
                mat.write(m + i, j, y.im);
                mat.write(m + i, m + j, y.re);
            }
        }
        for j in 0..npv {
            let k = net.npq + j;
            let x0 = u0[k].conj().inv();
            mat.write(k, 2 * m + j, -x0.im);
            mat.write(m + k, 2 * m + j, x0.re);
            mat.write(2 * m + j, k, 2.0 * u0[k].re);
            mat.write(2 * m + j, m + k, 2.0 * u0[k].im);
        }
        let lu = mat.partial_piv_lu();

        Ok(Self {
            net,
            u: ctx.series_matrix(capacity, m),
            x: ctx.series_matrix(capacity, m),
            q: ctx.series_matrix(capacity, npv),
            u0,
            ysh,
            lu,
            rhs: Mat::zeros(dim, 1),
            precision,
        })
    }

    fn germ(&mut self) {
        let n = self.u.push_zero_row();
        self.x.push_zero_row();
        for k in 0..self.net.m() {
            let u0 = self.u0[k];
            self.u.set(n, k, u0);
            self.x.set(n, k, self.precision.round(u0.conj().inv()));
        }
    }

    /// Right-hand side of order `c ≥ 1` for reduced bus `k`.
    fn injection(&self, c: usize, k: usize) -> Complex64 {
        let net = self.net;
        let s = net.sred[k];
        let shunt = self.u.get(c - 1, k) * self.ysh[k];
        if c == 1 {
            let drive = net.iind[k] - net.islack_unit[k] - shunt;
            return if k < net.npq {
                drive + s.conj() * self.x.get(0, k)
            } else {
                drive + self.x.get(0, k) * s.re
            };
        }
        if k < net.npq {
            s.conj() * self.x.get(c - 1, k) - shunt
        } else {
            let j = k - net.npq;
            let conv: Complex64 = (1..c)
                .map(|l| self.x.get(l, k) * self.q.get(c - 1 - l, j))
                .sum();
            -Complex64::i() * conv - shunt + self.x.get(c - 1, k) * s.re
        }
    }

    /// Voltage-magnitude constraint of order `c ≥ 1` for PV bus `j`.
    fn magnitude(&self, c: usize, j: usize) -> f64 {
        let k = self.net.npq + j;
        if c == 1 {
            return self.net.vset_red[k].norm_sqr() - self.u0[k].norm_sqr();
        }
        let conv: Complex64 = (1..c)
            .map(|l| self.u.get(l, k) * self.u.get(c - l, k).conj())
            .sum();
        -conv.re
    }
}

impl CoefficientRecurrence for AdmittanceRecurrence<'_> {
    fn width(&self) -> usize {
        self.net.m()
    }

    fn orders(&self) -> usize {
        self.u.rows()
    }

    fn advance(&mut self) -> bool {
        if self.u.rows() == 0 {
            self.germ();
            return self.u.row_is_finite(0) && self.x.row_is_finite(0);
        }

        let m = self.net.m();
        let npv = self.net.npv;
        let c = self.u.rows();
        for k in 0..m {
            let value = self.injection(c, k);
            self.rhs.write(k, 0, value.re);
            self.rhs.write(m + k, 0, value.im);
        }
        for j in 0..npv {
            let value = self.magnitude(c, j);
            self.rhs.write(2 * m + j, 0, value);
        }
        let lhs = self.lu.solve(&self.rhs);

        let n = self.u.push_zero_row();
        self.x.push_zero_row();
        let qn = self.q.push_zero_row();
        for k in 0..m {
            let v = Complex64::new(lhs.read(k, 0), lhs.read(m + k, 0));
            self.u.set(n, k, self.precision.round(v));
        }
        for j in 0..npv {
            let q = Complex64::new(lhs.read(2 * m + j, 0), 0.0);
            self.q.set(qn, j, self.precision.round(q));
        }
        for k in 0..m {
            let conv: Complex64 = (1..=c)
                .map(|l| self.u.get(l, k).conj() * self.x.get(c - l, k))
                .sum();
            let value = -conv / self.u0[k].conj();
            self.x.set(n, k, self.precision.round(value));
        }

        self.u.row_is_finite(n) && self.x.row_is_finite(n) && self.q.row_is_finite(qn)
    }

    fn voltage(&self, n: usize, k: usize) -> Complex64 {
        self.u.get(n, k)
    }
}
