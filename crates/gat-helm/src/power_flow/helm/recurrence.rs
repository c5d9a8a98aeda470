//! Coefficient recurrences of the holomorphic embedding.
//!
//! A recurrence produces one row of voltage coefficients per call to
//! [`CoefficientRecurrence::advance`]. Row `n` of the voltage matrix is the
//! order-`n` Maclaurin coefficient of every reduced bus voltage `V_k(s)`;
//! earlier rows are never rewritten.
//!
//! # Impedance formulation
//!
//! With the slacks eliminated, every order is one product with the dense
//! inverse `Zred`:
//!
//! ```text
//! C[n] = Zred · I_n
//!
//! I_0[k] = Iind[k]
//! PQ:  I_n[k] = conj(S_k) · W[n−1, k']
//! PV:  I_n[k] = (2·Re(S_k)·C[n−1, k] − H[n−1, k'] + R[n−1, k']·conj(Iind[k])) / |Vset_k|²
//!
//! W = 1 / conj(C)                 (series reciprocal, PQ buses)
//! R = C ⊛ C                        (Cauchy square, PV buses)
//! X[n, k'] = Σ_{i≠k} conj(Yred[k, i] · C[n, i])
//! H = X ⊛ R + conj(Yred[k, k]) · C · |Vset_k|²
//! ```
//!
//! `k'` is the position of bus `k` among the buses of its own type.

use num_complex::Complex64;

use super::precision::Precision;
use crate::arena::{ArenaContext, SeriesMatrix};
use crate::sparse::ReducedNetwork;

/// One formulation of the voltage coefficient series.
pub trait CoefficientRecurrence {
    /// Number of reduced buses.
    fn width(&self) -> usize;

    /// Orders computed so far.
    fn orders(&self) -> usize;

    /// Compute the next order.
    ///
    /// Returns `false` when any coefficient of the new order is NaN or
    /// infinite. The row is kept but later orders must not be requested.
    fn advance(&mut self) -> bool;

    /// Voltage coefficient of order `n` for reduced bus `k`.
    fn voltage(&self, n: usize, k: usize) -> Complex64;

    /// Voltage coefficients of reduced bus `k` for orders `0..orders()`.
    fn voltage_series(&self, k: usize) -> Vec<Complex64> {
        (0..self.orders()).map(|n| self.voltage(n, k)).collect()
    }
}

/// Impedance-domain recurrence driven by `Zred = Yred⁻¹`.
pub struct ImpedanceRecurrence<'a> {
    net: &'a ReducedNetwork,
    zred: &'a [Vec<Complex64>],
    c: SeriesMatrix<'a>,
    w: SeriesMatrix<'a>,
    r: SeriesMatrix<'a>,
    x: SeriesMatrix<'a>,
    h: SeriesMatrix<'a>,
    current: bumpalo::collections::Vec<'a, Complex64>,
    /// |Vset|² per PV bus (own-type index)
    vm2: bumpalo::collections::Vec<'a, f64>,
    precision: Precision,
}

impl<'a> ImpedanceRecurrence<'a> {
    /// Allocate storage for `capacity` orders in `ctx`.
    pub fn new(
        ctx: &'a ArenaContext,
        net: &'a ReducedNetwork,
        zred: &'a [Vec<Complex64>],
        capacity: usize,
        precision: Precision,
    ) -> Self {
        let m = net.m();
        let mut vm2 = ctx.alloc_vec();
        vm2.extend(net.vset_red[net.npq..].iter().map(|v| v.norm_sqr()));
        Self {
            net,
            zred,
            c: ctx.series_matrix(capacity, m),
            w: ctx.series_matrix(capacity, net.npq),
            r: ctx.series_matrix(capacity, net.npv),
            x: ctx.series_matrix(capacity, net.npv),
            h: ctx.series_matrix(capacity, net.npv),
            current: ctx.complex_buffer(m),
            vm2,
            precision,
        }
    }

    fn fill_current(&mut self, n: usize) {
        let net = self.net;
        for k in 0..net.m() {
            self.current[k] = if n == 0 {
                net.iind[k]
            } else if k < net.npq {
                net.sred[k].conj() * self.w.get(n - 1, net.local_index(k))
            } else {
                let kk = net.local_index(k);
                (2.0 * net.sred[k].re * self.c.get(n - 1, k) - self.h.get(n - 1, kk)
                    + self.r.get(n - 1, kk) * net.iind[k].conj())
                    / self.vm2[kk]
            };
        }
    }

    fn update_reciprocal(&mut self, n: usize, k: usize) {
        let kk = self.net.local_index(k);
        let c0 = self.c.get(0, k).conj();
        let value = if n == 0 {
            c0.inv()
        } else {
            let acc: Complex64 = (0..n)
                .map(|l| self.w.get(l, kk) * self.c.get(n - l, k).conj())
                .sum();
            -acc / c0
        };
        self.w.set(n, kk, self.precision.round(value));
    }

    fn update_pv(&mut self, n: usize, k: usize) {
        let net = self.net;
        let kk = net.local_index(k);

        let r: Complex64 = (0..=n)
            .map(|l| self.c.get(l, k) * self.c.get(n - l, k))
            .sum();
        self.r.set(n, kk, self.precision.round(r));

        let mut x = Complex64::new(0.0, 0.0);
        if let Some(row) = net.yred.outer_view(k) {
            for (i, &y) in row.iter() {
                if i != k {
                    x += (y * self.c.get(n, i)).conj();
                }
            }
        }
        self.x.set(n, kk, self.precision.round(x));

        let conv: Complex64 = (0..=n)
            .map(|i| self.x.get(n - i, kk) * self.r.get(i, kk))
            .sum();
        let h = conv + net.yred_diag(k).conj() * self.c.get(n, k) * self.vm2[kk];
        self.h.set(n, kk, self.precision.round(h));
    }
}

impl CoefficientRecurrence for ImpedanceRecurrence<'_> {
    fn width(&self) -> usize {
        self.net.m()
    }

    fn orders(&self) -> usize {
        self.c.rows()
    }

    fn advance(&mut self) -> bool {
        let n = self.c.push_zero_row();
        self.w.push_zero_row();
        self.r.push_zero_row();
        self.x.push_zero_row();
        self.h.push_zero_row();

        self.fill_current(n);
        let precision = self.precision;
        let row = self.c.row_mut(n);
        for (k, z_row) in self.zred.iter().enumerate() {
            let value: Complex64 = z_row
                .iter()
                .zip(self.current.iter())
                .map(|(z, i)| z * i)
                .sum();
            row[k] = precision.round(value);
        }
        if !self.c.row_is_finite(n) {
            return false;
        }

        for k in 0..self.net.m() {
            if k < self.net.npq {
                self.update_reciprocal(n, k);
            } else {
                self.update_pv(n, k);
            }
        }

        self.w.row_is_finite(n)
            && self.r.row_is_finite(n)
            && self.x.row_is_finite(n)
            && self.h.row_is_finite(n)
    }

    fn voltage(&self, n: usize, k: usize) -> Complex64 {
        self.c.get(n, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::pade::{pade_approximant, PadeResult};
    use crate::sparse::reduce_network;
    use crate::test_utils::{three_bus_pv, two_bus, TestCase};
    use gat_core::FaerSolver;

    fn reduce(case: &TestCase) -> (ReducedNetwork, Vec<Vec<Complex64>>) {
        reduce_network(
            &case.ybus,
            &case.slack,
            &case.power,
            &case.vset,
            &case.types,
            &FaerSolver,
        )
        .unwrap()
    }

    #[test]
    fn germ_is_the_unloaded_network_voltage() {
        // with the slack at 1∠0 every bus sits at 1∠0 before any load is applied
        let case = two_bus(Complex64::new(0.5, 0.2));
        let (net, z) = reduce(&case);
        let ctx = ArenaContext::new();
        let mut rec = ImpedanceRecurrence::new(&ctx, &net, &z, 4, Precision::Double);
        assert!(rec.advance());
        assert_eq!(rec.orders(), 1);
        assert!((rec.voltage(0, 0) - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn first_order_is_the_linear_voltage_drop() {
        // C[1] = Zred · conj(S) / conj(C[0]) and Zred is the line impedance
        let load = Complex64::new(0.5, 0.2);
        let case = two_bus(load);
        let (net, z) = reduce(&case);
        let ctx = ArenaContext::new();
        let mut rec = ImpedanceRecurrence::new(&ctx, &net, &z, 4, Precision::Double);
        assert!(rec.advance());
        assert!(rec.advance());
        let expected = Complex64::new(0.01, 0.1) * (-load).conj();
        assert!((rec.voltage(1, 0) - expected).norm() < 1e-12);
        assert_eq!(rec.voltage_series(0).len(), 2);
    }

    #[test]
    fn continued_series_holds_the_pv_set_point() {
        let case = three_bus_pv();
        let (net, z) = reduce(&case);
        let ctx = ArenaContext::new();
        let mut rec = ImpedanceRecurrence::new(&ctx, &net, &z, 21, Precision::Double);
        for _ in 0..21 {
            assert!(rec.advance());
        }
        // reduced order is [PQ bus 1, PV bus 2]; the raw series diverges at s = 1
        let series = rec.voltage_series(1);
        let partial: Complex64 = series.iter().sum();
        assert!((partial.norm() - 1.01).abs() > 1.0);
        let PadeResult::Value(v_pv) = pade_approximant(&series, 1.0, &FaerSolver) else {
            panic!("PV series should continue");
        };
        assert!((v_pv.norm() - 1.01).abs() < 1e-7);
    }

    #[test]
    fn overflowing_products_surface_as_nan() {
        // conj(S) · W overflows both partial products of the real part,
        // leaving inf − inf in the next current injection
        let case = two_bus(Complex64::new(1e6, 5e5));
        let (net, z) = reduce(&case);
        let ctx = ArenaContext::new();
        let mut rec = ImpedanceRecurrence::new(&ctx, &net, &z, 80, Precision::Double);
        let mut finite = 0;
        while rec.advance() {
            finite += 1;
            assert!(finite < 80, "coefficients never left the finite range");
        }
        assert_eq!(finite, 57);
        assert_eq!(rec.orders(), 58);
        let failed = rec.voltage(57, 0);
        assert!(failed.re.is_nan() || failed.im.is_nan(), "got {}", failed);
        assert!(rec.voltage(56, 0).norm().is_finite());
    }
}
