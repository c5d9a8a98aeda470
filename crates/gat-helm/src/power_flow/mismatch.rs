//! Bus power recovery and power mismatch.
//!
//! ```text
//! S_calc = diag(V) · conj(Y · V)
//!
//! PV bus:    Q_k = Im(S_calc,k), P_k kept as specified
//! Slack bus: S_k = S_calc,k      (P and Q both float)
//!
//! error  = S_specified − S_calc     (after the recovery above)
//! norm_f = ‖error‖∞
//! ```
//!
//! Everything here is a pure function of its inputs.

use num_complex::Complex64;
use sprs::CsMat;

/// Result of one mismatch evaluation.
#[derive(Debug, Clone)]
pub struct PowerMismatch {
    /// Bus powers computed from the voltages
    pub scalc: Vec<Complex64>,
    /// Specified powers with PV reactive power and slack power recovered
    pub specified: Vec<Complex64>,
    /// Infinity norm of `specified - scalc`
    pub norm_f: f64,
}

/// Bus current injections `I = Y · V` (CSR or CSC storage).
pub fn current_injections(y: &CsMat<Complex64>, v: &[Complex64]) -> Vec<Complex64> {
    let mut current = vec![Complex64::new(0.0, 0.0); y.rows()];
    if y.is_csr() {
        for (row, row_vec) in y.outer_iterator().enumerate() {
            for (col, &value) in row_vec.iter() {
                current[row] += value * v[col];
            }
        }
    } else {
        for (col, col_vec) in y.outer_iterator().enumerate() {
            for (row, &value) in col_vec.iter() {
                current[row] += value * v[col];
            }
        }
    }
    current
}

/// Bus power injections `S = V · conj(Y · V)`.
pub fn compute_power(y: &CsMat<Complex64>, v: &[Complex64]) -> Vec<Complex64> {
    current_injections(y, v)
        .iter()
        .zip(v.iter())
        .map(|(i, vk)| vk * i.conj())
        .collect()
}

/// Specified powers with the floating quantities replaced by computed ones.
pub fn recover_injections(
    scalc: &[Complex64],
    specified: &[Complex64],
    pv: &[usize],
    slack: &[usize],
) -> Vec<Complex64> {
    let mut recovered = specified.to_vec();
    for &k in pv {
        recovered[k] = Complex64::new(specified[k].re, scalc[k].im);
    }
    for &k in slack {
        recovered[k] = scalc[k];
    }
    recovered
}

/// Infinity norm of a complex vector.
pub fn inf_norm(values: &[Complex64]) -> f64 {
    values.iter().fold(0.0_f64, |acc, v| {
        let m = v.norm();
        if m.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(m)
        }
    })
}

/// Evaluate the power mismatch of voltage vector `v`.
pub fn evaluate_mismatch(
    y: &CsMat<Complex64>,
    v: &[Complex64],
    specified: &[Complex64],
    pv: &[usize],
    slack: &[usize],
) -> PowerMismatch {
    let scalc = compute_power(y, v);
    let specified = recover_injections(&scalc, specified, pv, slack);
    let error: Vec<Complex64> = specified
        .iter()
        .zip(scalc.iter())
        .map(|(s, c)| s - c)
        .collect();
    PowerMismatch {
        norm_f: inf_norm(&error),
        scalc,
        specified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{line, ybus_from_branches};

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn flat_voltage_on_lossless_network_has_no_flow() {
        let y = ybus_from_branches(3, &[(0, 1, line(0.01, 0.1)), (1, 2, line(0.02, 0.1))], &[]);
        let v = vec![c(1.0, 0.0); 3];
        let s = compute_power(&y, &v);
        assert!(s.iter().all(|sk| sk.norm() < 1e-12));
    }

    #[test]
    fn two_bus_power_matches_hand_calculation() {
        let yl = line(0.01, 0.1);
        let y = ybus_from_branches(2, &[(0, 1, yl)], &[]);
        let v = vec![c(1.0, 0.0), c(0.95, -0.05)];
        let s = compute_power(&y, &v);

        let i1 = yl * (v[1] - v[0]);
        let expected = v[1] * i1.conj();
        assert!((s[1] - expected).norm() < 1e-12);
        // losses are non-negative
        assert!((s[0] + s[1]).re >= 0.0);
    }

    #[test]
    fn recovery_floats_pv_q_and_slack_s() {
        let scalc = vec![c(1.0, 2.0), c(-0.5, 0.3), c(0.4, -0.7)];
        let target = vec![c(0.0, 0.0), c(-0.5, -0.2), c(0.4, 0.0)];
        let rec = recover_injections(&scalc, &target, &[2], &[0]);
        assert_eq!(rec[0], scalc[0]);
        assert_eq!(rec[1], target[1]);
        assert_eq!(rec[2], c(0.4, -0.7));
    }

    #[test]
    fn mismatch_only_counts_specified_quantities() {
        let y = ybus_from_branches(2, &[(0, 1, line(0.01, 0.1))], &[]);
        let v = vec![c(1.0, 0.0), c(0.98, -0.04)];
        let scalc = compute_power(&y, &v);

        // PQ bus specified exactly: zero mismatch, whatever the slack does
        let target = vec![c(9.0, 9.0), scalc[1]];
        let mm = evaluate_mismatch(&y, &v, &target, &[], &[0]);
        assert!(mm.norm_f < 1e-12);

        // Same bus as PV: a wrong Q no longer matters, a wrong P does
        let target = vec![c(0.0, 0.0), c(scalc[1].re, 5.0)];
        assert!(evaluate_mismatch(&y, &v, &target, &[1], &[0]).norm_f < 1e-12);
        let target = vec![c(0.0, 0.0), c(scalc[1].re + 0.1, 0.0)];
        let mm = evaluate_mismatch(&y, &v, &target, &[1], &[0]);
        assert!((mm.norm_f - 0.1).abs() < 1e-12);
    }

    #[test]
    fn csc_storage_gives_same_currents() {
        let y = ybus_from_branches(
            3,
            &[(0, 1, line(0.01, 0.1)), (1, 2, line(0.02, 0.3))],
            &[(2, c(0.0, 0.05))],
        );
        let v = vec![c(1.0, 0.0), c(0.97, -0.02), c(0.95, -0.05)];
        let a = current_injections(&y, &v);
        let b = current_injections(&y.to_csc(), &v);
        for (x, z) in a.iter().zip(b.iter()) {
            assert!((x - z).norm() < 1e-12);
        }
    }

    #[test]
    fn inf_norm_propagates_nan() {
        assert_eq!(inf_norm(&[c(3.0, 4.0), c(1.0, 0.0)]), 5.0);
        assert!(inf_norm(&[c(f64::NAN, 0.0), c(1.0, 0.0)]).is_nan());
        assert_eq!(inf_norm(&[]), 0.0);
    }
}
