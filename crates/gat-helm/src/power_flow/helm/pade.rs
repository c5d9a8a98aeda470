//! Padé approximants of a truncated power series.
//!
//! For coefficients `c_0..c_{L+M}` the `[L/M]` approximant `p(s)/q(s)` with
//! `q_0 = 1` matches the series through order `L + M`:
//!
//! ```text
//! Σ_{j=1}^{M} b_j · c_{L+i−j} = −c_{L+i}        i = 1..M     (denominator)
//! a_k = Σ_{j=0}^{min(k,M)} b_j · c_{k−j}         k = 0..L     (numerator)
//! ```
//!
//! Only diagonal approximants are built here (`L = M`). Evaluated at `s = 1`
//! the approximant continues the voltage series past its radius of
//! convergence, which plain summation cannot do.

use gat_core::LinearSystemBackend;
use num_complex::Complex64;

/// Outcome of one approximant evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PadeResult {
    Value(Complex64),
    /// The denominator system (or `q(s)`) was singular
    Singular,
}

/// Diagonal degree usable with `count` coefficients: `L = M = (count − 1) / 2`.
pub fn pade_degree(count: usize) -> usize {
    count.saturating_sub(1) / 2
}

/// Numerator and denominator coefficients `(a, b)` of the diagonal
/// approximant, lowest order first, with `b[0] = 1`.
///
/// `None` when the denominator system is singular.
pub fn pade_coefficients(
    coeffs: &[Complex64],
    backend: &dyn LinearSystemBackend,
) -> Option<(Vec<Complex64>, Vec<Complex64>)> {
    if coeffs.is_empty() {
        return None;
    }
    let m = pade_degree(coeffs.len());
    let one = Complex64::new(1.0, 0.0);
    if m == 0 {
        return Some((vec![coeffs[0]], vec![one]));
    }
    let l = m;

    let matrix: Vec<Vec<Complex64>> = (0..m)
        .map(|i| (0..m).map(|j| coeffs[l - m + i + 1 + j]).collect())
        .collect();
    let rhs: Vec<Complex64> = (0..m).map(|i| -coeffs[l + 1 + i]).collect();
    let x = backend.solve(&matrix, &rhs).ok()?;

    // solution comes out as b_M..b_1
    let mut b = Vec::with_capacity(m + 1);
    b.push(one);
    b.extend(x.iter().rev());

    let a: Vec<Complex64> = (0..=l)
        .map(|k| (0..=k.min(m)).map(|j| coeffs[k - j] * b[j]).sum())
        .collect();
    Some((a, b))
}

/// Evaluate the diagonal Padé approximant of `coeffs` at `s`.
pub fn pade_approximant(
    coeffs: &[Complex64],
    s: f64,
    backend: &dyn LinearSystemBackend,
) -> PadeResult {
    let Some((a, b)) = pade_coefficients(coeffs, backend) else {
        return PadeResult::Singular;
    };

    let p = horner(&a, s);
    let q = horner(&b, s);
    if q == Complex64::new(0.0, 0.0) {
        return PadeResult::Singular;
    }
    let value = p / q;
    if value.re.is_finite() && value.im.is_finite() {
        PadeResult::Value(value)
    } else {
        PadeResult::Singular
    }
}

fn horner(coeffs: &[Complex64], s: f64) -> Complex64 {
    coeffs
        .iter()
        .rev()
        .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * s + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gat_core::{FaerSolver, GaussSolver};

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn degree_uses_an_odd_number_of_coefficients() {
        assert_eq!(pade_degree(0), 0);
        assert_eq!(pade_degree(1), 0);
        assert_eq!(pade_degree(2), 0);
        assert_eq!(pade_degree(3), 1);
        assert_eq!(pade_degree(10), 4);
        assert_eq!(pade_degree(11), 5);
    }

    #[test]
    fn geometric_series_is_reproduced_exactly() {
        let r = c(0.3, 0.4);
        let coeffs = vec![c(1.0, 0.0), r, r * r];
        let expected = c(1.0, 0.0) / (c(1.0, 0.0) - r);
        for backend in [&GaussSolver as &dyn LinearSystemBackend, &FaerSolver] {
            match pade_approximant(&coeffs, 1.0, backend) {
                PadeResult::Value(v) => assert!((v - expected).norm() < 1e-12),
                PadeResult::Singular => panic!("geometric series should not be singular"),
            }
        }
    }

    #[test]
    fn continues_log_series_at_the_boundary() {
        // ln(1 + s) at s = 1: the partial sum is still 5e-2 off after ten terms
        let coeffs: Vec<Complex64> = (0..11)
            .map(|n| {
                if n == 0 {
                    c(0.0, 0.0)
                } else {
                    let sign = if n % 2 == 1 { 1.0 } else { -1.0 };
                    c(sign / n as f64, 0.0)
                }
            })
            .collect();
        let partial: Complex64 = coeffs.iter().sum();
        assert!((partial.re - std::f64::consts::LN_2).abs() > 1e-2);

        let PadeResult::Value(v) = pade_approximant(&coeffs, 1.0, &FaerSolver) else {
            panic!("log series should not be singular");
        };
        assert!((v.re - std::f64::consts::LN_2).abs() < 1e-6);
        assert!(v.im.abs() < 1e-12);
    }

    #[test]
    fn constant_series_is_singular() {
        let coeffs = vec![c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)];
        assert_eq!(
            pade_approximant(&coeffs, 1.0, &GaussSolver),
            PadeResult::Singular
        );
        assert_eq!(
            pade_approximant(&coeffs, 1.0, &FaerSolver),
            PadeResult::Singular
        );
    }

    #[test]
    fn short_series_returns_germ() {
        assert_eq!(
            pade_approximant(&[c(0.9, -0.1)], 1.0, &FaerSolver),
            PadeResult::Value(c(0.9, -0.1))
        );
        assert_eq!(pade_approximant(&[], 1.0, &FaerSolver), PadeResult::Singular);
    }

    #[test]
    fn coefficients_of_a_simple_pole() {
        // 1/(1 - r·s): numerator 1, denominator 1 - r·s
        let r = c(0.3, 0.4);
        let (a, b) = pade_coefficients(&[c(1.0, 0.0), r, r * r], &FaerSolver).unwrap();
        assert_eq!(a.len(), 2);
        assert!((a[0] - c(1.0, 0.0)).norm() < 1e-12);
        assert!(a[1].norm() < 1e-12);
        assert_eq!(b[0], c(1.0, 0.0));
        assert!((b[1] + r).norm() < 1e-12);
        assert!(pade_coefficients(&[], &FaerSolver).is_none());
    }

    #[test]
    fn evaluation_point_is_respected() {
        // 1/(1 - s/2) at s = 0.5 is 4/3
        let coeffs = vec![c(1.0, 0.0), c(0.5, 0.0), c(0.25, 0.0)];
        let PadeResult::Value(v) = pade_approximant(&coeffs, 0.5, &GaussSolver) else {
            panic!("unexpected singular result");
        };
        assert!((v.re - 4.0 / 3.0).abs() < 1e-12);
    }
}
