//! Wynn's epsilon algorithm on the running partial sums of a series.
//!
//! Each bus keeps one ascending diagonal of the epsilon table. Appending the
//! partial sum `S_n` walks that diagonal back to `ε_0`, so order `n` costs
//! O(n) per bus and only `n + 1` cells are stored:
//!
//! ```text
//! ε_{-1} = 0,  ε_0 = S_n
//! ε_{k+1}^{(n)} = ε_{k-1}^{(n+1)} + 1 / (ε_k^{(n+1)} − ε_k^{(n)})
//! ```
//!
//! Even columns carry the accelerated estimates; the cell returned is `E[0]`
//! for even `n` and `E[1]` for odd `n`.

use num_complex::Complex64;

use super::precision::Precision;
use crate::arena::ArenaContext;

/// Advance one epsilon table by the partial sum of order `n`.
///
/// `table` must have room for `n + 1` entries and hold the state left by
/// orders `0..n`. A difference whose magnitude does not exceed
/// `precision.tiny()` is replaced by `precision.huge()` instead of dividing.
pub fn epsilon_step(
    table: &mut [Complex64],
    partial_sum: Complex64,
    n: usize,
    precision: Precision,
) -> Complex64 {
    table[n] = partial_sum;
    if n == 0 {
        return partial_sum;
    }

    let tiny = precision.tiny();
    let huge = Complex64::new(precision.huge(), 0.0);
    let mut aux2 = Complex64::new(0.0, 0.0);
    for j in (1..=n).rev() {
        let aux1 = aux2;
        aux2 = table[j - 1];
        let diff = table[j] - aux2;
        table[j - 1] = if diff.norm() <= tiny {
            huge
        } else {
            aux1 + diff.inv()
        };
    }

    if n % 2 == 0 {
        table[0]
    } else {
        table[1]
    }
}

/// Epsilon tables and partial sums for every bus of one solve.
pub struct EpsilonTables<'a> {
    /// Bus-major: bus `k` owns `cells[k * depth..(k + 1) * depth]`
    cells: bumpalo::collections::Vec<'a, Complex64>,
    sums: bumpalo::collections::Vec<'a, Complex64>,
    depth: usize,
    precision: Precision,
}

impl<'a> EpsilonTables<'a> {
    /// Tables for `width` buses and orders `0..depth`.
    pub fn new(ctx: &'a ArenaContext, width: usize, depth: usize, precision: Precision) -> Self {
        Self {
            cells: ctx.complex_buffer(width * depth),
            sums: ctx.complex_buffer(width),
            depth,
            precision,
        }
    }

    /// Add the order-`n` coefficient of bus `k` and return its new estimate.
    pub fn push(&mut self, k: usize, n: usize, coefficient: Complex64) -> Complex64 {
        self.sums[k] += coefficient;
        let partial = self.sums[k];
        let table = &mut self.cells[k * self.depth..(k + 1) * self.depth];
        epsilon_step(table, partial, n, self.precision)
    }

    pub fn partial_sum(&self, k: usize) -> Complex64 {
        self.sums[k]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn run(coeffs: &[Complex64], precision: Precision) -> Complex64 {
        let mut table = vec![c(0.0); coeffs.len()];
        let mut sum = c(0.0);
        let mut estimate = c(0.0);
        for (n, &a) in coeffs.iter().enumerate() {
            sum += a;
            estimate = epsilon_step(&mut table, sum, n, precision);
        }
        estimate
    }

    #[test]
    fn first_order_returns_partial_sum() {
        let mut table = vec![c(0.0); 4];
        assert_eq!(epsilon_step(&mut table, c(0.7), 0, Precision::Double), c(0.7));
        assert_eq!(table[0], c(0.7));
    }

    #[test]
    fn log_series_is_accelerated() {
        let coeffs: Vec<Complex64> = (0..11)
            .map(|n| {
                if n == 0 {
                    c(0.0)
                } else if n % 2 == 1 {
                    c(1.0 / n as f64)
                } else {
                    c(-1.0 / n as f64)
                }
            })
            .collect();
        let estimate = run(&coeffs, Precision::Double);
        assert!((estimate.re - std::f64::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn square_root_series_is_accelerated() {
        // binomial series of sqrt(1 + s)
        let mut coeffs = vec![c(1.0)];
        for n in 1..11 {
            let prev = coeffs[n - 1].re;
            coeffs.push(c(prev * (0.5 - (n - 1) as f64) / n as f64));
        }
        let estimate = run(&coeffs, Precision::Double);
        assert!((estimate.re - std::f64::consts::SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn stalled_sum_uses_huge_sentinel() {
        // after the first term nothing changes, every difference is zero
        let mut table = vec![c(0.0); 3];
        epsilon_step(&mut table, c(1.0), 0, Precision::Double);
        let odd = epsilon_step(&mut table, c(1.0), 1, Precision::Double);
        assert_eq!(odd, c(1.0));
        assert_eq!(table[0], c(f64::MAX));
        let even = epsilon_step(&mut table, c(1.0), 2, Precision::Double);
        assert_eq!(even, c(f64::MAX));

        let mut table = vec![c(0.0); 2];
        epsilon_step(&mut table, c(1.0), 0, Precision::Single);
        epsilon_step(&mut table, c(1.0), 1, Precision::Single);
        assert_eq!(table[0], c(f32::MAX as f64));
    }

    #[test]
    fn tables_keep_buses_apart() {
        let ctx = ArenaContext::new();
        let mut tables = EpsilonTables::new(&ctx, 2, 4, Precision::Double);
        let r = 0.5_f64;
        let mut last = c(0.0);
        for n in 0..4 {
            last = tables.push(0, n, c(r.powi(n as i32)));
            tables.push(1, n, c(0.0));
        }
        assert!((last.re - 2.0).abs() < 1e-12);
        assert!((tables.partial_sum(0).re - 1.875).abs() < 1e-15);
        assert_eq!(tables.partial_sum(1), c(0.0));
    }
}
