//! Turning coefficient series into voltage estimates.
//!
//! One [`SeriesAccelerator`] is chosen per solve. It reads the coefficients
//! of the recurrence and overwrites the estimates it refreshes; estimates it
//! does not touch keep their previous value.

use gat_core::LinearSystemBackend;
use num_complex::Complex64;
use tracing::debug;

use super::epsilon::EpsilonTables;
use super::pade::{pade_approximant, PadeResult};
use super::precision::Precision;
use super::recurrence::CoefficientRecurrence;
use crate::arena::ArenaContext;

/// What one refresh did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refresh {
    /// Estimates were recomputed at this order
    pub refreshed: bool,
    /// Buses whose Padé system was singular and fell back to the partial sum
    pub fallbacks: usize,
}

pub trait SeriesAccelerator {
    /// Update `estimate` after order `n` of `series` has been computed.
    fn refresh(
        &mut self,
        series: &dyn CoefficientRecurrence,
        n: usize,
        estimate: &mut [Complex64],
    ) -> Refresh;
}

/// Diagonal Padé approximants at `s = 1`.
///
/// Order 0 takes the germ. Later estimates are rebuilt at even orders only,
/// where the coefficient count is odd and the diagonal approximant uses all
/// of them.
pub struct PadeAccelerator<'a> {
    backend: &'a dyn LinearSystemBackend,
}

impl<'a> PadeAccelerator<'a> {
    pub fn new(backend: &'a dyn LinearSystemBackend) -> Self {
        Self { backend }
    }
}

impl SeriesAccelerator for PadeAccelerator<'_> {
    fn refresh(
        &mut self,
        series: &dyn CoefficientRecurrence,
        n: usize,
        estimate: &mut [Complex64],
    ) -> Refresh {
        if n == 0 {
            for (k, e) in estimate.iter_mut().enumerate() {
                *e = series.voltage(0, k);
            }
            return Refresh {
                refreshed: true,
                fallbacks: 0,
            };
        }
        if n % 2 == 1 {
            return Refresh::default();
        }

        let mut fallbacks = 0;
        for (k, e) in estimate.iter_mut().enumerate() {
            let coeffs = series.voltage_series(k);
            *e = match pade_approximant(&coeffs, 1.0, self.backend) {
                PadeResult::Value(v) => v,
                PadeResult::Singular => {
                    debug!(order = n, bus = k, "singular Padé system, using partial sum");
                    fallbacks += 1;
                    coeffs.iter().sum()
                }
            };
        }
        Refresh {
            refreshed: true,
            fallbacks,
        }
    }
}

/// Wynn epsilon on the partial sums, refreshed at every order.
pub struct EpsilonAccelerator<'a> {
    tables: EpsilonTables<'a>,
}

impl<'a> EpsilonAccelerator<'a> {
    pub fn new(ctx: &'a ArenaContext, width: usize, depth: usize, precision: Precision) -> Self {
        Self {
            tables: EpsilonTables::new(ctx, width, depth, precision),
        }
    }
}

impl SeriesAccelerator for EpsilonAccelerator<'_> {
    fn refresh(
        &mut self,
        series: &dyn CoefficientRecurrence,
        n: usize,
        estimate: &mut [Complex64],
    ) -> Refresh {
        for (k, e) in estimate.iter_mut().enumerate() {
            *e = self.tables.push(k, n, series.voltage(n, k));
        }
        Refresh {
            refreshed: true,
            fallbacks: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gat_core::GaussSolver;

    /// Fixed series per bus, for driving accelerators without a network.
    struct FixedSeries {
        columns: Vec<Vec<Complex64>>,
        orders: usize,
    }

    impl CoefficientRecurrence for FixedSeries {
        fn width(&self) -> usize {
            self.columns.len()
        }

        fn orders(&self) -> usize {
            self.orders
        }

        fn advance(&mut self) -> bool {
            self.orders += 1;
            true
        }

        fn voltage(&self, n: usize, k: usize) -> Complex64 {
            self.columns[k][n]
        }
    }

    fn geometric(r: f64, len: usize) -> Vec<Complex64> {
        (0..len).map(|n| Complex64::new(r.powi(n as i32), 0.0)).collect()
    }

    #[test]
    fn pade_refreshes_on_even_orders_only() {
        let mut series = FixedSeries {
            columns: vec![geometric(0.5, 5)],
            orders: 0,
        };
        let mut pade = PadeAccelerator::new(&GaussSolver);
        let mut estimate = vec![Complex64::new(0.0, 0.0)];

        let mut steps = Vec::new();
        for n in 0..5 {
            series.advance();
            steps.push(pade.refresh(&series, n, &mut estimate));
            match n {
                // odd order keeps the germ
                1 => assert_eq!(estimate[0], Complex64::new(1.0, 0.0)),
                2 => assert!((estimate[0].re - 2.0).abs() < 1e-12),
                _ => {}
            }
        }
        let refreshed: Vec<bool> = steps.iter().map(|s| s.refreshed).collect();
        assert_eq!(refreshed, vec![true, false, true, false, true]);

        // a geometric series is [0/1] rational, so the [2/2] system is singular
        assert_eq!(steps[4].fallbacks, 1);
        assert!((estimate[0].re - 1.9375).abs() < 1e-12);
    }

    #[test]
    fn singular_pade_falls_back_to_partial_sum() {
        let series = FixedSeries {
            columns: vec![vec![
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 0.0),
                Complex64::new(0.0, 0.0),
            ]],
            orders: 3,
        };
        let mut pade = PadeAccelerator::new(&GaussSolver);
        let mut estimate = vec![Complex64::new(0.0, 0.0)];
        let step = pade.refresh(&series, 2, &mut estimate);
        assert_eq!(step.fallbacks, 1);
        assert_eq!(estimate[0], Complex64::new(1.0, 0.0));
    }

    #[test]
    fn epsilon_refreshes_every_order() {
        let ctx = ArenaContext::new();
        let mut series = FixedSeries {
            columns: vec![geometric(0.5, 4), geometric(-0.5, 4)],
            orders: 0,
        };
        let mut eps = EpsilonAccelerator::new(&ctx, 2, 4, Precision::Double);
        let mut estimate = vec![Complex64::new(0.0, 0.0); 2];
        for n in 0..4 {
            series.advance();
            assert!(eps.refresh(&series, n, &mut estimate).refreshed);
        }
        assert!((estimate[0].re - 2.0).abs() < 1e-12);
        assert!((estimate[1].re - 2.0 / 3.0).abs() < 1e-12);
    }
}
