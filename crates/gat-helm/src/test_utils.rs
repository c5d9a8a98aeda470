//! Small network builders shared by unit tests, integration tests and benches.

use num_complex::Complex64;
use sprs::{CsMat, TriMat};

use gat_core::BusType;

/// Series admittance of a line with resistance `r` and reactance `x` (p.u.).
pub fn line(r: f64, x: f64) -> Complex64 {
    Complex64::new(r, x).inv()
}

/// Assemble a bus admittance matrix from series branches and shunts.
///
/// `branches` holds `(from, to, y_series)`, `shunts` holds `(bus, y_shunt)`.
pub fn ybus_from_branches(
    n_bus: usize,
    branches: &[(usize, usize, Complex64)],
    shunts: &[(usize, Complex64)],
) -> CsMat<Complex64> {
    let mut tri = TriMat::new((n_bus, n_bus));
    for &(from, to, y) in branches {
        tri.add_triplet(from, from, y);
        tri.add_triplet(to, to, y);
        tri.add_triplet(from, to, -y);
        tri.add_triplet(to, from, -y);
    }
    for &(bus, y) in shunts {
        tri.add_triplet(bus, bus, y);
    }
    tri.to_csr()
}

/// Input data of one power flow case.
#[derive(Debug, Clone)]
pub struct TestCase {
    pub ybus: CsMat<Complex64>,
    pub slack: Vec<usize>,
    pub power: Vec<Complex64>,
    pub vset: Vec<Complex64>,
    pub types: Vec<BusType>,
}

/// Slack feeding one PQ load through an R-L line.
pub fn two_bus(load: Complex64) -> TestCase {
    TestCase {
        ybus: ybus_from_branches(2, &[(0, 1, line(0.01, 0.1))], &[]),
        slack: vec![0],
        power: vec![Complex64::new(0.0, 0.0), -load],
        vset: vec![Complex64::new(1.0, 0.0); 2],
        types: vec![BusType::Slack, BusType::PQ],
    }
}

/// Meshed slack / PQ / PV triangle.
pub fn three_bus_pv() -> TestCase {
    three_bus_pv_with_shunt(Complex64::new(0.0, 0.0))
}

/// Triangle with the same shunt admittance on every bus.
pub fn three_bus_pv_with_shunt(shunt: Complex64) -> TestCase {
    let shunts: Vec<(usize, Complex64)> = if shunt == Complex64::new(0.0, 0.0) {
        Vec::new()
    } else {
        (0..3).map(|b| (b, shunt)).collect()
    };
    TestCase {
        ybus: ybus_from_branches(
            3,
            &[
                (0, 1, line(0.02, 0.08)),
                (0, 2, line(0.01, 0.06)),
                (1, 2, line(0.03, 0.12)),
            ],
            &shunts,
        ),
        slack: vec![0],
        power: vec![
            Complex64::new(0.0, 0.0),
            Complex64::new(-0.9, -0.3),
            Complex64::new(0.4, 0.0),
        ],
        vset: vec![
            Complex64::new(1.02, 0.0),
            Complex64::new(1.0, 0.0),
            Complex64::new(1.01, 0.0),
        ],
        types: vec![BusType::Slack, BusType::PQ, BusType::PV],
    }
}

/// Radial feeder: slack at bus 0, `n_bus - 1` identical PQ loads in a chain.
pub fn ladder(n_bus: usize, load: Complex64) -> TestCase {
    let branches: Vec<(usize, usize, Complex64)> = (1..n_bus)
        .map(|b| (b - 1, b, line(0.002, 0.01)))
        .collect();
    let mut power = vec![-load; n_bus];
    power[0] = Complex64::new(0.0, 0.0);
    let mut types = vec![BusType::PQ; n_bus];
    types[0] = BusType::Slack;
    TestCase {
        ybus: ybus_from_branches(n_bus, &branches, &[]),
        slack: vec![0],
        power,
        vset: vec![Complex64::new(1.0, 0.0); n_bus],
        types,
    }
}
