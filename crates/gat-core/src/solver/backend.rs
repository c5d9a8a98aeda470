use faer::{prelude::*, solvers::PartialPivLu, Mat};
use num_complex::Complex64;
use thiserror::Error;

/// Relative residual above which a solution is rejected as singular.
const RESIDUAL_TOLERANCE: f64 = 1e-8;

/// Errors from dense linear solves
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    #[error("singular matrix")]
    Singular,

    #[error("rhs length ({rhs}) does not match matrix dimension {n}")]
    DimensionMismatch { rhs: usize, n: usize },

    #[error("matrix must be square")]
    NotSquare,
}

/// Trait for solving dense complex linear systems (Ax = b).
///
/// This is for linear algebra, not optimization solvers. Right-hand sides
/// are passed column by column so one factorization can serve many of them.
pub trait LinearSystemBackend: Send + Sync {
    /// Solve `A X = B` for every column of `B`.
    fn solve_many(
        &self,
        matrix: &[Vec<Complex64>],
        rhs_columns: &[Vec<Complex64>],
    ) -> Result<Vec<Vec<Complex64>>, SolveError>;

    /// Solve the linear system Ax = b
    fn solve(
        &self,
        matrix: &[Vec<Complex64>],
        rhs: &[Complex64],
    ) -> Result<Vec<Complex64>, SolveError> {
        let mut columns = self.solve_many(matrix, &[rhs.to_vec()])?;
        Ok(columns.pop().unwrap_or_default())
    }

    /// Dense inverse, returned row-major.
    fn invert(&self, matrix: &[Vec<Complex64>]) -> Result<Vec<Vec<Complex64>>, SolveError> {
        let n = matrix.len();
        let identity: Vec<Vec<Complex64>> = (0..n)
            .map(|j| {
                (0..n)
                    .map(|i| {
                        if i == j {
                            Complex64::new(1.0, 0.0)
                        } else {
                            Complex64::new(0.0, 0.0)
                        }
                    })
                    .collect()
            })
            .collect();
        let columns = self.solve_many(matrix, &identity)?;
        Ok((0..n)
            .map(|i| columns.iter().map(|col| col[i]).collect())
            .collect())
    }
}

fn check_dimensions(
    matrix: &[Vec<Complex64>],
    rhs_columns: &[Vec<Complex64>],
) -> Result<(), SolveError> {
    let n = matrix.len();
    if matrix.iter().any(|row| row.len() != n) {
        return Err(SolveError::NotSquare);
    }
    if let Some(col) = rhs_columns.iter().find(|col| col.len() != n) {
        return Err(SolveError::DimensionMismatch { rhs: col.len(), n });
    }
    Ok(())
}

fn max_abs(matrix: &[Vec<Complex64>]) -> f64 {
    matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.norm()))
}

/// Reject solutions with NaN/Inf entries or a large relative residual.
fn verify_solution(
    matrix: &[Vec<Complex64>],
    rhs_columns: &[Vec<Complex64>],
    columns: &[Vec<Complex64>],
    scale: f64,
) -> Result<(), SolveError> {
    for (x, b) in columns.iter().zip(rhs_columns.iter()) {
        if x.iter().any(|v| !v.re.is_finite() || !v.im.is_finite()) {
            return Err(SolveError::Singular);
        }
        let x_scale = x.iter().fold(0.0_f64, |acc, v| acc.max(v.norm()));
        let b_scale = b.iter().fold(0.0_f64, |acc, v| acc.max(v.norm()));
        let bound = RESIDUAL_TOLERANCE * (scale * x_scale + b_scale);
        for (row, &bi) in matrix.iter().zip(b.iter()) {
            let ax: Complex64 = row.iter().zip(x.iter()).map(|(a, xi)| a * xi).sum();
            if (ax - bi).norm() > bound {
                return Err(SolveError::Singular);
            }
        }
    }
    Ok(())
}

/// Gauss-Jordan elimination with partial pivoting on complex entries.
///
/// Only exactly zero or non-finite pivots stop the elimination; conditioning
/// is judged afterwards from the residual.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve_many(
        &self,
        matrix: &[Vec<Complex64>],
        rhs_columns: &[Vec<Complex64>],
    ) -> Result<Vec<Vec<Complex64>>, SolveError> {
        check_dimensions(matrix, rhs_columns)?;
        let n = matrix.len();
        if n == 0 {
            return Ok(vec![Vec::new(); rhs_columns.len()]);
        }

        let scale = max_abs(matrix);
        if scale == 0.0 || !scale.is_finite() {
            return Err(SolveError::Singular);
        }

        let mut a = matrix.to_vec();
        // b[row][col], so row swaps move whole right-hand-side rows
        let mut b: Vec<Vec<Complex64>> = (0..n)
            .map(|i| rhs_columns.iter().map(|col| col[i]).collect())
            .collect();

        for i in 0..n {
            let mut pivot = i;
            for row in i + 1..n {
                if a[row][i].norm() > a[pivot][i].norm() {
                    pivot = row;
                }
            }
            if pivot != i {
                a.swap(i, pivot);
                b.swap(i, pivot);
            }

            let diag = a[i][i];
            let magnitude = diag.norm();
            if magnitude == 0.0 || !magnitude.is_finite() {
                return Err(SolveError::Singular);
            }

            for value in a[i][i..].iter_mut() {
                *value /= diag;
            }
            for value in b[i].iter_mut() {
                *value /= diag;
            }

            let pivot_segment = a[i][i..].to_vec();
            let pivot_rhs = b[i].clone();
            for row in 0..n {
                if row == i {
                    continue;
                }
                let factor = a[row][i];
                if factor == Complex64::new(0.0, 0.0) {
                    continue;
                }
                for (target, &p) in a[row][i..].iter_mut().zip(pivot_segment.iter()) {
                    *target -= factor * p;
                }
                for (target, &p) in b[row].iter_mut().zip(pivot_rhs.iter()) {
                    *target -= factor * p;
                }
            }
        }

        let columns: Vec<Vec<Complex64>> = (0..rhs_columns.len())
            .map(|col| (0..n).map(|i| b[i][col]).collect())
            .collect();
        verify_solution(matrix, rhs_columns, &columns, scale)?;
        Ok(columns)
    }
}

/// faer partial-pivoting LU on the real expansion `[[Re, -Im], [Im, Re]]`.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn solve_many(
        &self,
        matrix: &[Vec<Complex64>],
        rhs_columns: &[Vec<Complex64>],
    ) -> Result<Vec<Vec<Complex64>>, SolveError> {
        check_dimensions(matrix, rhs_columns)?;
        let n = matrix.len();
        if n == 0 {
            return Ok(vec![Vec::new(); rhs_columns.len()]);
        }

        let scale = max_abs(matrix);
        if scale == 0.0 || !scale.is_finite() {
            return Err(SolveError::Singular);
        }

        let k = rhs_columns.len();
        let mat = Mat::from_fn(2 * n, 2 * n, |i, j| {
            let v = matrix[i % n][j % n];
            match (i < n, j < n) {
                (true, true) | (false, false) => v.re,
                (true, false) => -v.im,
                (false, true) => v.im,
            }
        });
        let rhs_mat = Mat::from_fn(2 * n, k, |i, j| {
            let v = rhs_columns[j][i % n];
            if i < n {
                v.re
            } else {
                v.im
            }
        });

        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let mut columns = Vec::with_capacity(k);
        for j in 0..k {
            let mut col = Vec::with_capacity(n);
            for i in 0..n {
                col.push(Complex64::new(sol.read(i, j), sol.read(n + i, j)));
            }
            columns.push(col);
        }

        verify_solution(matrix, rhs_columns, &columns, scale)?;
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn sample_system() -> (Vec<Vec<Complex64>>, Vec<Complex64>) {
        let a = vec![
            vec![c(4.0, 1.0), c(-1.0, 0.5), c(0.0, 0.0)],
            vec![c(-1.0, 0.5), c(3.0, -2.0), c(1.0, 1.0)],
            vec![c(0.0, 0.0), c(1.0, 1.0), c(2.0, 0.0)],
        ];
        let b = vec![c(1.0, 0.0), c(0.0, 2.0), c(-1.0, 1.0)];
        (a, b)
    }

    fn residual(a: &[Vec<Complex64>], x: &[Complex64], b: &[Complex64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(row, &bi)| {
                let ax: Complex64 = row.iter().zip(x.iter()).map(|(aij, xj)| aij * xj).sum();
                (ax - bi).norm()
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn gauss_and_faer_agree_on_complex_system() {
        let (a, b) = sample_system();
        let x_gauss = GaussSolver.solve(&a, &b).unwrap();
        let x_faer = FaerSolver.solve(&a, &b).unwrap();

        assert!(residual(&a, &x_gauss, &b) < 1e-12);
        for (g, f) in x_gauss.iter().zip(x_faer.iter()) {
            assert!((g - f).norm() < 1e-10, "gauss={}, faer={}", g, f);
        }
    }

    #[test]
    fn invert_gives_identity_product() {
        let (a, _) = sample_system();
        for backend in [&GaussSolver as &dyn LinearSystemBackend, &FaerSolver] {
            let inv = backend.invert(&a).unwrap();
            for i in 0..3 {
                for j in 0..3 {
                    let p: Complex64 = (0..3).map(|k| a[i][k] * inv[k][j]).sum();
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert!((p - c(expected, 0.0)).norm() < 1e-10);
                }
            }
        }
    }

    #[test]
    fn singular_matrix_is_reported() {
        let a = vec![vec![c(1.0, 1.0), c(2.0, 2.0)], vec![c(2.0, 2.0), c(4.0, 4.0)]];
        let b = vec![c(1.0, 0.0), c(0.0, 1.0)];
        assert_eq!(GaussSolver.solve(&a, &b), Err(SolveError::Singular));
        assert_eq!(FaerSolver.solve(&a, &b), Err(SolveError::Singular));

        let zeros = vec![vec![c(0.0, 0.0); 2]; 2];
        assert_eq!(FaerSolver.invert(&zeros), Err(SolveError::Singular));
    }

    #[test]
    fn tiny_pivots_are_accepted() {
        let a = vec![vec![c(1e-20, 0.0), c(0.0, 0.0)], vec![c(0.0, 0.0), c(1.0, 0.0)]];
        let b = vec![c(1e-20, 1e-20), c(2.0, 0.0)];
        for backend in [&GaussSolver as &dyn LinearSystemBackend, &FaerSolver] {
            let x = backend.solve(&a, &b).unwrap();
            assert!((x[0] - c(1.0, 1.0)).norm() < 1e-12, "x0 = {}", x[0]);
            assert!((x[1] - c(2.0, 0.0)).norm() < 1e-12);
        }
    }

    #[test]
    fn gauss_rejects_non_finite_entries() {
        let a = vec![vec![c(f64::NAN, 0.0), c(1.0, 0.0)], vec![c(1.0, 0.0), c(1.0, 0.0)]];
        let b = vec![c(1.0, 0.0), c(1.0, 0.0)];
        assert_eq!(GaussSolver.solve(&a, &b), Err(SolveError::Singular));
    }

    #[test]
    fn dimension_errors() {
        let (a, _) = sample_system();
        assert_eq!(
            GaussSolver.solve(&a, &[c(1.0, 0.0)]),
            Err(SolveError::DimensionMismatch { rhs: 1, n: 3 })
        );
        let ragged = vec![vec![c(1.0, 0.0)], vec![c(1.0, 0.0), c(2.0, 0.0)]];
        assert_eq!(
            FaerSolver.solve(&ragged, &[c(1.0, 0.0), c(1.0, 0.0)]),
            Err(SolveError::NotSquare)
        );
    }

    #[test]
    fn empty_system_is_trivial() {
        assert!(GaussSolver.solve(&[], &[]).unwrap().is_empty());
        assert!(FaerSolver.invert(&[]).unwrap().is_empty());
    }
}
