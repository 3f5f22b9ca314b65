use crate::error::{AngmonError, AngmonResult};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Dense linear system solver (Ax = b) used for the reduced susceptance matrix.
pub trait LinearSystemBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> AngmonResult<Vec<f64>>;
}

fn check_dimensions(matrix: &[Vec<f64>], rhs: &[f64]) -> AngmonResult<usize> {
    let n = matrix.len();
    if rhs.len() != n {
        return Err(AngmonError::Solver(format!(
            "rhs length ({}) does not match matrix dimension {}",
            rhs.len(),
            n
        )));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(AngmonError::Solver("matrix must be square".to_string()));
    }
    Ok(n)
}

/// Gauss-Jordan elimination with partial pivoting.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn name(&self) -> &'static str {
        "gauss"
    }

    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> AngmonResult<Vec<f64>> {
        let n = check_dimensions(matrix, rhs)?;
        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
                .unwrap_or(col);
            a.swap(col, pivot);
            b.swap(col, pivot);

            let diag = a[col][col];
            if diag.abs() < 1e-12 {
                return Err(AngmonError::Solver("singular matrix".to_string()));
            }
            for value in a[col][col..].iter_mut() {
                *value /= diag;
            }
            b[col] /= diag;

            let pivot_row = a[col][col..].to_vec();
            let pivot_rhs = b[col];
            for row in (0..n).filter(|&r| r != col) {
                let factor = a[row][col];
                if factor == 0.0 {
                    continue;
                }
                for (target, &p) in a[row][col..].iter_mut().zip(pivot_row.iter()) {
                    *target -= factor * p;
                }
                b[row] -= factor * pivot_rhs;
            }
        }

        Ok(b)
    }
}

/// LU factorisation through faer.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl LinearSystemBackend for FaerSolver {
    fn name(&self) -> &'static str {
        "faer"
    }

    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> AngmonResult<Vec<f64>> {
        let n = check_dimensions(matrix, rhs)?;
        if n == 0 {
            return Ok(Vec::new());
        }

        let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
        let rhs_mat = Mat::from_fn(n, 1, |i, _| rhs[i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let solution: Vec<f64> = (0..n).map(|i| sol.read(i, 0)).collect();
        // partial pivoting does not report singularity, it yields inf/NaN instead
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(AngmonError::Solver("singular matrix".to_string()));
        }
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_backends_agree_on_small_system() {
        let matrix = vec![vec![4.0, -1.0], vec![-1.0, 3.0]];
        let rhs = vec![1.0, 2.0];
        let g = GaussSolver.solve(&matrix, &rhs).unwrap();
        let f = FaerSolver.solve(&matrix, &rhs).unwrap();
        for (a, b) in g.iter().zip(f.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
        assert!((4.0 * g[0] - g[1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn gauss_reports_singular_matrix() {
        let matrix = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        let err = GaussSolver.solve(&matrix, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, AngmonError::Solver(_)));
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let matrix = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(GaussSolver.solve(&matrix, &[1.0]).is_err());
        assert!(FaerSolver.solve(&[vec![1.0, 0.0]], &[1.0]).is_err());
    }

    #[test]
    fn empty_system_has_empty_solution() {
        assert!(GaussSolver.solve(&[], &[]).unwrap().is_empty());
        assert!(FaerSolver.solve(&[], &[]).unwrap().is_empty());
    }
}
