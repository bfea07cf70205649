//! Square sparse matrices and a preconditioned conjugate gradient solver.
//!
//! Harmonic systems are symmetric and diagonally dominant with a handful of
//! entries per row, so they are assembled row by row into CSR form and can be
//! solved either densely or with Jacobi-preconditioned conjugate gradient.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::error::{MeshError, Result};

/// Square matrix in compressed sparse row form.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    dim: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` indexes row `i` in `col_idx` and `values`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build a matrix from one `column -> value` map per row.
    ///
    /// Entries whose column is out of range are dropped.
    pub fn from_rows(rows: &[BTreeMap<usize, f64>]) -> Self {
        let dim = rows.len();
        let nnz = rows.iter().map(BTreeMap::len).sum();

        let mut row_ptr = Vec::with_capacity(dim + 1);
        let mut col_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        row_ptr.push(0);
        for row in rows {
            for (&col, &value) in row.range(..dim) {
                col_idx.push(col);
                values.push(value);
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            dim,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows (and columns).
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// `A * x`.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(x.len(), self.dim);
        DVector::from_iterator(
            self.dim,
            (0..self.dim).map(|i| self.row(i).map(|(j, a)| a * x[j]).sum::<f64>()),
        )
    }

    /// The diagonal entries (zero where none is stored).
    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.dim,
            (0..self.dim).map(|i| self.row(i).find(|&(j, _)| j == i).map_or(0.0, |(_, a)| a)),
        )
    }

    /// Expand into a dense matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.dim, self.dim);
        for i in 0..self.dim {
            for (j, a) in self.row(i) {
                dense[(i, j)] = a;
            }
        }
        dense
    }
}

/// Solve `A x = b` for symmetric positive definite `A` by conjugate gradient
/// with a Jacobi (diagonal) preconditioner.
///
/// Stops once `|r| / |b| < tolerance`. A zero right-hand side returns the
/// zero vector.
///
/// # Errors
///
/// Returns [`MeshError::ConvergenceFailed`] if the tolerance is not reached
/// within `max_iterations`, or if the search direction degenerates.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    max_iterations: usize,
    tolerance: f64,
) -> Result<DVector<f64>> {
    let n = b.len();
    let mut x = DVector::zeros(n);

    let b_norm = b.norm();
    if b_norm < 1e-300 {
        return Ok(x);
    }

    let inv_diag = a.diagonal().map(|d| if d.abs() > 1e-300 { 1.0 / d } else { 1.0 });
    let precondition = |r: &DVector<f64>| r.component_mul(&inv_diag);

    let mut r = b.clone();
    let mut z = precondition(&r);
    let mut p = z.clone();
    let mut rz = r.dot(&z);

    for _ in 0..max_iterations {
        let ap = a.mul_vec(&p);
        let p_ap = p.dot(&ap);
        if p_ap.abs() < 1e-300 {
            break;
        }

        let alpha = rz / p_ap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        if r.norm() / b_norm < tolerance {
            return Ok(x);
        }

        z = precondition(&r);
        let rz_next = r.dot(&z);
        p = &z + (rz_next / rz) * &p;
        rz = rz_next;
    }

    Err(MeshError::ConvergenceFailed {
        iterations: max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(entries: &[&[(usize, f64)]]) -> Vec<BTreeMap<usize, f64>> {
        entries.iter().map(|r| r.iter().copied().collect()).collect()
    }

    #[test]
    fn test_from_rows() {
        // [ 4  1 ]
        // [ 1  3 ]
        let a = CsrMatrix::from_rows(&rows(&[&[(0, 4.0), (1, 1.0)], &[(0, 1.0), (1, 3.0)]]));
        assert_eq!(a.dim(), 2);
        assert_eq!(a.nnz(), 4);
        assert_eq!(a.diagonal(), DVector::from_vec(vec![4.0, 3.0]));

        let dense = a.to_dense();
        assert_eq!(dense[(0, 1)], 1.0);
        assert_eq!(dense[(1, 1)], 3.0);
    }

    #[test]
    fn test_out_of_range_columns_dropped() {
        let a = CsrMatrix::from_rows(&rows(&[&[(0, 2.0), (5, 9.0)]]));
        assert_eq!(a.nnz(), 1);
    }

    #[test]
    fn test_mul_vec() {
        // [ 4  1 ]   [ 1 ]   [ 5 ]
        // [ 1  3 ] * [ 1 ] = [ 4 ]
        let a = CsrMatrix::from_rows(&rows(&[&[(0, 4.0), (1, 1.0)], &[(0, 1.0), (1, 3.0)]]));
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0]));

        assert!((y[0] - 5.0).abs() < 1e-12);
        assert!((y[1] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_cg_small() {
        // Solution: x = 1/11, y = 7/11
        let a = CsrMatrix::from_rows(&rows(&[&[(0, 4.0), (1, 1.0)], &[(0, 1.0), (1, 3.0)]]));
        let b = DVector::from_vec(vec![1.0, 2.0]);

        let x = conjugate_gradient(&a, &b, 100, 1e-12).unwrap();
        assert!((x[0] - 1.0 / 11.0).abs() < 1e-9);
        assert!((x[1] - 7.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_cg_matches_dense_solve() {
        // Path-graph Laplacian with both ends pinned: tridiagonal, SPD.
        let n = 6;
        let mut system = vec![BTreeMap::new(); n];
        for (i, row) in system.iter_mut().enumerate() {
            row.insert(i, 2.0);
            if i > 0 {
                row.insert(i - 1, -1.0);
            }
            if i + 1 < n {
                row.insert(i + 1, -1.0);
            }
        }
        let a = CsrMatrix::from_rows(&system);
        let b = DVector::from_fn(n, |i, _| (i + 1) as f64);

        let iterative = conjugate_gradient(&a, &b, 100, 1e-12).unwrap();
        let direct = a.to_dense().lu().solve(&b).unwrap();
        assert!((iterative - direct).norm() < 1e-8);
    }

    #[test]
    fn test_cg_zero_rhs() {
        let a = CsrMatrix::from_rows(&rows(&[&[(0, 2.0)]]));
        let x = conjugate_gradient(&a, &DVector::zeros(1), 10, 1e-12).unwrap();
        assert_eq!(x[0], 0.0);
    }

    #[test]
    fn test_cg_reports_non_convergence() {
        let n = 50;
        let mut system = vec![BTreeMap::new(); n];
        for (i, row) in system.iter_mut().enumerate() {
            row.insert(i, 2.0);
            if i > 0 {
                row.insert(i - 1, -1.0);
            }
            if i + 1 < n {
                row.insert(i + 1, -1.0);
            }
        }
        let a = CsrMatrix::from_rows(&system);
        let b = DVector::from_element(n, 1.0);

        assert!(matches!(
            conjugate_gradient(&a, &b, 2, 1e-14),
            Err(MeshError::ConvergenceFailed { iterations: 2 })
        ));
    }
}
