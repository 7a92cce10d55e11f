use crate::error::{SfdmError, SfdmResult};
use nalgebra::{DMatrix, DVector};
use sprs::{CsMat, TriMat};

/// The narrow interface between a residual-producing driver and the Newton
/// solvers: a residual function and a finite-difference Jacobian over the
/// same flat unknown vector. `&mut self` because evaluating either one may
/// transiently mutate grid state.
pub trait NonlinearSystem {
    fn residual(&mut self, x: &DVector<f64>) -> SfdmResult<DVector<f64>>;
    fn jacobian(&mut self, x: &DVector<f64>) -> SfdmResult<CsMat<f64>>;
}

/// Project a vector onto per-unknown bounds.
pub fn clip(x: &DVector<f64>, bounds: &Option<Vec<(f64, f64)>>) -> DVector<f64> {
    match bounds {
        None => x.clone(),
        Some(b) => DVector::from_iterator(
            x.len(),
            x.iter()
                .zip(b)
                .map(|(&xi, &(lo, hi))| xi.max(lo).min(hi)),
        ),
    }
}

pub fn csmat_to_dmatrix(m: &CsMat<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(m.rows(), m.cols());
    for (v, (r, c)) in m.iter() {
        out[(r, c)] = *v;
    }
    out
}

/// Extract the block `[r0, r1) x [c0, c1)` of a sparse matrix.
pub fn submatrix(m: &CsMat<f64>, r0: usize, r1: usize, c0: usize, c1: usize) -> CsMat<f64> {
    let mut tri = TriMat::new((r1 - r0, c1 - c0));
    for (v, (r, c)) in m.iter() {
        if r >= r0 && r < r1 && c >= c0 && c < c1 {
            tri.add_triplet(r - r0, c - c0, *v);
        }
    }
    tri.to_csr()
}

/// Dense LU solve of `A x = b`.
pub fn solve_dense_lu(a: DMatrix<f64>, b: &DVector<f64>) -> SfdmResult<DVector<f64>> {
    let lu = a.lu();
    lu.solve(b)
        .ok_or_else(|| SfdmError::Solver("Failed to solve the linear system".to_string()))
}

///////////////////////////////////////////////////////////////////////////
//                                 TESTS
///////////////////////////////////////////////////////////////////////////

#[test]
fn test_clip() {
    let x = DVector::from_vec(vec![-5.0, 0.5, 12.0]);
    let bounds = Some(vec![(0.0, 1.0), (0.0, 1.0), (0.0, 10.0)]);
    let clipped = clip(&x, &bounds);
    assert_eq!(clipped.as_slice(), &[0.0, 0.5, 10.0]);
    assert_eq!(clip(&x, &None), x);
}

#[test]
fn test_submatrix_block() {
    let mut tri = TriMat::new((4, 4));
    tri.add_triplet(0, 0, 1.0);
    tri.add_triplet(2, 2, 5.0);
    tri.add_triplet(2, 3, 6.0);
    tri.add_triplet(3, 1, 7.0);
    let m: CsMat<f64> = tri.to_csr();
    let block = submatrix(&m, 2, 4, 2, 4);
    let dense = csmat_to_dmatrix(&block);
    assert_eq!(dense[(0, 0)], 5.0);
    assert_eq!(dense[(0, 1)], 6.0);
    assert_eq!(dense[(1, 1)], 0.0);
}

#[test]
fn test_solve_dense_lu() {
    let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
    let b = DVector::from_vec(vec![2.0, 8.0]);
    let x = solve_dense_lu(a, &b).unwrap();
    approx::assert_relative_eq!(x[0], 1.0, epsilon = 1e-14);
    approx::assert_relative_eq!(x[1], 2.0, epsilon = 1e-14);
}
