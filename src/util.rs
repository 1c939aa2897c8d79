/**
 * File: /src/util.rs
 * Created Date: Tuesday, October 14th 2026
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2026-10-14				ndarray/nalgebra bridging and norm helpers
**/
extern crate nalgebra as na;
use na::DMatrix;
use ndarray::{Array2, ArrayView2};

pub fn clone_to_dmatrix<T>(array_view: ArrayView2<T>) -> DMatrix<T>
where
    T: Clone,
    T: na::Scalar,
{
    let nrows = array_view.ncols();
    let ncols = array_view.nrows();
    let elements = array_view.iter().cloned().collect::<Vec<T>>();
    DMatrix::from_vec(nrows, ncols, elements).transpose()
}

pub fn dmatrix_to_array2<T>(matrix: &DMatrix<T>) -> Array2<T>
where
    T: Clone,
    T: na::Scalar,
{
    Array2::from_shape_fn((matrix.nrows(), matrix.ncols()), |(i, j)| {
        matrix[(i, j)].clone()
    })
}

/// Sum of squares of all entries
pub(crate) fn squared_norm(a: &ArrayView2<f64>) -> f64 {
    a.iter().map(|v| v * v).sum()
}

/// trace(A·Bᵀ) without forming the product, i.e. the sum of A ∘ B.
/// `a` and `b` must share a shape.
pub(crate) fn trace_dot(a: &ArrayView2<f64>, b: &ArrayView2<f64>) -> f64 {
    debug_assert_eq!(a.dim(), b.dim());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
