//! Conversions between the crate's `ndarray` surface and the `nalgebra`
//! factorizations used internally by the covariance and CSP solvers.

use nalgebra::DMatrix;
use ndarray::Array2;

pub(crate) fn to_dmatrix(a: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_row_iterator(a.nrows(), a.ncols(), a.iter().copied())
}

pub(crate) fn to_array2(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}
