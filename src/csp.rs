//! Common Spatial Patterns solver.
//!
//! Given two class covariance matrices, finds spatial filters maximizing
//! the variance ratio between the classes (Blankertz et al., "Optimizing
//! spatial filters for robust EEG single-trial analysis").  Two strategies:
//!
//! - [`CspStrategy::Basic`] — the generalized *symmetric* eigenproblem
//!   `C₁v = λ(C₁+C₂)v`, solved by Cholesky whitening.  Eigenvalues are
//!   Rayleigh quotients of a covariance against the pooled covariance, so
//!   they lie in `[0, 1]`; they are returned in descending order together
//!   with unit-normalized forward projections (`A = C_sum·W`, columns
//!   L2-normalized) for topographic plotting.
//! - [`CspStrategy::Robust`] — trace-normalizes both inputs and solves the
//!   *unsymmetric* problem `R₁w = λ(R₁+R₂)w` without assuming
//!   positive-definiteness: eigenvalues come from the real Schur form of
//!   `(R₁+R₂)⁻¹R₁` (real parts by convention) and eigenvectors from
//!   shifted inverse iteration.  Eigenvalues are sorted *ascending* — the
//!   opposite convention from `Basic`, kept deliberately because consumers
//!   index both ends of the spectrum.  Each filter's arbitrary sign is
//!   resolved from the dominant entry of its `Wᵀ·R₁` row, and the forward
//!   projections are the pseudo-inverse-transpose of the sign-fixed
//!   filters.

use nalgebra::{DMatrix, DVector, Schur, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{DomainError, Result};
use crate::linalg::{to_array2, to_dmatrix};

/// Result of a CSP solve.
#[derive(Debug, Clone)]
pub struct CspResult {
    /// One eigenvalue per spatial filter.  `Basic`: in `[0, 1]`,
    /// descending.  `Robust`: real parts, ascending.
    pub eigenvalues: Array1<f64>,
    /// Backward (unmixing) filters, channel × filter.  Unnormalized.
    pub filters: Array2<f64>,
    /// Forward projections, channel × filter, for topographic plots.
    pub patterns: Array2<f64>,
}

impl CspResult {
    pub fn n_filters(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Spatial-pattern column for filter `idx` from the head of the
    /// ordering.
    pub fn pattern(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.patterns.column(idx)
    }

    /// Spatial-pattern column counted from the tail of the ordering
    /// (`idx = 0` is the last filter).  Both ends of the eigenvalue
    /// spectrum carry the discriminative components.
    pub fn pattern_from_end(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.patterns.column(self.n_filters() - 1 - idx)
    }

    pub fn eigenvalue(&self, idx: usize) -> f64 {
        self.eigenvalues[idx]
    }

    pub fn eigenvalue_from_end(&self, idx: usize) -> f64 {
        self.eigenvalues[self.n_filters() - 1 - idx]
    }
}

/// CSP solve strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CspStrategy {
    /// Whitened symmetric solve; eigenvalues descending in `[0, 1]`.
    #[default]
    Basic,
    /// Unsymmetric solve with sign-fixing; eigenvalues ascending.
    Robust,
}

impl CspStrategy {
    /// Solve for the spatial filters separating `c_class1` from `c_class2`.
    ///
    /// # Errors
    ///
    /// [`DomainError::ShapeMismatch`] if either matrix is non-square or the
    /// shapes differ; [`DomainError::Degenerate`] /
    /// [`DomainError::NonConvergence`] on a singular pooled covariance or a
    /// failed eigensolve — never a NaN-filled result.
    pub fn solve(&self, c_class1: &Array2<f64>, c_class2: &Array2<f64>) -> Result<CspResult> {
        let d = validate_pair(c_class1, c_class2)?;
        match self {
            Self::Basic => solve_basic(c_class1, c_class2, d),
            Self::Robust => solve_robust(c_class1, c_class2, d),
        }
    }
}

fn validate_pair(c1: &Array2<f64>, c2: &Array2<f64>) -> Result<usize> {
    if c1.nrows() != c1.ncols() || c2.nrows() != c2.ncols() {
        return Err(DomainError::ShapeMismatch {
            context: "csp solve",
            expected: "square covariance matrices".into(),
            actual: format!("{:?} and {:?}", c1.dim(), c2.dim()),
        });
    }
    if c1.dim() != c2.dim() {
        return Err(DomainError::ShapeMismatch {
            context: "csp solve",
            expected: format!("{:?}", c1.dim()),
            actual: format!("{:?}", c2.dim()),
        });
    }
    if c1.nrows() == 0 {
        return Err(DomainError::EmptyInput("covariance matrices"));
    }
    Ok(c1.nrows())
}

// ── Basic variant ─────────────────────────────────────────────────────────

fn solve_basic(c1: &Array2<f64>, c2: &Array2<f64>, d: usize) -> Result<CspResult> {
    let c1m = to_dmatrix(c1);
    let csum = &c1m + to_dmatrix(c2);

    // whiten: C_sum = LLᵀ, M = L⁻¹C₁L⁻ᵀ is symmetric with the generalized
    // eigenvalues; generalized vectors are v = L⁻ᵀu
    let chol = csum
        .clone()
        .cholesky()
        .ok_or(DomainError::Degenerate("pooled covariance is not positive-definite"))?;
    let l_inv = chol
        .l()
        .try_inverse()
        .ok_or(DomainError::Degenerate("pooled covariance is numerically singular"))?;
    let mut m = &l_inv * &c1m * l_inv.transpose();
    m = (&m + m.transpose()) * 0.5;

    let eig = SymmetricEigen::try_new(m, 1.0e-13, 500)
        .ok_or(DomainError::NonConvergence("symmetric eigensolver"))?;
    let w_unordered = l_inv.transpose() * &eig.eigenvectors;

    // descending λ, clamped into [0, 1] against rounding spill
    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut eigenvalues = Array1::<f64>::zeros(d);
    let mut filters = DMatrix::<f64>::zeros(d, d);
    for (k, &src) in order.iter().enumerate() {
        eigenvalues[k] = eig.eigenvalues[src].clamp(0.0, 1.0);
        filters.set_column(k, &w_unordered.column(src));
    }

    let mut patterns = &csum * &filters;
    for j in 0..d {
        let norm = patterns.column(j).norm();
        if !(norm > 0.0) || !norm.is_finite() {
            return Err(DomainError::Degenerate("zero-norm spatial pattern"));
        }
        patterns.column_mut(j).scale_mut(1.0 / norm);
    }

    Ok(CspResult {
        eigenvalues,
        filters: to_array2(&filters),
        patterns: to_array2(&patterns),
    })
}

// ── Robust variant ────────────────────────────────────────────────────────

fn solve_robust(c1: &Array2<f64>, c2: &Array2<f64>, d: usize) -> Result<CspResult> {
    let r1 = trace_normalize(to_dmatrix(c1))?;
    let r2 = trace_normalize(to_dmatrix(c2))?;
    let rsum = &r1 + &r2;

    let m = rsum
        .clone()
        .lu()
        .solve(&r1)
        .ok_or(DomainError::Degenerate("pooled covariance is singular"))?;

    let schur = Schur::try_new(m.clone(), 1.0e-12, 2000)
        .ok_or(DomainError::NonConvergence("real Schur decomposition"))?;
    let mut lambdas: Vec<f64> = schur.complex_eigenvalues().iter().map(|z| z.re).collect();
    lambdas.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut filters = DMatrix::<f64>::zeros(d, d);
    for (j, &lambda) in lambdas.iter().enumerate() {
        // deflate against earlier vectors of a (near-)repeated eigenvalue so
        // inverse iteration does not return the same direction twice
        let deflate: Vec<DVector<f64>> = (0..j)
            .filter(|&k| (lambdas[k] - lambda).abs() <= 1.0e-8 * (1.0 + lambda.abs()))
            .map(|k| filters.column(k).into_owned())
            .collect();
        let v = inverse_iteration(&m, lambda, &deflate)?;
        filters.set_column(j, &v);
    }

    let mut filters_nd = to_array2(&filters);
    let r1_nd = to_array2(&r1);
    fix_filter_signs(&mut filters_nd, &r1_nd)?;
    let filters = to_dmatrix(&filters_nd);

    let patterns = filters
        .clone()
        .pseudo_inverse(1.0e-12)
        .map_err(|_| DomainError::NonConvergence("SVD pseudo-inverse of filter matrix"))?
        .transpose();

    Ok(CspResult {
        eigenvalues: Array1::from_vec(lambdas),
        filters: filters_nd,
        patterns: to_array2(&patterns),
    })
}

fn trace_normalize(m: DMatrix<f64>) -> Result<DMatrix<f64>> {
    let trace = m.trace();
    if !(trace > 0.0) || !trace.is_finite() {
        return Err(DomainError::Degenerate("covariance with non-positive trace"));
    }
    Ok(m / trace)
}

/// Eigenvector of `m` for eigenvalue `lambda` by shifted inverse iteration.
///
/// The shift is offset from `lambda` so the factored matrix stays
/// invertible; `deflate` holds previously found vectors of the same
/// eigenvalue to project out each step.  Deterministic: fixed start vector,
/// fixed shift schedule.
fn inverse_iteration(
    m: &DMatrix<f64>,
    lambda: f64,
    deflate: &[DVector<f64>],
) -> Result<DVector<f64>> {
    let d = m.nrows();
    let scale = 1.0 + lambda.abs();
    let tol = 1.0e-9 * scale;

    for attempt in 0..4 {
        let shift = lambda + scale * 1.0e-10 * 10f64.powi(attempt);
        let lu = (m - DMatrix::<f64>::identity(d, d) * shift).lu();

        let mut x = DVector::from_element(d, 1.0 / (d as f64).sqrt());
        project_out(&mut x, deflate);
        let mut converged = false;

        for _ in 0..100 {
            let Some(mut y) = lu.solve(&x) else { break };
            project_out(&mut y, deflate);
            let norm = y.norm();
            if !(norm > 0.0) || !norm.is_finite() {
                break;
            }
            x = y / norm;
            let residual = (m * &x - &x * lambda).norm();
            if residual <= tol {
                converged = true;
                break;
            }
        }
        if converged {
            return Ok(x);
        }
    }
    Err(DomainError::NonConvergence("inverse iteration for a robust CSP filter"))
}

fn project_out(x: &mut DVector<f64>, basis: &[DVector<f64>]) {
    for b in basis {
        let norm_sq = b.norm_squared();
        if norm_sq > 0.0 {
            let coeff = x.dot(b) / norm_sq;
            *x -= b * coeff;
        }
    }
}

/// Resolve the arbitrary sign of each filter column in place.
///
/// For filter `j`, row `j` of `Wᵀ·class_cov` is inspected; the column is
/// negated when the entry of largest absolute magnitude is negative.  The
/// convention is idempotent under input sign flips, so repeated runs and
/// cross-session comparisons stay directionally consistent.
pub fn fix_filter_signs(filters: &mut Array2<f64>, class_cov: &Array2<f64>) -> Result<()> {
    let d = filters.nrows();
    if class_cov.dim() != (d, d) {
        return Err(DomainError::ShapeMismatch {
            context: "sign fixing",
            expected: format!("({d}, {d}) covariance"),
            actual: format!("{:?}", class_cov.dim()),
        });
    }
    let fproj = filters.t().dot(class_cov);
    for j in 0..filters.ncols() {
        let row = fproj.row(j);
        let mut best = 0usize;
        for (k, v) in row.iter().enumerate() {
            if v.abs() > row[best].abs() {
                best = k;
            }
        }
        if row[best] < 0.0 {
            filters.column_mut(j).mapv_inplace(|v| -v);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    /// Deterministic pair of distinct full-rank SPD covariance matrices.
    /// The quadratic phase keeps the generator matrices non-separable, so
    /// the generalized spectrum has no repeated eigenvalues.
    fn spd_pair(d: usize) -> (Array2<f64>, Array2<f64>) {
        let a = Array2::from_shape_fn((d, d), |(i, j)| {
            ((i * i + 3 * i * j + 2 * j * j + j) as f64 * 0.29).sin()
        });
        let b = Array2::from_shape_fn((d, d), |(i, j)| {
            ((2 * i * i + i * j + 3 * j * j + i) as f64 * 0.41).cos()
        });
        let mut c1 = a.t().dot(&a);
        let mut c2 = b.t().dot(&b);
        for i in 0..d {
            c1[[i, i]] += 0.5;
            c2[[i, i]] += 0.5;
        }
        (c1, c2)
    }

    #[test]
    fn basic_eigenvalues_lie_in_unit_interval_descending() {
        let (c1, c2) = spd_pair(6);
        let res = CspStrategy::Basic.solve(&c1, &c2).unwrap();
        for w in res.eigenvalues.as_slice().unwrap().windows(2) {
            assert!(w[0] > w[1], "eigenvalues not strictly descending: {w:?}");
        }
        for &l in res.eigenvalues.iter() {
            assert!((0.0..=1.0).contains(&l), "eigenvalue {l} outside [0, 1]");
        }
    }

    #[test]
    fn basic_filters_solve_the_generalized_problem() {
        let (c1, c2) = spd_pair(5);
        let res = CspStrategy::Basic.solve(&c1, &c2).unwrap();
        let csum = &c1 + &c2;
        for j in 0..res.n_filters() {
            let v = res.filters.column(j);
            let lhs = c1.dot(&v);
            let rhs = csum.dot(&v);
            for i in 0..5 {
                assert_abs_diff_eq!(lhs[i], res.eigenvalues[j] * rhs[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn basic_patterns_have_unit_columns() {
        let (c1, c2) = spd_pair(7);
        let res = CspStrategy::Basic.solve(&c1, &c2).unwrap();
        for j in 0..res.n_filters() {
            let norm: f64 = res.pattern(j).iter().map(|v| v * v).sum::<f64>().sqrt();
            assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn basic_solve_is_deterministic() {
        let (c1, c2) = spd_pair(6);
        let a = CspStrategy::Basic.solve(&c1, &c2).unwrap();
        let b = CspStrategy::Basic.solve(&c1, &c2).unwrap();
        assert_eq!(a.eigenvalues, b.eigenvalues);
        assert_eq!(a.patterns, b.patterns);
    }

    #[test]
    fn robust_eigenvalues_are_ascending() {
        let (c1, c2) = spd_pair(5);
        let res = CspStrategy::Robust.solve(&c1, &c2).unwrap();
        for w in res.eigenvalues.as_slice().unwrap().windows(2) {
            assert!(w[0] <= w[1], "eigenvalues not ascending: {w:?}");
        }
    }

    #[test]
    fn robust_filters_solve_the_generalized_problem() {
        let (c1, c2) = spd_pair(5);
        let res = CspStrategy::Robust.solve(&c1, &c2).unwrap();
        let r1 = &c1 / c1.diag().sum();
        let r2 = &c2 / c2.diag().sum();
        let rsum = &r1 + &r2;
        for j in 0..res.n_filters() {
            let w = res.filters.column(j);
            let lhs = r1.dot(&w);
            let rhs = rsum.dot(&w);
            for i in 0..5 {
                assert_abs_diff_eq!(lhs[i], res.eigenvalues[j] * rhs[i], epsilon = 1e-7);
            }
        }
    }

    #[test]
    fn robust_patterns_invert_the_filters() {
        // A = (W⁻¹)ᵀ, so AᵀW must be the identity
        let (c1, c2) = spd_pair(4);
        let res = CspStrategy::Robust.solve(&c1, &c2).unwrap();
        let prod = res.patterns.t().dot(&res.filters);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(prod[[i, j]], expected, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn sign_fixing_is_idempotent_under_input_flips() {
        let (c1, c2) = spd_pair(5);
        let res = CspStrategy::Robust.solve(&c1, &c2).unwrap();
        let r1 = &c1 / c1.diag().sum();

        let mut flipped = res.filters.clone();
        for j in 0..flipped.ncols() {
            if j % 2 == 0 {
                flipped.column_mut(j).mapv_inplace(|v| -v);
            }
        }
        fix_filter_signs(&mut flipped, &r1).unwrap();

        let mut fixed_again = res.filters.clone();
        fix_filter_signs(&mut fixed_again, &r1).unwrap();

        for (&a, &b) in flipped.iter().zip(fixed_again.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let (c1, _) = spd_pair(4);
        let (c2, _) = spd_pair(5);
        assert!(matches!(
            CspStrategy::Basic.solve(&c1, &c2),
            Err(DomainError::ShapeMismatch { .. })
        ));
        let non_square = Array2::<f64>::zeros((3, 4));
        assert!(matches!(
            CspStrategy::Robust.solve(&non_square, &non_square),
            Err(DomainError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn singular_pooled_covariance_is_reported() {
        // both classes identically zero off a single rank-1 direction
        let c = array![[1.0, 1.0], [1.0, 1.0]];
        let err = CspStrategy::Basic.solve(&c, &c).unwrap_err();
        assert!(matches!(err, DomainError::Degenerate(_)));
    }

    #[test]
    fn head_and_tail_accessors_agree() {
        let (c1, c2) = spd_pair(6);
        let res = CspStrategy::Basic.solve(&c1, &c2).unwrap();
        assert_eq!(res.eigenvalue_from_end(0), res.eigenvalue(5));
        assert_eq!(res.pattern_from_end(1), res.pattern(4));
    }
}
