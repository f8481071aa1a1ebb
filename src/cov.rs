//! Channel-covariance estimation over epoch sets.
//!
//! Two interchangeable strategies, selected explicitly by the caller:
//!
//! - [`CovarianceStrategy::Sample`] — the classical CSP estimate: per-epoch
//!   `XᵀX` trace-normalized, averaged over the set, then shrunk toward the
//!   (trace-normalized) identity to guarantee positive-definiteness.
//! - [`CovarianceStrategy::RobustMcd`] — a minimum-covariance-determinant
//!   fit over all pooled samples, which down-weights outlier segments
//!   before estimating.  Deterministic: the support is seeded from the
//!   samples nearest the coordinate-wise median and refined by C-steps,
//!   with no random restarts.

use nalgebra::{DMatrix, DVector};
use ndarray::{s, Array2, Array3, ArrayView2};

use crate::error::{DomainError, Result};
use crate::linalg::to_array2;

/// Maximum C-step iterations for the MCD fit; the support set almost always
/// reaches a fixed point within a handful of steps.
const MCD_MAX_STEPS: usize = 30;

/// Covariance estimation strategy for one epoch set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CovarianceStrategy {
    /// Averaged trace-normalized per-epoch covariance with identity
    /// shrinkage `(1-α)·C + α·(I/d)`.
    Sample {
        /// Shrinkage blend factor.  Default: `0.05`.
        alpha: f64,
    },
    /// Minimum-covariance-determinant estimate over the pooled epochs.
    RobustMcd {
        /// Fraction of pooled samples kept in the support.  Default: `0.5`.
        support_fraction: f64,
    },
}

impl Default for CovarianceStrategy {
    fn default() -> Self {
        Self::Sample { alpha: 0.05 }
    }
}

impl CovarianceStrategy {
    /// Estimate a symmetric `[C, C]` channel covariance from an epoch set
    /// (`[E, T, C]`).
    ///
    /// # Errors
    ///
    /// [`DomainError::EmptyInput`] on an empty epoch set;
    /// [`DomainError::Degenerate`] on zero-power epochs or a singular MCD
    /// support.
    pub fn estimate(&self, epochs: &Array3<f64>) -> Result<Array2<f64>> {
        let (n_epochs, n_samples, n_ch) = epochs.dim();
        if n_epochs == 0 || n_samples == 0 {
            return Err(DomainError::EmptyInput("epoch set"));
        }
        if n_ch == 0 {
            return Err(DomainError::EmptyInput("channels"));
        }
        match *self {
            Self::Sample { alpha } => {
                let mut mean = Array2::<f64>::zeros((n_ch, n_ch));
                for e in 0..n_epochs {
                    mean += &cov_epoch(&epochs.slice(s![e, .., ..]))?;
                }
                mean /= n_epochs as f64;
                Ok(regularize(&mean, alpha))
            }
            Self::RobustMcd { support_fraction } => {
                // pool epochs along time into one [E·T, C] sample matrix
                let pooled = epochs
                    .to_shape((n_epochs * n_samples, n_ch))
                    .map_err(|_| DomainError::Degenerate("epoch set not reshapeable"))?
                    .to_owned();
                mcd_covariance(&pooled.view(), support_fraction)
            }
        }
    }
}

/// Trace-normalized covariance of one epoch `X` (`[T, C]`): `XᵀX / tr(XᵀX)`.
///
/// Fails with [`DomainError::Degenerate`] on a zero-power epoch, whose
/// trace normalizer would be zero.
pub fn cov_epoch(x: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let c = x.t().dot(x);
    let trace = c.diag().sum();
    if !(trace > 0.0) || !trace.is_finite() {
        return Err(DomainError::Degenerate("zero-power epoch"));
    }
    Ok(c / trace)
}

/// Shrink `c` toward the trace-normalized identity:
/// `(1-α)·C + α·(I/d)`.
///
/// With a trace-1 input the result keeps trace 1, and any `α > 0` makes it
/// strictly positive-definite.
pub fn regularize(c: &Array2<f64>, alpha: f64) -> Array2<f64> {
    let d = c.nrows();
    let mut out = c * (1.0 - alpha);
    let diag_add = alpha / d as f64;
    for i in 0..d {
        out[[i, i]] += diag_add;
    }
    out
}

/// Minimum-covariance-determinant covariance of `x` (`[N, C]`).
///
/// Seeds the support with the `h` samples nearest the coordinate-wise
/// median, then iterates C-steps (recompute mean/covariance of the support,
/// re-select the `h` samples of smallest Mahalanobis distance) to a fixed
/// point.  `h = max(⌈N·support_fraction⌉, C+1)`, clamped to `N`.
fn mcd_covariance(x: &ArrayView2<f64>, support_fraction: f64) -> Result<Array2<f64>> {
    let (n, d) = x.dim();
    if !(support_fraction > 0.0 && support_fraction <= 1.0) {
        return Err(DomainError::Degenerate("support fraction outside (0, 1]"));
    }
    let h = ((n as f64 * support_fraction).ceil() as usize)
        .max(d + 1)
        .min(n);
    if h <= d {
        return Err(DomainError::Degenerate(
            "too few pooled samples for a non-singular MCD support",
        ));
    }

    // deterministic seed: h samples nearest the coordinate-wise median
    let median = column_medians(x);
    let seed_dist: Vec<f64> = (0..n)
        .map(|i| {
            x.row(i)
                .iter()
                .zip(median.iter())
                .map(|(v, m)| (v - m) * (v - m))
                .sum()
        })
        .collect();
    let mut support = smallest_k(&seed_dist, h);
    let mut moments = support_moments(x, &support);

    for _ in 0..MCD_MAX_STEPS {
        let (mean, cov) = &moments;
        let chol = cov
            .clone()
            .cholesky()
            .ok_or(DomainError::Degenerate("singular MCD support covariance"))?;
        let dist: Vec<f64> = (0..n)
            .map(|i| {
                let b = DVector::from_iterator(d, x.row(i).iter().zip(mean.iter()).map(|(v, m)| v - m));
                b.dot(&chol.solve(&b))
            })
            .collect();

        let next = smallest_k(&dist, h);
        if next == support {
            break;
        }
        support = next;
        moments = support_moments(x, &support);
    }

    // symmetrize against accumulated rounding
    let cov = moments.1;
    let sym = (&cov + cov.transpose()) * 0.5;
    Ok(to_array2(&sym))
}

/// Mean and sample covariance (`/h`) of the supported rows.
fn support_moments(x: &ArrayView2<f64>, support: &[usize]) -> (DVector<f64>, DMatrix<f64>) {
    let d = x.ncols();
    let h = support.len() as f64;
    let mut mean = DVector::<f64>::zeros(d);
    for &i in support {
        for (j, &v) in x.row(i).iter().enumerate() {
            mean[j] += v;
        }
    }
    mean /= h;

    let mut cov = DMatrix::<f64>::zeros(d, d);
    for &i in support {
        let b = DVector::from_iterator(d, x.row(i).iter().zip(mean.iter()).map(|(v, m)| v - m));
        cov += &b * b.transpose();
    }
    cov /= h;
    (mean, cov)
}

/// Indices of the `k` smallest values, ties broken by index, returned sorted
/// so fixed-point comparison is order-insensitive.
fn smallest_k(values: &[f64], k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    idx.truncate(k);
    idx.sort_unstable();
    idx
}

fn column_medians(x: &ArrayView2<f64>) -> Vec<f64> {
    let (n, d) = x.dim();
    (0..d)
        .map(|j| {
            let mut col: Vec<f64> = x.column(j).iter().copied().collect();
            col.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            if n % 2 == 1 {
                col[n / 2]
            } else {
                0.5 * (col[n / 2 - 1] + col[n / 2])
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    /// One frequency per channel, so no covariance is rank-deficient.
    fn oscillating_epochs(n_epochs: usize, n_samples: usize, n_ch: usize) -> Array3<f64> {
        Array3::from_shape_fn((n_epochs, n_samples, n_ch), |(e, t, c)| {
            ((t as f64) * (0.37 + 0.11 * c as f64) + (e as f64) * 0.11).sin() * (1.0 + c as f64)
        })
    }

    #[test]
    fn regularized_covariance_has_unit_trace_and_is_symmetric() {
        let epochs = oscillating_epochs(5, 200, 6);
        let strategy = CovarianceStrategy::Sample { alpha: 0.05 };
        let c = strategy.estimate(&epochs).unwrap();

        let trace: f64 = c.diag().sum();
        assert_abs_diff_eq!(trace, 1.0, epsilon = 1e-12);
        for i in 0..6 {
            for j in 0..6 {
                assert_abs_diff_eq!(c[[i, j]], c[[j, i]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn per_epoch_covariance_is_trace_normalized() {
        let epochs = oscillating_epochs(1, 100, 4);
        let c = cov_epoch(&epochs.slice(ndarray::s![0, .., ..])).unwrap();
        assert_abs_diff_eq!(c.diag().sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_power_epoch_is_degenerate() {
        let epochs = Array3::<f64>::zeros((1, 50, 4));
        let err = cov_epoch(&epochs.slice(ndarray::s![0, .., ..])).unwrap_err();
        assert!(matches!(err, DomainError::Degenerate(_)));
    }

    #[test]
    fn empty_epoch_set_fails() {
        let epochs = Array3::<f64>::zeros((0, 100, 4));
        assert!(matches!(
            CovarianceStrategy::default().estimate(&epochs),
            Err(DomainError::EmptyInput(_))
        ));
        assert!(matches!(
            CovarianceStrategy::RobustMcd {
                support_fraction: 0.5
            }
            .estimate(&epochs),
            Err(DomainError::EmptyInput(_))
        ));
    }

    #[test]
    fn mcd_ignores_injected_outliers() {
        // clean oscillation plus 5% wild samples; the robust estimate must
        // stay close to the clean sample covariance while the plain pooled
        // covariance blows up
        let n = 400;
        let d = 3;
        let mut pooled = Array2::from_shape_fn((n, d), |(t, c)| {
            ((t as f64) * (0.21 + 0.07 * c as f64)).sin()
        });
        for t in (0..n).step_by(20) {
            for c in 0..d {
                pooled[[t, c]] = 500.0;
            }
        }
        let epochs = pooled
            .clone()
            .into_shape_with_order((1, n, d))
            .unwrap();

        let robust = CovarianceStrategy::RobustMcd {
            support_fraction: 0.5,
        }
        .estimate(&epochs)
        .unwrap();

        let naive_scale: f64 = pooled.t().dot(&pooled).diag().sum() / n as f64;
        let robust_scale: f64 = robust.diag().sum();
        assert!(
            robust_scale * 100.0 < naive_scale,
            "robust trace {robust_scale} should be far below contaminated {naive_scale}"
        );
    }

    #[test]
    fn mcd_is_symmetric() {
        let epochs = oscillating_epochs(3, 80, 4);
        let c = CovarianceStrategy::RobustMcd {
            support_fraction: 0.5,
        }
        .estimate(&epochs)
        .unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_abs_diff_eq!(c[[i, j]], c[[j, i]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn mcd_rejects_tiny_sample_counts() {
        let epochs = Array3::<f64>::zeros((1, 2, 8));
        assert!(matches!(
            CovarianceStrategy::RobustMcd {
                support_fraction: 0.5
            }
            .estimate(&epochs),
            Err(DomainError::Degenerate(_))
        ));
    }
}
