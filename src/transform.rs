//! Unit conversions applied to spectral outputs before display.

use ndarray::{Array, Dimension};

/// Convert linear power values (e.g. a PSD) to decibels:
/// `10·log10(x + eps)`.
///
/// `eps` guards `log(0)`; `None` uses machine epsilon.
pub fn unit_to_db<D: Dimension>(x: &Array<f64, D>, eps: Option<f64>) -> Array<f64, D> {
    let eps = eps.unwrap_or(f64::EPSILON);
    x.mapv(|v| 10.0 * (v + eps).log10())
}
