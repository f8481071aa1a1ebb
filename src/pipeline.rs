//! End-to-end glue: event labels → class epoch sets → covariances → CSP.
//!
//! One frequency band is one independent unit of work; [`run_csp_bands`]
//! fans a batch of pre-filtered band signals across the rayon pool.  Units
//! share no mutable state, and a failed band reports its own error without
//! aborting its siblings.

use ndarray::Array2;
use rayon::prelude::*;

use crate::cov::CovarianceStrategy;
use crate::csp::{CspResult, CspStrategy};
use crate::epoch::slice_epochs;
use crate::error::{DomainError, Result};
use crate::events::find_intervals;
use crate::trigger::EventLabel;

/// Run the full analysis on one (already band-pass-filtered) signal.
///
/// Derives motor and rest intervals from `events`, slices the two class
/// epoch sets, estimates a covariance per class with `cov`, and solves with
/// `csp`.
///
/// # Errors
///
/// [`DomainError::ShapeMismatch`] if `events` and `signal` disagree in
/// length, plus anything the slicing, estimation or solve stages raise —
/// in particular [`DomainError::EmptyInput`] when a class has no events at
/// all.
pub fn run_csp(
    signal: &Array2<f64>,
    events: &[EventLabel],
    cov: &CovarianceStrategy,
    csp: &CspStrategy,
) -> Result<CspResult> {
    if events.len() != signal.nrows() {
        return Err(DomainError::ShapeMismatch {
            context: "event labels vs signal",
            expected: format!("{} labels", signal.nrows()),
            actual: format!("{} labels", events.len()),
        });
    }
    let idx_motor = find_intervals(events, &EventLabel::Motor);
    let idx_rest = find_intervals(events, &EventLabel::Rest);

    let epochs_motor = slice_epochs(signal, &idx_motor)?;
    let epochs_rest = slice_epochs(signal, &idx_rest)?;

    let c_motor = cov.estimate(&epochs_motor)?;
    let c_rest = cov.estimate(&epochs_rest)?;

    csp.solve(&c_motor, &c_rest)
}

/// Run [`run_csp`] over a batch of band-filtered copies of one recording,
/// in parallel.
///
/// Returns one result per band, in input order.  Per-band failures stay
/// per-band.
pub fn run_csp_bands(
    band_signals: &[Array2<f64>],
    events: &[EventLabel],
    cov: &CovarianceStrategy,
    csp: &CspStrategy,
) -> Vec<Result<CspResult>> {
    band_signals
        .par_iter()
        .map(|signal| run_csp(signal, events, cov, csp))
        .collect()
}
