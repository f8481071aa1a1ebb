//! Event-aligned epoch slicing.
//!
//! Cuts a continuous `[T, C]` signal into a uniform-length `[E, T', C]`
//! epoch array from a list of event intervals.  Epochs are right-aligned to
//! each interval's end and truncated to the shortest interval's length, so
//! variable event spans still yield a rectangular epoch set.

use ndarray::{s, Array2, Array3};

use crate::error::{DomainError, Result};
use crate::events::Interval;

/// Slice `signal` (`[T, C]`) into epochs (`[E, T_min, C]`).
///
/// `T_min` is the shortest interval length; for every interval the window
/// `[end - T_min, end)` is extracted, so all epochs end exactly at their
/// event boundary.
///
/// # Errors
///
/// [`DomainError::EmptyInput`] if `intervals` is empty;
/// [`DomainError::InvalidInterval`] if any interval has `end <= start` or
/// reaches past the signal.
pub fn slice_epochs(signal: &Array2<f64>, intervals: &[Interval]) -> Result<Array3<f64>> {
    if intervals.is_empty() {
        return Err(DomainError::EmptyInput("intervals"));
    }
    let (n_samples, n_ch) = signal.dim();
    for iv in intervals {
        if iv.end <= iv.start || iv.end > n_samples {
            return Err(DomainError::InvalidInterval {
                start: iv.start,
                end: iv.end,
            });
        }
    }
    // non-empty and validated, so the minimum exists and is > 0
    let min_dur = intervals.iter().map(Interval::len).min().unwrap_or(0);

    let mut epochs = Array3::<f64>::zeros((intervals.len(), min_dur, n_ch));
    for (k, iv) in intervals.iter().enumerate() {
        epochs
            .slice_mut(s![k, .., ..])
            .assign(&signal.slice(s![iv.end - min_dur..iv.end, ..]));
    }
    Ok(epochs)
}
