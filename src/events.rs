//! Interval scanning over discrete label sequences.
//!
//! [`find_intervals`] turns a per-sample label sequence (for example the
//! output of [`segment`](crate::trigger::segment)) into maximal `[start, end)`
//! runs of one target value, which then drive epoch slicing.

use crate::error::{DomainError, Result};

/// A half-open sample-index interval: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    /// Build an interval, rejecting `end <= start`.
    pub fn new(start: usize, end: usize) -> Result<Self> {
        if end <= start {
            return Err(DomainError::InvalidInterval { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of samples covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Find maximal runs of `target` in `seq`.
///
/// Returns one [`Interval`] per run, in order of occurrence.  A run still
/// active at the final index is closed at `seq.len()`, so no trailing
/// samples are dropped.
///
/// ```
/// use eegcsp::events::find_intervals;
///
/// let labels = [0, 0, 1, 1, 1, 0, 1, 0];
/// let runs = find_intervals(&labels, &1);
/// assert_eq!(runs.len(), 2);
/// assert_eq!((runs[0].start, runs[0].end), (2, 5));
/// assert_eq!((runs[1].start, runs[1].end), (6, 7));
/// ```
pub fn find_intervals<T: PartialEq>(seq: &[T], target: &T) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut run_start: Option<usize> = None;

    for (i, v) in seq.iter().enumerate() {
        match (v == target, run_start) {
            (true, None) => run_start = Some(i),
            (false, Some(start)) => {
                intervals.push(Interval { start, end: i });
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        intervals.push(Interval {
            start,
            end: seq.len(),
        });
    }
    intervals
}

/// Count rising transitions into `target` (`prev != target && curr == target`).
///
/// Used for per-session trial accounting: each contiguous run of a label
/// contributes exactly one transition.
pub fn count_transitions<T: PartialEq>(seq: &[T], target: &T) -> usize {
    seq.windows(2)
        .filter(|w| w[0] != *target && w[1] == *target)
        .count()
}
