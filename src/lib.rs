//! # eegcsp — CSP analysis core for multichannel EEG
//!
//! `eegcsp` implements the discriminative-spatial-filter pipeline for
//! two-condition EEG experiments (motor imagery vs. rest, eyes open vs.
//! closed): photodiode trigger segmentation, event-aligned epoch slicing,
//! per-class covariance estimation, and Common Spatial Patterns extraction.
//!
//! File loading, band-pass filtering, PSD/STFT computation and all plotting
//! live outside this crate; it consumes already-filtered `[samples,
//! channels]` arrays and produces eigenvalues plus spatial filters/patterns
//! for the visualization layer.
//!
//! ## Pipeline overview
//!
//! ```text
//! raw TTL channel
//!   │
//!   ├─ trigger::ttl_to_binary()  bit-plane decode (+ invert() if active-low)
//!   ├─ trigger::segment()        burst-counting FSM → {none, motor, rest}
//!   ├─ events::find_intervals()  per-class [start, end) event intervals
//!   ├─ epoch::slice_epochs()     right-aligned uniform epochs  [E, T, C]
//!   ├─ CovarianceStrategy        trace-normalized sample / robust MCD  [C, C]
//!   └─ CspStrategy::solve()      eigenvalues + filters + patterns
//!        │
//!        └─→ topographic visualization (external)
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eegcsp::{
//!     run_csp, segment, CovarianceStrategy, CspStrategy, SegmenterConfig,
//! };
//! use ndarray::Array2;
//!
//! // band-pass-filtered recording, [T, C], and its binary trigger
//! let signal: Array2<f64> = Array2::zeros((600_000, 64));
//! let trigger: Vec<u8> = vec![0; 600_000];
//!
//! let (events, _sums) = segment(&trigger, &SegmenterConfig::default());
//! let result = run_csp(
//!     &signal,
//!     &events,
//!     &CovarianceStrategy::default(),
//!     &CspStrategy::Basic,
//! )?;
//!
//! println!("top eigenvalue: {:.3}", result.eigenvalue(0));
//! let _topomap_input = result.pattern(0); // forward projection, unit norm
//! # Ok::<(), eegcsp::DomainError>(())
//! ```
//!
//! Per-band batches (one CSP solve per frequency band) run in parallel with
//! [`run_csp_bands`]; a degenerate band fails on its own without touching
//! its siblings.

pub mod config;
pub mod cov;
pub mod csp;
pub mod epoch;
pub mod error;
pub mod events;
mod linalg;
pub mod pipeline;
pub mod reference;
pub mod transform;
pub mod trigger;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use config::SegmenterConfig;
pub use cov::{cov_epoch, regularize, CovarianceStrategy};
pub use csp::{fix_filter_signs, CspResult, CspStrategy};
pub use epoch::slice_epochs;
pub use error::{DomainError, Result};
pub use events::{count_transitions, find_intervals, Interval};
pub use pipeline::{run_csp, run_csp_bands};
pub use reference::{apply_car_inplace, rereference_inplace};
pub use transform::unit_to_db;
pub use trigger::{invert, segment, segment_fixed, ttl_to_binary, EventLabel};
