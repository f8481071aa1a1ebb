//! Error type for the analysis core.
//!
//! Every fallible operation in this crate surfaces a [`DomainError`]: invalid
//! shapes, empty inputs, or numerically degenerate matrices.  Errors are
//! raised at the point of detection — no operation ever substitutes NaN or
//! zero-filled results for a failed computation.

use thiserror::Error;

/// The single user-surfaced error kind of the analysis core.
#[derive(Error, Debug)]
pub enum DomainError {
    /// A required input collection was empty.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Two inputs that must agree in shape do not.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    /// An interval with `end <= start` or reaching past the signal.
    #[error("invalid interval [{start}, {end})")]
    InvalidInterval { start: usize, end: usize },

    /// A channel index outside the signal's channel range.
    #[error("channel index {index} out of bounds for {n_channels} channels")]
    ChannelOutOfBounds { index: usize, n_channels: usize },

    /// A matrix that is singular, non-positive-definite, or otherwise
    /// numerically unusable for the requested factorization.
    #[error("degenerate matrix: {0}")]
    Degenerate(&'static str),

    /// An iterative eigensolve that did not reach its tolerance.
    #[error("eigensolve failed to converge: {0}")]
    NonConvergence(&'static str),
}

/// Crate-local result alias.
pub type Result<T> = std::result::Result<T, DomainError>;
