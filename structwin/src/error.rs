// src/error.rs
//
// Error type shared by the belief, reliability, cost and model layers.
//
// Everything here is an input-contract violation or a numerical degeneracy
// detected at the point of use. There are no transient errors: the core does
// no I/O, so callers either fix their inputs or abort the episode.

use std::fmt;

/// Errors raised by the core engine.
#[derive(Debug, Clone, PartialEq)]
pub enum StructError {
    /// A belief vector is negative, non-finite, or does not sum to 1.
    InvalidBelief { what: &'static str, sum: f64 },
    /// `k` is outside `[1, n]` for a k-out-of-n query.
    InvalidK { k: usize, n: usize },
    /// A component failure probability is outside `[0, 1]`.
    InvalidProbability { index: usize, value: f64 },
    /// Action code outside the known action set.
    InvalidAction { code: u8 },
    /// Twin uncertainty parameters are negative or non-finite.
    InvalidTwinUncertainty { mean: f64, dispersion: f64 },
    /// The twin-mode belief does not single out exactly one mode.
    AmbiguousTwinMode { nonzero: usize },
    /// The deterioration clock is beyond the model's transition table.
    ClockOutOfRange { clock: usize, max: usize },
    /// The predictive observation distribution cannot be sampled.
    DegenerateDistribution { reason: String },
    /// The selected observation has (near-)zero probability under the prior.
    DegenerateEvidence { observation: usize, evidence: f64 },
    /// Two inputs that must agree in length or shape do not.
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The static model failed validation.
    InvalidModel { field: String, message: String },
    /// A configuration value is outside its allowed range.
    InvalidConfig { field: &'static str, message: String },
}

impl fmt::Display for StructError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructError::InvalidBelief { what, sum } => {
                write!(f, "invalid {} distribution (sum = {})", what, sum)
            }
            StructError::InvalidK { k, n } => {
                write!(f, "k = {} is outside [1, {}] for a k-out-of-n system", k, n)
            }
            StructError::InvalidProbability { index, value } => {
                write!(
                    f,
                    "component {} failure probability {} is outside [0, 1]",
                    index, value
                )
            }
            StructError::InvalidAction { code } => {
                write!(f, "unknown action code {}", code)
            }
            StructError::InvalidTwinUncertainty { mean, dispersion } => {
                write!(
                    f,
                    "invalid twin uncertainty (mean = {}, dispersion = {})",
                    mean, dispersion
                )
            }
            StructError::AmbiguousTwinMode { nonzero } => {
                write!(
                    f,
                    "twin-mode belief must be one-hot, found {} modes with mass",
                    nonzero
                )
            }
            StructError::ClockOutOfRange { clock, max } => {
                write!(
                    f,
                    "deterioration clock {} exceeds transition table (max {})",
                    clock, max
                )
            }
            StructError::DegenerateDistribution { reason } => {
                write!(f, "cannot sample observation: {}", reason)
            }
            StructError::DegenerateEvidence {
                observation,
                evidence,
            } => {
                write!(
                    f,
                    "observation {} has evidence {} (zero-mass reweighting)",
                    observation, evidence
                )
            }
            StructError::DimensionMismatch {
                what,
                expected,
                actual,
            } => {
                write!(f, "{}: expected {}, got {}", what, expected, actual)
            }
            StructError::InvalidModel { field, message } => {
                write!(f, "model validation error in '{}': {}", field, message)
            }
            StructError::InvalidConfig { field, message } => {
                write!(f, "invalid config '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for StructError {}

pub type Result<T> = std::result::Result<T, StructError>;
