//! Error types for the localization filter
//!
//! Every variant is a precondition violation: the caller misused the filter or supplied an
//! unusable parameter. None of them are transient, so nothing in this crate retries.

use thiserror::Error;

/// Errors surfaced by the particle filter and its helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("particle filter has not been initialized; call `init` first")]
    NotInitialized,

    #[error("landmark set is empty; nearest-landmark lookup is undefined")]
    EmptyLandmarkSet,

    #[error("particle weights are degenerate (zero sum, negative, or non-finite); cannot resample")]
    DegenerateWeights,

    #[error("invalid particle count: {0} (must be at least 1)")]
    InvalidParticleCount(usize),

    #[error("invalid noise parameter `{name}`: {value}")]
    InvalidNoiseParameter { name: &'static str, value: f64 },

    #[error("invalid time step: {0} (must be positive and finite)")]
    InvalidTimeStep(f64),
}

pub type Result<T> = std::result::Result<T, FilterError>;
