//! Runtime error types for the parsesmith agent loop.
//!
//! All fallible operations across the workspace return `SmithResult<T>`.
//! Only `Configuration` aborts a run; the agent loop recovers `Generation`
//! and `Execution` locally and treats `Validation` as the ordinary fail path.

use thiserror::Error;

use crate::verdict::Diagnostic;

/// The unified error type for parsesmith.
#[derive(Debug, Error)]
pub enum SmithError {
    /// The generation backend was unreachable or returned something unusable.
    #[error("generation failed: {reason}")]
    Generation { reason: String },

    /// A candidate program raised, timed out, or returned the wrong shape.
    #[error("candidate execution failed: {reason}")]
    Execution { reason: String },

    /// The produced table diverged from the reference.
    #[error("validation failed: {diagnostic}")]
    Validation { diagnostic: Diagnostic },

    /// A target, input file, or configuration value is missing or invalid.
    ///
    /// Not retryable: the run aborts before entering the loop.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The attempt journal could not record an entry.
    #[error("journal write failed: {reason}")]
    Journal { reason: String },
}

impl SmithError {
    /// Shorthand for building a `Configuration` error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Return true for the only error kind that aborts a run outright.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Convenience alias used throughout the parsesmith crates.
pub type SmithResult<T> = Result<T, SmithError>;
