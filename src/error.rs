//! Error types for hardware topology discovery.
//!
//! Discovery itself never fails: a missing or inconsistent OS source degrades
//! to a documented default with a logged warning. The only errors that cross
//! the crate boundary are configuration problems and the hard minimum-CPU
//! requirement check.

use thiserror::Error;

/// Errors surfaced by configuration loading and requirement checks.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host CPU lacks an instruction-set extension this build requires.
    /// The embedded name tells the operator exactly what is missing.
    #[error(
        "This machine does not meet the minimum CPU requirements: \
         the CPU does not support {0}"
    )]
    MissingCpuFeature(&'static str),
}

/// Convenience type alias for Results with TopologyError.
pub type Result<T> = std::result::Result<T, TopologyError>;
