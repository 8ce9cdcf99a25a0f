//! Crate error type.
//!
//! Domain exhaustion and solver infeasibility are *outcomes*, not errors
//! (see [`crate::pipeline::PipelineOutcome`]); this enum covers genuine
//! failures: broken configuration and verification failures that indicate
//! an under-encoded hard constraint.

use crate::extraction::Violation;

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Model assembly error: {0}")]
    Assembly(String),

    #[error("Solution extraction error: {0}")]
    Extraction(String),

    #[error("Solver returned an assignment that violates {} hard constraint(s): {}",
        .0.len(), summarize(.0))]
    VerificationFailed(Vec<Violation>),
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .take(3)
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
