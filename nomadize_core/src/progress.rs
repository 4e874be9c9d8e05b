//! Progress reporting abstractions for migrations
//!
//! This module provides a trait-based abstraction for progress reporting,
//! allowing the orchestrator to announce each step without depending on
//! terminal output or UI concerns.

use crate::migration::MigrationStep;

/// Core trait for progress reporting
///
/// Implementations must be cheap to call; the orchestrator reports before and
/// after every step.
pub trait MigrationProgress: Send + Sync {
    /// Report a progress update
    fn report(&self, update: ProgressUpdate);

    /// Signal that the run is over (successfully or not)
    fn complete(&self);
}

/// Unified progress update type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// A step is about to run
    StepStarted { step: MigrationStep, detail: String },

    /// A step finished successfully
    StepSucceeded { step: MigrationStep },

    /// A step failed; `message` is the rendered error
    StepFailed { step: MigrationStep, message: String },

    /// A step was not run
    StepSkipped { step: MigrationStep, reason: String },
}

/// Null implementation for when no progress is needed
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl MigrationProgress for NullProgress {
    fn report(&self, _update: ProgressUpdate) {}

    fn complete(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_provider_accepts_everything() {
        let provider = NullProgress;
        provider.report(ProgressUpdate::StepStarted {
            step: MigrationStep::RenameLocalHomeAside,
            detail: "ignored".to_string(),
        });
        provider.complete();
    }
}
