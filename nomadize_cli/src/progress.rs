//! Console progress for migrations
//!
//! Step announcements go to stderr so `--json` output on stdout stays clean.

use colored::*;
use nomadize_core::progress::{MigrationProgress, ProgressUpdate};
use nomadize_core::MigrationStep;

/// Renders each step as it starts and finishes
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleProgress;

impl ConsoleProgress {
    pub fn new() -> Self {
        Self
    }
}

impl MigrationProgress for ConsoleProgress {
    fn report(&self, update: ProgressUpdate) {
        eprintln!("{}", render_update(&update));
    }

    fn complete(&self) {
        eprintln!();
    }
}

/// One line of console output for an update
pub fn render_update(update: &ProgressUpdate) -> String {
    match update {
        ProgressUpdate::StepStarted { step, detail } => {
            format!("{} {}", step_label(*step).bold(), detail)
        }
        ProgressUpdate::StepSucceeded { .. } => format!("  {} done", "✓".green()),
        ProgressUpdate::StepFailed { message, .. } => {
            format!("  {} {}", "✗".red(), message.red())
        }
        ProgressUpdate::StepSkipped { reason, .. } => {
            format!("  {} skipped: {}", "-".yellow(), reason.dimmed())
        }
    }
}

fn step_label(step: MigrationStep) -> String {
    format!(
        "[{}/{}] {}:",
        step.number(),
        MigrationStep::ALL.len(),
        step.name()
    )
}
