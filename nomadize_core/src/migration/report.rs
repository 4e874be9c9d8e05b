//! Migration reports
//!
//! A [`MigrationReport`] records what happened to every step of one run. It
//! is the only result of [`super::MigrationOrchestrator::run`]; failures are
//! data here, not early returns, because later steps still run after some
//! failures.

use super::identity::AccountIdentity;
use super::step::MigrationStep;
use crate::error::MigrationError;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// What happened to one step
#[derive(Debug)]
pub enum StepOutcome {
    Succeeded,
    Failed(MigrationError),
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn error(&self) -> Option<&MigrationError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl Serialize for StepOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Succeeded => {
                let mut state = serializer.serialize_struct("StepOutcome", 1)?;
                state.serialize_field("status", "succeeded")?;
                state.end()
            }
            Self::Failed(err) => {
                let mut state = serializer.serialize_struct("StepOutcome", 3)?;
                state.serialize_field("status", "failed")?;
                state.serialize_field("error", &err.to_string())?;
                state.serialize_field("relocation_move", &err.relocation_move())?;
                state.end()
            }
            Self::Skipped { reason } => {
                let mut state = serializer.serialize_struct("StepOutcome", 2)?;
                state.serialize_field("status", "skipped")?;
                state.serialize_field("reason", reason)?;
                state.end()
            }
        }
    }
}

/// One step's outcome and when it was settled
#[derive(Debug, Serialize)]
pub struct StepRecord {
    pub step: MigrationStep,
    pub number: u8,
    pub outcome: StepOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MigrationOutcome {
    FullyMigrated,
    PartiallyMigrated { failed_steps: Vec<MigrationStep> },
}

/// Per-step record of one migration run
#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub local: AccountIdentity,
    pub target: AccountIdentity,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepRecord>,
}

impl MigrationReport {
    /// Start an empty report
    pub fn begin(local: AccountIdentity, target: AccountIdentity) -> Self {
        Self {
            local,
            target,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::with_capacity(MigrationStep::ALL.len()),
        }
    }

    /// Record the outcome of `step`
    pub fn record(&mut self, step: MigrationStep, outcome: StepOutcome) {
        self.steps.push(StepRecord {
            step,
            number: step.number(),
            outcome,
            finished_at: Utc::now(),
        });
    }

    /// Mark the run as finished
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Outcome recorded for `step`, if it was reached
    pub fn outcome_of(&self, step: MigrationStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|record| record.step == step)
            .map(|record| &record.outcome)
    }

    /// Failed steps and their errors, in step order
    pub fn failures(&self) -> impl Iterator<Item = (MigrationStep, &MigrationError)> {
        self.steps
            .iter()
            .filter_map(|record| record.outcome.error().map(|err| (record.step, err)))
    }

    /// Terminal state of the run
    pub fn outcome(&self) -> MigrationOutcome {
        let failed_steps: Vec<_> = self.failures().map(|(step, _)| step).collect();
        if failed_steps.is_empty() {
            MigrationOutcome::FullyMigrated
        } else {
            MigrationOutcome::PartiallyMigrated { failed_steps }
        }
    }

    pub fn is_fully_migrated(&self) -> bool {
        self.outcome() == MigrationOutcome::FullyMigrated
    }

    /// Whether the run stopped before anything destructive happened
    pub fn aborted_before_changes(&self) -> bool {
        matches!(
            self.outcome_of(MigrationStep::RenameLocalHomeAside),
            Some(StepOutcome::Failed(_))
        )
    }

    /// Pretty-printed JSON form
    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Rendered<'a> {
            #[serde(flatten)]
            report: &'a MigrationReport,
            outcome: MigrationOutcome,
        }

        serde_json::to_string_pretty(&Rendered {
            report: self,
            outcome: self.outcome(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;

    fn report() -> MigrationReport {
        MigrationReport::begin(
            AccountIdentity::under_root("/Users", "alice").unwrap(),
            AccountIdentity::under_root("/Users", "bob").unwrap(),
        )
    }

    #[test]
    fn test_all_succeeded_is_fully_migrated() {
        let mut report = report();
        for step in MigrationStep::ALL {
            report.record(step, StepOutcome::Succeeded);
        }
        report.finish();

        assert!(report.is_fully_migrated());
        assert!(report.finished_at.is_some());
        assert_eq!(report.failures().count(), 0);
    }

    #[test]
    fn test_failed_steps_are_listed_in_order() {
        let mut report = report();
        report.record(MigrationStep::RenameLocalHomeAside, StepOutcome::Succeeded);
        report.record(
            MigrationStep::DeleteLocalAccountRecord,
            StepOutcome::Failed(MigrationError::RecordDeletion {
                account: "alice".to_string(),
                source: ToolError::non_zero_exit("dscl", Some(1), "eDSRecordNotFound"),
            }),
        );
        report.record(MigrationStep::ProvisionNetworkMobileAccount, StepOutcome::Succeeded);
        report.record(MigrationStep::RelocateHomeContent, StepOutcome::Succeeded);
        report.record(
            MigrationStep::RepairOwnership,
            StepOutcome::Failed(MigrationError::GroupLookup {
                account: "bob".to_string(),
                source: ToolError::non_zero_exit("id", Some(1), "no such user"),
            }),
        );

        assert_eq!(
            report.outcome(),
            MigrationOutcome::PartiallyMigrated {
                failed_steps: vec![
                    MigrationStep::DeleteLocalAccountRecord,
                    MigrationStep::RepairOwnership
                ]
            }
        );
        assert!(!report.aborted_before_changes());
    }

    #[test]
    fn test_json_shape() {
        let mut report = report();
        report.record(
            MigrationStep::RenameLocalHomeAside,
            StepOutcome::Failed(MigrationError::Quarantine {
                from: "/Users/alice".into(),
                to: "/Users/alice.Nomadize".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            }),
        );
        report.record(
            MigrationStep::DeleteLocalAccountRecord,
            StepOutcome::Skipped {
                reason: "local home could not be quarantined".to_string(),
            },
        );

        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["outcome"]["state"], "partially_migrated");
        assert_eq!(value["steps"][0]["step"], "rename_local_home_aside");
        assert_eq!(value["steps"][0]["outcome"]["status"], "failed");
        assert_eq!(value["steps"][1]["outcome"]["status"], "skipped");
        assert_eq!(value["local"]["account_name"], "alice");
        assert!(report.aborted_before_changes());
    }
}
