//! Migration orchestrator
//!
//! Runs the five migration steps strictly in order. There is no rollback: a
//! step that fails is recorded, and depending on the step the run either
//! continues or stops advancing (see [`MigrationStep::halt_reason`]).

use super::identity::AccountIdentity;
use super::layout::{emptied_target_path, quarantine_path};
use super::report::{MigrationReport, StepOutcome};
use super::step::MigrationStep;
use super::tools::AccountTools;
use crate::error::MigrationError;
use crate::progress::{MigrationProgress, NullProgress, ProgressUpdate};
use log::{error, info, warn};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

/// Drives one local-to-mobile account migration
pub struct MigrationOrchestrator<T: AccountTools> {
    tools: T,
    progress: Arc<dyn MigrationProgress>,
}

impl<T: AccountTools> MigrationOrchestrator<T> {
    /// Create an orchestrator that reports nothing
    pub fn new(tools: T) -> Self {
        Self::with_progress(tools, Arc::new(NullProgress))
    }

    /// Create an orchestrator reporting through `progress`
    pub fn with_progress(tools: T, progress: Arc<dyn MigrationProgress>) -> Self {
        Self { tools, progress }
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Read-only checks that the run can start
    ///
    /// Nothing on disk or in the account database is changed.
    pub async fn preflight(
        &self,
        local: &AccountIdentity,
        target: &AccountIdentity,
    ) -> Result<(), MigrationError> {
        if local.account_name() == target.account_name() {
            return Err(MigrationError::preflight(format!(
                "local and target account are both '{}'",
                local.account_name()
            )));
        }
        if local.home_path() == target.home_path() {
            return Err(MigrationError::preflight(format!(
                "local and target share the home {}",
                local.home_path().display()
            )));
        }

        match fs::metadata(local.home_path()).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                return Err(MigrationError::preflight(format!(
                    "local home {} is not a directory",
                    local.home_path().display()
                )));
            }
            Err(err) => {
                return Err(MigrationError::preflight(format!(
                    "local home {} is not accessible: {err}",
                    local.home_path().display()
                )));
            }
        }

        for leftover in [
            quarantine_path(local.home_path()),
            emptied_target_path(target.home_path()),
        ] {
            if path_exists(&leftover).await {
                return Err(MigrationError::preflight(format!(
                    "{} already exists from an earlier run",
                    leftover.display()
                )));
            }
        }

        Ok(())
    }

    /// Run every step and report what happened
    ///
    /// Callers are expected to have confirmed that `target` exists in the
    /// directory and to have passed [`Self::preflight`].
    pub async fn run(&self, local: &AccountIdentity, target: &AccountIdentity) -> MigrationReport {
        info!("Migrating {local} into {target}");
        let mut report = MigrationReport::begin(local.clone(), target.clone());
        let mut halted: Option<&'static str> = None;

        for step in MigrationStep::ALL {
            if let Some(reason) = halted {
                warn!("Skipping {step}: {reason}");
                self.progress.report(ProgressUpdate::StepSkipped {
                    step,
                    reason: reason.to_string(),
                });
                report.record(
                    step,
                    StepOutcome::Skipped {
                        reason: reason.to_string(),
                    },
                );
                continue;
            }

            let detail = step.describe(local, target);
            info!("Starting {step}: {detail}");
            self.progress
                .report(ProgressUpdate::StepStarted { step, detail });

            match self.execute(step, local, target).await {
                Ok(()) => {
                    info!("Completed {step}");
                    self.progress.report(ProgressUpdate::StepSucceeded { step });
                    report.record(step, StepOutcome::Succeeded);
                }
                Err(err) => {
                    error!("{step} failed: {err}");
                    self.progress.report(ProgressUpdate::StepFailed {
                        step,
                        message: err.to_string(),
                    });
                    report.record(step, StepOutcome::Failed(err));
                    halted = step.halt_reason();
                }
            }
        }

        report.finish();
        self.progress.complete();
        report
    }

    async fn execute(
        &self,
        step: MigrationStep,
        local: &AccountIdentity,
        target: &AccountIdentity,
    ) -> Result<(), MigrationError> {
        match step {
            MigrationStep::RenameLocalHomeAside => self.quarantine_local_home(local).await,
            MigrationStep::DeleteLocalAccountRecord => self.retire_local_record(local).await,
            MigrationStep::ProvisionNetworkMobileAccount => self.provision(target).await,
            MigrationStep::RelocateHomeContent => self.relocate_content(local, target).await,
            MigrationStep::RepairOwnership => self.repair_ownership(target).await,
        }
    }

    async fn quarantine_local_home(&self, local: &AccountIdentity) -> Result<(), MigrationError> {
        let from = local.home_path();
        let to = quarantine_path(from);
        fs::rename(from, &to)
            .await
            .map_err(|source| MigrationError::Quarantine {
                from: from.to_path_buf(),
                to,
                source,
            })
    }

    async fn retire_local_record(&self, local: &AccountIdentity) -> Result<(), MigrationError> {
        self.tools
            .delete_account_record(local.account_name())
            .await
            .map_err(|source| MigrationError::RecordDeletion {
                account: local.account_name().to_string(),
                source,
            })
    }

    async fn provision(&self, target: &AccountIdentity) -> Result<(), MigrationError> {
        self.tools
            .provision_mobile_account(target.account_name())
            .await
            .map_err(|source| MigrationError::Provisioning {
                account: target.account_name().to_string(),
                source,
            })
    }

    /// 4a: provisioned home aside; 4b: quarantine into the target home
    async fn relocate_content(
        &self,
        local: &AccountIdentity,
        target: &AccountIdentity,
    ) -> Result<(), MigrationError> {
        let target_home = target.home_path();
        let emptied = emptied_target_path(target_home);
        fs::rename(target_home, &emptied)
            .await
            .map_err(|source| MigrationError::MoveTargetAside {
                from: target_home.to_path_buf(),
                to: emptied.clone(),
                source,
            })?;

        let quarantine = quarantine_path(local.home_path());
        fs::rename(&quarantine, target_home)
            .await
            .map_err(|source| MigrationError::MoveContentIntoPlace {
                from: quarantine.clone(),
                to: target_home.to_path_buf(),
                source,
            })
    }

    async fn repair_ownership(&self, target: &AccountIdentity) -> Result<(), MigrationError> {
        let account = target.account_name();
        let group = self
            .tools
            .primary_group_id(account)
            .await
            .map_err(|source| MigrationError::GroupLookup {
                account: account.to_string(),
                source,
            })?;

        self.tools
            .change_owner_recursive(account, group, target.home_path())
            .await
            .map_err(|source| MigrationError::OwnershipChange {
                path: target.home_path().to_path_buf(),
                owner: account.to_string(),
                group,
                source,
            })
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).await.is_ok()
}
