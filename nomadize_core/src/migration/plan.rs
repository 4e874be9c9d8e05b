//! Dry-run plans
//!
//! A plan lists, per step, the paths and command lines a run would touch,
//! without touching anything.

use super::identity::AccountIdentity;
use super::layout::{emptied_target_path, quarantine_path};
use super::step::MigrationStep;
use super::tools::ToolPaths;
use serde::Serialize;
use std::fmt;

/// One planned step
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    pub step: MigrationStep,
    pub number: u8,
    pub description: String,
    /// External command lines this step runs, in order
    pub commands: Vec<Vec<String>>,
    pub halts_on_failure: bool,
}

/// Ordered actions for one account pair
#[derive(Debug, Clone, Serialize)]
pub struct MigrationPlan {
    pub local: AccountIdentity,
    pub target: AccountIdentity,
    pub actions: Vec<PlannedAction>,
}

impl MigrationPlan {
    /// Build the plan for migrating `local` into `target`
    pub fn for_identities(
        local: &AccountIdentity,
        target: &AccountIdentity,
        tools: &ToolPaths,
    ) -> Self {
        let actions = MigrationStep::ALL
            .into_iter()
            .map(|step| PlannedAction {
                step,
                number: step.number(),
                description: step.describe(local, target),
                commands: commands_for(step, local, target, tools),
                halts_on_failure: step.halts_on_failure(),
            })
            .collect();

        Self {
            local: local.clone(),
            target: target.clone(),
            actions,
        }
    }

    /// Paths created by the run that an administrator may need to clean up
    pub fn leftover_paths(&self) -> [std::path::PathBuf; 2] {
        [
            quarantine_path(self.local.home_path()),
            emptied_target_path(self.target.home_path()),
        ]
    }
}

fn commands_for(
    step: MigrationStep,
    local: &AccountIdentity,
    target: &AccountIdentity,
    tools: &ToolPaths,
) -> Vec<Vec<String>> {
    match step {
        MigrationStep::RenameLocalHomeAside | MigrationStep::RelocateHomeContent => Vec::new(),
        MigrationStep::DeleteLocalAccountRecord => {
            vec![tools.delete_command(local.account_name())]
        }
        MigrationStep::ProvisionNetworkMobileAccount => {
            vec![tools.provision_command(target.account_name())]
        }
        MigrationStep::RepairOwnership => vec![
            tools.group_command(target.account_name()),
            tools.chown_command(target.account_name(), "<gid>", target.home_path()),
        ],
    }
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migrate {} into {}", self.local, self.target)?;
        for action in &self.actions {
            writeln!(f, "  {}. {}", action.number, action.description)?;
            for command in &action.commands {
                writeln!(f, "       $ {}", command.join(" "))?;
            }
        }
        Ok(())
    }
}
