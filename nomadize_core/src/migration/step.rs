//! Migration steps

use super::identity::AccountIdentity;
use super::layout::{emptied_target_path, quarantine_path};
use serde::Serialize;
use std::fmt;

/// One step of a migration, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStep {
    /// Rename the local home to its quarantine path
    RenameLocalHomeAside,
    /// Delete the local account record
    DeleteLocalAccountRecord,
    /// Create the mobile account for the network identity
    ProvisionNetworkMobileAccount,
    /// Swap the quarantined content into the provisioned home
    RelocateHomeContent,
    /// Give the target account ownership of its home
    RepairOwnership,
}

impl MigrationStep {
    /// All steps in execution order
    pub const ALL: [MigrationStep; 5] = [
        MigrationStep::RenameLocalHomeAside,
        MigrationStep::DeleteLocalAccountRecord,
        MigrationStep::ProvisionNetworkMobileAccount,
        MigrationStep::RelocateHomeContent,
        MigrationStep::RepairOwnership,
    ];

    /// 1-based step number
    pub const fn number(self) -> u8 {
        match self {
            Self::RenameLocalHomeAside => 1,
            Self::DeleteLocalAccountRecord => 2,
            Self::ProvisionNetworkMobileAccount => 3,
            Self::RelocateHomeContent => 4,
            Self::RepairOwnership => 5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::RenameLocalHomeAside => "quarantine local home",
            Self::DeleteLocalAccountRecord => "retire local account record",
            Self::ProvisionNetworkMobileAccount => "provision mobile account",
            Self::RelocateHomeContent => "relocate home content",
            Self::RepairOwnership => "repair ownership",
        }
    }

    /// Why later steps are skipped when this one fails; `None` if the run continues
    pub const fn halt_reason(self) -> Option<&'static str> {
        match self {
            Self::RenameLocalHomeAside => Some("local home could not be quarantined"),
            Self::ProvisionNetworkMobileAccount => Some("mobile account provisioning failed"),
            Self::RelocateHomeContent => Some("home content was not relocated"),
            Self::DeleteLocalAccountRecord | Self::RepairOwnership => None,
        }
    }

    pub const fn halts_on_failure(self) -> bool {
        self.halt_reason().is_some()
    }

    /// What this step does to the given pair of accounts
    pub fn describe(self, local: &AccountIdentity, target: &AccountIdentity) -> String {
        match self {
            Self::RenameLocalHomeAside => format!(
                "rename {} to {}",
                local.home_path().display(),
                quarantine_path(local.home_path()).display()
            ),
            Self::DeleteLocalAccountRecord => {
                format!("delete local account record '{}'", local.account_name())
            }
            Self::ProvisionNetworkMobileAccount => {
                format!("create mobile account '{}'", target.account_name())
            }
            Self::RelocateHomeContent => format!(
                "rename {} to {}, then {} to {}",
                target.home_path().display(),
                emptied_target_path(target.home_path()).display(),
                quarantine_path(local.home_path()).display(),
                target.home_path().display()
            ),
            Self::RepairOwnership => format!(
                "give '{}' and its primary group ownership of {}",
                target.account_name(),
                target.home_path().display()
            ),
        }
    }
}

impl fmt::Display for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.name())
    }
}
