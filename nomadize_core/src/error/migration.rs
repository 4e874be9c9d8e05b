//! Migration error types
//!
//! Every variant names the step it came from and the account or path it
//! concerned, so a failure can be reported without extra context.

use std::path::PathBuf;
use thiserror::Error;

/// Failure running an external account tool
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool could not be started
    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure
    #[error("{program} exited with {}: {stderr}", describe_exit(.code))]
    NonZeroExit {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool succeeded but its output could not be interpreted
    #[error("{program} produced unexpected output '{output}'")]
    UnexpectedOutput { program: String, output: String },
}

impl ToolError {
    /// Create a non-zero exit error
    pub fn non_zero_exit(program: &str, code: Option<i32>, stderr: &str) -> Self {
        Self::NonZeroExit {
            program: program.to_string(),
            code,
            stderr: stderr.trim().to_string(),
        }
    }

    /// Create an unexpected output error
    pub fn unexpected_output(program: &str, output: &str) -> Self {
        Self::UnexpectedOutput {
            program: program.to_string(),
            output: output.trim().to_string(),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// A migration step failed
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Step 1: the local home could not be renamed aside
    #[error("Failed to quarantine {} as {}: {source}", .from.display(), .to.display())]
    Quarantine {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Step 2: the local account record could not be deleted
    #[error("Failed to delete local account record '{account}': {source}")]
    RecordDeletion {
        account: String,
        #[source]
        source: ToolError,
    },

    /// Step 3: the mobile account could not be provisioned
    #[error("Failed to provision mobile account '{account}': {source}")]
    Provisioning {
        account: String,
        #[source]
        source: ToolError,
    },

    /// Step 4a: the provisioned home could not be moved aside
    #[error("Failed to move provisioned home {} aside to {}: {source}", .from.display(), .to.display())]
    MoveTargetAside {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Step 4b: the quarantined home could not be moved into place
    #[error("Failed to move quarantined home {} into {}: {source}", .from.display(), .to.display())]
    MoveContentIntoPlace {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Step 5: the target account's group id could not be resolved
    #[error("Failed to resolve group id for '{account}': {source}")]
    GroupLookup {
        account: String,
        #[source]
        source: ToolError,
    },

    /// Step 5: the recursive ownership change failed
    #[error("Failed to change ownership of {} to {owner}:{group}: {source}", .path.display())]
    OwnershipChange {
        path: PathBuf,
        owner: String,
        group: u32,
        #[source]
        source: ToolError,
    },

    /// A read-only check before the run found an unsafe starting state
    #[error("Preflight check failed: {reason}")]
    Preflight { reason: String },
}

impl MigrationError {
    /// Create a preflight error
    pub fn preflight(reason: impl Into<String>) -> Self {
        Self::Preflight {
            reason: reason.into(),
        }
    }

    /// Label of the relocation move that failed (`4a` or `4b`), if any
    pub fn relocation_move(&self) -> Option<&'static str> {
        match self {
            Self::MoveTargetAside { .. } => Some("4a"),
            Self::MoveContentIntoPlace { .. } => Some("4b"),
            _ => None,
        }
    }
}
