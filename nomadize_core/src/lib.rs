//! Nomadize Core Library
//!
//! This is the core library for Nomadize, providing the directory-service
//! user lookup and the local-to-mobile account migration state machine.

pub mod accounts;
pub mod directory;
pub mod error;
pub mod migration;
pub mod progress;

// Re-export main types
pub use accounts::{DEFAULT_ACCOUNTS_ROOT, LocalAccountCandidate, list_local_accounts, parse_selection};
pub use directory::{
    DirectoryQueryClient, DirectoryService, QueryConfig, QueryOutcome, SearchScope,
};
#[cfg(target_os = "macos")]
pub use directory::native::NativeDirectoryService;
pub use error::{Error, Result};
pub use migration::{
    AccountIdentity, AccountTools, MigrationOrchestrator, MigrationOutcome, MigrationPlan,
    MigrationReport, MigrationStep, StepOutcome, SystemAccountTools, ToolPaths,
};
pub use progress::{MigrationProgress, NullProgress, ProgressUpdate};
