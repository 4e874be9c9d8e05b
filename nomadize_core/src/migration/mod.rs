//! Local-to-mobile account migration
//!
//! The steps, in order:
//! 1. rename the local home to `<home>.Nomadize`
//! 2. delete the local account record
//! 3. provision the mobile account for the network identity
//! 4. move the provisioned home aside and the quarantined home into its place
//! 5. re-own the target home for the network identity
//!
//! Nothing is rolled back. Every step's outcome ends up in a
//! [`MigrationReport`].

pub mod identity;
pub mod layout;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod step;
pub mod tools;

// Re-export main types
pub use identity::AccountIdentity;
pub use orchestrator::MigrationOrchestrator;
pub use plan::{MigrationPlan, PlannedAction};
pub use report::{MigrationOutcome, MigrationReport, StepOutcome, StepRecord};
pub use step::MigrationStep;
pub use tools::{AccountTools, SystemAccountTools, ToolPaths};
