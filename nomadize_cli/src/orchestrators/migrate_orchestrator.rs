//! Migrate command orchestrator
//!
//! Picks the local account, confirms the network account exists, shows the
//! plan and then hands over to the core migration state machine.

use super::lookup_orchestrator::{LookupOrchestrator, TargetLookup};
use crate::config::AppConfig;
use crate::error::{CliError, ErrorContext, ExitCode};
use crate::progress::ConsoleProgress;
use crate::prompt::Prompter;
use anyhow::Result;
use colored::*;
use log::{debug, info};
use nomadize_core::migration::identity::validate_account_name;
use nomadize_core::progress::{MigrationProgress, NullProgress};
use nomadize_core::{
    AccountIdentity, AccountTools, DirectoryService, LocalAccountCandidate, MigrationOrchestrator,
    MigrationPlan, MigrationReport, SearchScope, StepOutcome, ToolPaths, list_local_accounts,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Migrate command options
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Local account to migrate; prompted for when absent
    pub local: Option<String>,
    /// Network account to migrate into; prompted for when absent
    pub target: Option<String>,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
    /// Print the plan and stop
    pub dry_run: bool,
    /// Machine-readable output on stdout
    pub json: bool,
    /// Whether prompts can be answered
    pub interactive: bool,
}

/// Orchestrator for the migrate command
pub struct MigrateOrchestrator<S: DirectoryService, T: AccountTools, P: Prompter> {
    lookup: LookupOrchestrator<S>,
    migration: MigrationOrchestrator<T>,
    prompter: P,
    accounts_root: PathBuf,
    scope: SearchScope,
    tool_paths: ToolPaths,
    options: MigrateOptions,
}

impl<S, T, P> MigrateOrchestrator<S, T, P>
where
    S: DirectoryService + Send + Sync + 'static,
    T: AccountTools,
    P: Prompter,
{
    pub fn new(
        lookup: LookupOrchestrator<S>,
        tools: T,
        prompter: P,
        config: &AppConfig,
        options: MigrateOptions,
    ) -> Self {
        debug!("Creating migrate orchestrator with options: {options:?}");

        let progress: Arc<dyn MigrationProgress> = if options.json {
            Arc::new(NullProgress)
        } else {
            Arc::new(ConsoleProgress::new())
        };

        Self {
            scope: lookup.config().scope,
            lookup,
            migration: MigrationOrchestrator::with_progress(tools, progress),
            prompter,
            accounts_root: config.migration.accounts_root.clone(),
            tool_paths: config.tools.clone(),
            options,
        }
    }

    /// Execute the migrate command
    pub async fn execute(&self) -> Result<ExitCode> {
        let candidates = list_local_accounts(&self.accounts_root)?;
        let local = self.resolve_local(&candidates)?;
        let target_name = self.resolve_target(local.account_name()).await?;
        let target = AccountIdentity::under_root(&self.accounts_root, &target_name)?;
        info!("Migrating {local} into {target}");

        self.migration.preflight(&local, &target).await?;
        let plan = MigrationPlan::for_identities(&local, &target, &self.tool_paths);

        if self.options.dry_run {
            if self.options.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{plan}");
                println!("{}", "Dry run: nothing was changed.".dimmed());
            }
            return Ok(ExitCode::Success);
        }

        if !self.options.assume_yes {
            if !self.options.interactive {
                return Err(CliError::misuse(
                    "Refusing to migrate without confirmation in a non-interactive session",
                )
                .with_suggestion("Pass --yes to confirm, or --dry-run to see the plan")
                .into());
            }
            if !self.prompter.confirm_migration(&plan)? {
                self.prompter.notify("Migration cancelled; nothing was changed.");
                return Ok(ExitCode::Success);
            }
        }

        let report = self.migration.run(&local, &target).await;

        if self.options.json {
            println!("{}", report.to_json()?);
        } else {
            eprint!("{}", render_report(&report, &plan));
        }

        Ok(exit_code_for(&report))
    }

    fn resolve_local(&self, candidates: &[LocalAccountCandidate]) -> Result<AccountIdentity> {
        let root = self.accounts_root.display().to_string();

        if let Some(name) = &self.options.local {
            let candidate = candidates
                .iter()
                .find(|candidate| &candidate.name == name)
                .ok_or_else(|| {
                    CliError::misuse(&format!("'{name}' is not a local account"))
                        .with_context("accounts root", &root)
                        .with_suggestion("Run 'nomadize accounts' to list local accounts")
                })?;
            return Ok(AccountIdentity::new(&candidate.name, &candidate.home_path)?);
        }

        if candidates.is_empty() {
            return Err(CliError::filesystem("No local accounts found")
                .with_context("accounts root", &root)
                .into());
        }
        if !self.options.interactive {
            return Err(CliError::misuse(
                "--local is required when not running interactively",
            )
            .into());
        }

        let index = self.prompter.select_account(candidates)?;
        let candidate = candidates
            .get(index)
            .ok_or_else(|| CliError::misuse(&format!("Selection {} is out of range", index + 1)))?;
        Ok(AccountIdentity::new(&candidate.name, &candidate.home_path)?)
    }

    /// Find a network account that exists; re-asks on a definite miss when interactive
    async fn resolve_target(&self, local_name: &str) -> Result<String> {
        let mut given = self.options.target.clone();

        loop {
            let name = match given.take() {
                Some(name) => name.trim().to_string(),
                None if self.options.interactive => {
                    self.prompter.target_account(Some(local_name))?
                }
                None => {
                    return Err(CliError::misuse(
                        "--target is required when not running interactively",
                    )
                    .into());
                }
            };
            validate_account_name(&name)?;

            match self.lookup.check_account(&name, self.scope).await? {
                TargetLookup::Found(count) => {
                    debug!("'{name}' found with {count} record(s)");
                    return Ok(name);
                }
                TargetLookup::NotFound if self.options.interactive => {
                    self.prompter.notify(&format!(
                        "No account named '{name}' in the {} directory; try again.",
                        self.scope
                    ));
                }
                TargetLookup::NotFound => {
                    return Err(CliError::general(&format!(
                        "No account named '{name}' in the {} directory",
                        self.scope
                    ))
                    .with_suggestion("Check the spelling, or search another scope with --scope")
                    .into());
                }
            }
        }
    }
}

/// Exit status for a finished run
pub fn exit_code_for(report: &MigrationReport) -> ExitCode {
    if report.is_fully_migrated() {
        ExitCode::Success
    } else if report.aborted_before_changes() {
        ExitCode::FilesystemError
    } else {
        ExitCode::PartialMigration
    }
}

/// Human summary of a finished run
pub fn render_report(report: &MigrationReport, plan: &MigrationPlan) -> String {
    let mut output = String::new();

    for record in &report.steps {
        let line = match &record.outcome {
            StepOutcome::Succeeded => format!("{} {}", "✓".green(), record.step),
            StepOutcome::Failed(err) => {
                format!("{} {}: {}", "✗".red(), record.step, err.to_string().red())
            }
            StepOutcome::Skipped { reason } => {
                format!("{} {}: skipped ({reason})", "-".yellow(), record.step)
            }
        };
        output.push_str(&line);
        output.push('\n');
    }
    output.push('\n');

    if report.is_fully_migrated() {
        output.push_str(&format!(
            "{} {} now belongs to {}\n",
            "Migrated:".green().bold(),
            report.target.home_path().display(),
            report.target.account_name()
        ));
    } else if report.aborted_before_changes() {
        output.push_str(&format!(
            "{} nothing was changed\n",
            "Not migrated:".red().bold()
        ));
    } else {
        output.push_str(&format!(
            "{} finish the failed steps by hand; there is no rollback\n",
            "Partially migrated:".yellow().bold()
        ));
    }

    let leftovers: Vec<_> = plan
        .leftover_paths()
        .into_iter()
        .filter(|path| path.exists())
        .collect();
    if !leftovers.is_empty() {
        output.push_str("\nLeft on disk for review:\n");
        for path in leftovers {
            output.push_str(&format!("  {}\n", path.display()));
        }
    }

    output
}
