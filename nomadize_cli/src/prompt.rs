//! Interactive prompts
//!
//! The migrate flow talks to the operator through [`Prompter`] so it can run
//! against scripted answers in tests.

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input};
use nomadize_core::migration::identity::validate_account_name;
use nomadize_core::{LocalAccountCandidate, MigrationPlan, parse_selection};

/// Questions the migrate command may ask
pub trait Prompter {
    /// Pick one of `candidates`, returning its index
    fn select_account(&self, candidates: &[LocalAccountCandidate]) -> Result<usize>;

    /// Ask for the network account name
    fn target_account(&self, suggestion: Option<&str>) -> Result<String>;

    /// Show the plan and ask whether to go ahead
    fn confirm_migration(&self, plan: &MigrationPlan) -> Result<bool>;

    /// Tell the operator something without asking
    fn notify(&self, message: &str);
}

/// Terminal prompts via dialoguer
#[derive(Debug, Default, Clone, Copy)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn select_account(&self, candidates: &[LocalAccountCandidate]) -> Result<usize> {
        eprintln!("{}", "Local accounts".bold());
        for (index, candidate) in candidates.iter().enumerate() {
            eprintln!(
                "  [{}] {} {}",
                index + 1,
                candidate.name,
                format!("({})", candidate.home_path.display()).dimmed()
            );
        }

        let count = candidates.len();
        let input: String = Input::new()
            .with_prompt(format!("Account to migrate [1-{count}]"))
            .validate_with(|input: &String| -> Result<(), String> {
                parse_selection(input, count)
                    .map(|_| ())
                    .map_err(|e| e.to_string())
            })
            .interact_text()
            .context("Failed to read selection")?;

        Ok(parse_selection(&input, count)?)
    }

    fn target_account(&self, suggestion: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::new().with_prompt("Network account name");
        if let Some(suggestion) = suggestion {
            input = input.default(suggestion.to_string());
        }

        let name = input
            .validate_with(|input: &String| -> Result<(), String> {
                validate_account_name(input.trim()).map_err(|e| e.to_string())
            })
            .interact_text()
            .context("Failed to read account name")?;

        Ok(name.trim().to_string())
    }

    fn confirm_migration(&self, plan: &MigrationPlan) -> Result<bool> {
        eprintln!();
        eprintln!("{}", "Migration plan".bold());
        eprintln!("{plan}");
        eprintln!(
            "{}",
            "There is no rollback. A failed step leaves the account half-migrated.".yellow()
        );

        Confirm::new()
            .with_prompt("Proceed with the migration?")
            .default(false)
            .interact()
            .context("Failed to read confirmation")
    }

    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}
