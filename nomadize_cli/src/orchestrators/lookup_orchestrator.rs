//! Lookup command orchestrator
//!
//! Directory queries are blocking calls into the daemon, so they run on the
//! blocking pool while the CLI stays on the async runtime.

use crate::error::{CliError, ExitCode};
use anyhow::{Context, Result};
use colored::*;
use log::{debug, warn};
use nomadize_core::error::{QueryError, QueryStage};
use nomadize_core::{DirectoryQueryClient, DirectoryService, QueryConfig, QueryOutcome, SearchScope};
use serde::Serialize;
use std::sync::Arc;

/// Whether a target account could be found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLookup {
    /// The account exists with this many matching records
    Found(u32),
    /// Every stage succeeded and nothing matched
    NotFound,
}

/// JSON form of a lookup
#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub account: String,
    pub scope: SearchScope,
    /// Match count, or the failing stage's negative code
    pub code: i64,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<QueryStage>,
}

impl LookupReport {
    fn new(account: &str, scope: SearchScope, outcome: QueryOutcome) -> Self {
        Self {
            account: account.to_string(),
            scope,
            code: outcome.code(),
            exists: outcome.exists(),
            failed_stage: match outcome {
                QueryOutcome::Indeterminate(stage) => Some(stage),
                _ => None,
            },
        }
    }
}

/// Orchestrator for directory lookups
pub struct LookupOrchestrator<S: DirectoryService> {
    client: Arc<DirectoryQueryClient<S>>,
}

impl<S> LookupOrchestrator<S>
where
    S: DirectoryService + Send + Sync + 'static,
{
    pub fn new(client: DirectoryQueryClient<S>) -> Self {
        debug!("Creating lookup orchestrator with {:?}", client.config());
        Self {
            client: Arc::new(client),
        }
    }

    pub fn config(&self) -> &QueryConfig {
        self.client.config()
    }

    /// Run one query; directory failures come back as `Err(QueryError)`
    async fn query(&self, name: &str, scope: SearchScope) -> Result<Result<u32, QueryError>> {
        let client = Arc::clone(&self.client);
        let account = name.to_string();
        let result = tokio::task::spawn_blocking(move || client.resolve_user_exists(&account, scope))
            .await
            .context("Directory lookup task failed")?;

        match result {
            Ok(count) => Ok(Ok(count)),
            Err(nomadize_core::Error::Directory(err)) => Ok(Err(err)),
            Err(other) => Err(other.into()),
        }
    }

    /// Check that `name` exists; an indeterminate answer is an error
    pub async fn check_account(&self, name: &str, scope: SearchScope) -> Result<TargetLookup> {
        match self.query(name, scope).await? {
            Ok(0) => Ok(TargetLookup::NotFound),
            Ok(count) => {
                if count > 1 {
                    warn!("'{name}' matches {count} records in the {scope} directory");
                }
                Ok(TargetLookup::Found(count))
            }
            Err(err) => {
                warn!("Lookup of '{name}' failed with code {}: {err}", err.code());
                Err(CliError::from(err).into())
            }
        }
    }

    /// Execute the lookup command
    ///
    /// Exits 0 when found, 1 when absent and 3 when the directory could not
    /// answer.
    pub async fn execute(&self, name: &str, scope: SearchScope, json: bool) -> Result<ExitCode> {
        let result = self.query(name, scope).await?;
        let outcome = QueryOutcome::from(&result);
        let code = match outcome {
            QueryOutcome::Present(_) => ExitCode::Success,
            QueryOutcome::Absent => ExitCode::GeneralError,
            QueryOutcome::Indeterminate(_) => ExitCode::DirectoryError,
        };

        if json {
            let report = LookupReport::new(name, scope, outcome);
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(code);
        }

        match result {
            Ok(0) => println!(
                "{} {name}: no account in the {scope} directory",
                "✗".red()
            ),
            Ok(count) => println!(
                "{} {name}: found in the {scope} directory ({count} record{})",
                "✓".green(),
                if count == 1 { "" } else { "s" }
            ),
            Err(err) => return Err(CliError::from(err).into()),
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_for_indeterminate_outcome() {
        let report = LookupReport::new(
            "alice",
            SearchScope::NetworkOnly,
            QueryOutcome::Indeterminate(QueryStage::NodeOpen),
        );

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["code"], -4);
        assert_eq!(value["exists"], false);
        assert_eq!(value["failed_stage"], "node_open");
        assert_eq!(value["scope"], "network");
    }

    #[test]
    fn test_report_for_present_outcome_has_no_stage() {
        let report = LookupReport::new("alice", SearchScope::LocalOnly, QueryOutcome::Present(2));

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["code"], 2);
        assert_eq!(value["exists"], true);
        assert!(value.get("failed_stage").is_none());
    }
}
