//! External account tools
//!
//! [`AccountTools`] is the seam between the orchestrator and the system
//! utilities that change the account database. [`SystemAccountTools`] runs
//! the real binaries with `tokio::process`.

use crate::error::ToolError;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Record path prefix for local user records
pub const LOCAL_USER_RECORD_PREFIX: &str = "/Users/";

/// Operations on the account database
#[async_trait]
pub trait AccountTools: Send + Sync {
    /// Delete the local user record named `account`
    async fn delete_account_record(&self, account: &str) -> Result<(), ToolError>;

    /// Create a mobile account (and its home) for the network user `account`
    async fn provision_mobile_account(&self, account: &str) -> Result<(), ToolError>;

    /// Resolve the primary group id of `account`
    async fn primary_group_id(&self, account: &str) -> Result<u32, ToolError>;

    /// Recursively change the owner and group of `path`
    async fn change_owner_recursive(
        &self,
        owner: &str,
        group: u32,
        path: &Path,
    ) -> Result<(), ToolError>;
}

/// Locations of the account utilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub dscl: PathBuf,
    pub createmobileaccount: PathBuf,
    pub id: PathBuf,
    pub chown: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            dscl: PathBuf::from("/usr/bin/dscl"),
            createmobileaccount: PathBuf::from(
                "/System/Library/CoreServices/ManagedClient.app/Contents/Resources/createmobileaccount",
            ),
            id: PathBuf::from("/usr/bin/id"),
            chown: PathBuf::from("/usr/sbin/chown"),
        }
    }
}

impl ToolPaths {
    /// Command line for deleting a local record
    pub fn delete_command(&self, account: &str) -> Vec<String> {
        vec![
            self.dscl.display().to_string(),
            ".".to_string(),
            "-delete".to_string(),
            format!("{LOCAL_USER_RECORD_PREFIX}{account}"),
        ]
    }

    /// Command line for provisioning a mobile account
    pub fn provision_command(&self, account: &str) -> Vec<String> {
        vec![
            self.createmobileaccount.display().to_string(),
            "-n".to_string(),
            account.to_string(),
        ]
    }

    /// Command line for resolving a primary group
    pub fn group_command(&self, account: &str) -> Vec<String> {
        vec![
            self.id.display().to_string(),
            "-g".to_string(),
            account.to_string(),
        ]
    }

    /// Command line for a recursive ownership change; `group` is rendered as given
    pub fn chown_command(&self, owner: &str, group: &str, path: &Path) -> Vec<String> {
        vec![
            self.chown.display().to_string(),
            "-R".to_string(),
            format!("{owner}:{group}"),
            path.display().to_string(),
        ]
    }
}

/// [`AccountTools`] backed by the system utilities
#[derive(Debug, Clone, Default)]
pub struct SystemAccountTools {
    paths: ToolPaths,
}

impl SystemAccountTools {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    /// Run a command line built by [`ToolPaths`] and return its stdout;
    /// a non-zero exit is an error
    async fn run(&self, argv: Vec<String>) -> Result<String, ToolError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(ToolError::unexpected_output("<none>", "empty command line"));
        };
        let mut command = Command::new(program);
        command.args(args);
        debug!("Running {command:?}");

        let output = command.output().await.map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ToolError::non_zero_exit(
                program,
                output.status.code(),
                &String::from_utf8_lossy(&output.stderr),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl AccountTools for SystemAccountTools {
    async fn delete_account_record(&self, account: &str) -> Result<(), ToolError> {
        self.run(self.paths.delete_command(account)).await.map(drop)
    }

    async fn provision_mobile_account(&self, account: &str) -> Result<(), ToolError> {
        self.run(self.paths.provision_command(account)).await.map(drop)
    }

    async fn primary_group_id(&self, account: &str) -> Result<u32, ToolError> {
        let stdout = self.run(self.paths.group_command(account)).await?;
        let trimmed = stdout.trim();
        trimmed
            .parse::<u32>()
            .map_err(|_| ToolError::unexpected_output(&self.paths.id.display().to_string(), trimmed))
    }

    async fn change_owner_recursive(
        &self,
        owner: &str,
        group: u32,
        path: &Path,
    ) -> Result<(), ToolError> {
        self.run(self.paths.chown_command(owner, &group.to_string(), path))
            .await
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = ToolPaths::default();
        assert_eq!(paths.dscl, Path::new("/usr/bin/dscl"));
        assert_eq!(paths.id, Path::new("/usr/bin/id"));
        assert_eq!(paths.chown, Path::new("/usr/sbin/chown"));
        assert!(paths.createmobileaccount.ends_with("createmobileaccount"));
    }

    #[test]
    fn test_command_lines() {
        let paths = ToolPaths::default();
        assert_eq!(
            paths.delete_command("alice"),
            ["/usr/bin/dscl", ".", "-delete", "/Users/alice"]
        );
        assert_eq!(paths.provision_command("bob")[1..], ["-n", "bob"]);
        assert_eq!(
            paths.chown_command("bob", "20", Path::new("/Users/bob")),
            ["/usr/sbin/chown", "-R", "bob:20", "/Users/bob"]
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let paths: ToolPaths = serde_json::from_str(r#"{"id": "/opt/bin/id"}"#).unwrap();
        assert_eq!(paths.id, Path::new("/opt/bin/id"));
        assert_eq!(paths.dscl, Path::new("/usr/bin/dscl"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;

        fn tools_with(program: &str) -> SystemAccountTools {
            SystemAccountTools::new(ToolPaths {
                dscl: PathBuf::from(program),
                createmobileaccount: PathBuf::from(program),
                id: PathBuf::from(program),
                chown: PathBuf::from(program),
            })
        }

        #[tokio::test]
        async fn test_successful_tool() {
            let tools = tools_with("true");
            tools.delete_account_record("alice").await.unwrap();
            tools.provision_mobile_account("bob").await.unwrap();
            tools
                .change_owner_recursive("bob", 20, Path::new("/tmp"))
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_non_zero_exit_is_reported() {
            let tools = tools_with("false");
            let err = tools.provision_mobile_account("bob").await.unwrap_err();
            match err {
                ToolError::NonZeroExit { program, code, .. } => {
                    assert_eq!(program, "false");
                    assert_eq!(code, Some(1));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_missing_binary_is_spawn_error() {
            let tools = tools_with("/nonexistent/nomadize-test-tool");
            let err = tools.delete_account_record("alice").await.unwrap_err();
            assert!(matches!(err, ToolError::Spawn { .. }));
        }

        #[tokio::test]
        async fn test_group_id_parses_stdout() {
            let tools = tools_with("id");
            assert_eq!(tools.primary_group_id("root").await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_runs_the_planned_command_line() {
            let tools = tools_with("echo");
            let argv = tools
                .paths()
                .chown_command("bob", "20", Path::new("/Users/bob"));

            let stdout = tools.run(argv.clone()).await.unwrap();

            assert_eq!(stdout.trim(), argv[1..].join(" "));
            assert_eq!(stdout.trim(), "-R bob:20 /Users/bob");
        }

        #[tokio::test]
        async fn test_group_id_rejects_garbage() {
            // echo prints "-g alice", which is not a number
            let tools = tools_with("echo");
            let err = tools.primary_group_id("alice").await.unwrap_err();
            assert!(matches!(err, ToolError::UnexpectedOutput { .. }));
        }
    }
}
