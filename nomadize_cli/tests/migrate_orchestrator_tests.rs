//! Migrate command orchestration tests
//!
//! The orchestrator runs against the mock directory, mock account tools and
//! scripted prompt answers; a temporary accounts root stands in for /Users.

use nomadize_cli::config::AppConfig;
use nomadize_cli::error::{CliError, ExitCode};
use nomadize_cli::orchestrators::lookup_orchestrator::LookupOrchestrator;
use nomadize_cli::orchestrators::migrate_orchestrator::{
    MigrateOptions, MigrateOrchestrator, exit_code_for, render_report,
};
use nomadize_cli::prompt::Prompter;
use nomadize_core::{
    DirectoryQueryClient, LocalAccountCandidate, MigrationOrchestrator, MigrationPlan,
    SearchScope, ToolPaths,
};
use nomadize_test_utils::mocks::MOCK_FAILURE_STATUS;
use nomadize_test_utils::{
    InjectedFailure, MockAccountTools, MockCall, MockDirectoryService, TestAccountsRoot,
    TestHomeBuilder, snapshot,
};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Answers prompts from queues and records what it was told
#[derive(Default)]
struct ScriptedPrompter {
    selections: RefCell<VecDeque<usize>>,
    targets: RefCell<VecDeque<String>>,
    confirmations: RefCell<VecDeque<bool>>,
    notices: RefCell<Vec<String>>,
    asked_to_confirm: RefCell<usize>,
}

impl ScriptedPrompter {
    fn selecting(self, index: usize) -> Self {
        self.selections.borrow_mut().push_back(index);
        self
    }

    fn answering_targets(self, names: &[&str]) -> Self {
        self.targets
            .borrow_mut()
            .extend(names.iter().map(|name| name.to_string()));
        self
    }

    fn confirming(self, answer: bool) -> Self {
        self.confirmations.borrow_mut().push_back(answer);
        self
    }
}

impl Prompter for &ScriptedPrompter {
    fn select_account(&self, _candidates: &[LocalAccountCandidate]) -> anyhow::Result<usize> {
        self.selections
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unexpected selection prompt"))
    }

    fn target_account(&self, _suggestion: Option<&str>) -> anyhow::Result<String> {
        self.targets
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unexpected target prompt"))
    }

    fn confirm_migration(&self, _plan: &MigrationPlan) -> anyhow::Result<bool> {
        *self.asked_to_confirm.borrow_mut() += 1;
        self.confirmations
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("unexpected confirmation prompt"))
    }

    fn notify(&self, message: &str) {
        self.notices.borrow_mut().push(message.to_string());
    }
}

fn accounts() -> TestAccountsRoot {
    TestHomeBuilder::new()
        .with_file("alice", "Documents/notes.txt", b"meeting at ten")
        .with_file("carol", "Desktop/todo.md", b"- migrate")
        .build()
        .unwrap()
}

fn config_for(root: &TestAccountsRoot) -> AppConfig {
    let mut config = AppConfig::default();
    config.migration.accounts_root = root.path().to_path_buf();
    config
}

fn options(local: Option<&str>, target: Option<&str>) -> MigrateOptions {
    MigrateOptions {
        local: local.map(str::to_string),
        target: target.map(str::to_string),
        ..Default::default()
    }
}

async fn execute(
    root: &TestAccountsRoot,
    directory: &MockDirectoryService,
    tools: &MockAccountTools,
    prompter: &ScriptedPrompter,
    options: MigrateOptions,
) -> Result<ExitCode, CliError> {
    let lookup = LookupOrchestrator::new(DirectoryQueryClient::new(directory.clone()));
    MigrateOrchestrator::new(lookup, tools.clone(), prompter, &config_for(root), options)
        .execute()
        .await
        .map_err(CliError::from)
}

fn directory_with(name: &str) -> MockDirectoryService {
    MockDirectoryService::new().with_user(SearchScope::NetworkOnly, name)
}

#[cfg(test)]
mod non_interactive {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let root = accounts();
        let before = snapshot(root.path()).unwrap();
        let directory = directory_with("bob");
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default();

        let code = execute(
            &root,
            &directory,
            &tools,
            &prompter,
            MigrateOptions {
                dry_run: true,
                ..options(Some("alice"), Some("bob"))
            },
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::Success);
        assert_eq!(snapshot(root.path()).unwrap(), before);
        assert!(tools.calls().is_empty());
        assert!(directory.calls().contains(&MockCall::OpenSession));
    }

    #[tokio::test]
    async fn test_full_run_with_yes() {
        let root = accounts();
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default();

        let code = execute(
            &root,
            &directory_with("bob"),
            &tools,
            &prompter,
            MigrateOptions {
                assume_yes: true,
                ..options(Some("alice"), Some("bob"))
            },
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::Success);
        assert!(root.home("bob").join("Documents/notes.txt").is_file());
        assert!(!root.home("alice").exists());
        assert_eq!(*prompter.asked_to_confirm.borrow(), 0);
    }

    #[tokio::test]
    async fn test_missing_target_is_an_error() {
        let root = accounts();
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default();

        let error = execute(
            &root,
            &directory_with("bob"),
            &tools,
            &prompter,
            MigrateOptions {
                assume_yes: true,
                ..options(Some("alice"), Some("ghost"))
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.exit_code(), ExitCode::GeneralError);
        assert!(error.to_string().contains("ghost"));
        assert!(tools.calls().is_empty());
        assert!(root.home("alice").is_dir());
    }

    /// A directory failure aborts before any change
    #[tokio::test]
    async fn test_indeterminate_lookup_aborts() {
        let root = accounts();
        let directory = directory_with("bob")
            .with_failure(InjectedFailure::RecordList(MOCK_FAILURE_STATUS));
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default();

        let error = execute(
            &root,
            &directory,
            &tools,
            &prompter,
            MigrateOptions {
                assume_yes: true,
                ..options(Some("alice"), Some("bob"))
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.exit_code(), ExitCode::DirectoryError);
        assert!(error.to_string().contains("code: -5"), "{error}");
        assert!(tools.calls().is_empty());
        assert!(root.home("alice").is_dir());
    }

    #[tokio::test]
    async fn test_refuses_without_confirmation() {
        let root = accounts();
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default();

        let error = execute(
            &root,
            &directory_with("bob"),
            &tools,
            &prompter,
            options(Some("alice"), Some("bob")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.exit_code(), ExitCode::Misuse);
        assert!(error.suggestions.iter().any(|s| s.contains("--yes")));
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_local_account() {
        let root = accounts();
        let directory = directory_with("bob");
        let tools = MockAccountTools::new();
        let prompter = ScriptedPrompter::default();

        let error = execute(
            &root,
            &directory,
            &tools,
            &prompter,
            options(Some("dave"), Some("bob")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.exit_code(), ExitCode::Misuse);
        // No directory traffic before the local account is settled
        assert!(directory.calls().is_empty());
    }

    #[tokio::test]
    async fn test_local_required_without_terminal() {
        let root = accounts();
        let prompter = ScriptedPrompter::default();

        let error = execute(
            &root,
            &directory_with("bob"),
            &MockAccountTools::new(),
            &prompter,
            options(None, Some("bob")),
        )
        .await
        .unwrap_err();

        assert_eq!(error.exit_code(), ExitCode::Misuse);
        assert!(error.to_string().contains("--local"));
    }

    #[tokio::test]
    async fn test_provisioning_failure_is_partial() {
        let root = accounts();
        let tools = MockAccountTools::new()
            .provisioning_homes_under(root.path())
            .failing_provision();
        let prompter = ScriptedPrompter::default();

        let code = execute(
            &root,
            &directory_with("bob"),
            &tools,
            &prompter,
            MigrateOptions {
                assume_yes: true,
                json: true,
                ..options(Some("alice"), Some("bob"))
            },
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::PartialMigration);
        assert!(root.path().join("alice.Nomadize").is_dir());
    }

    #[tokio::test]
    async fn test_leftover_from_earlier_run_is_refused() {
        let root = TestHomeBuilder::new()
            .with_home("alice")
            .with_home("alice.Nomadize")
            .build()
            .unwrap();
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default();

        let error = execute(
            &root,
            &directory_with("bob"),
            &tools,
            &prompter,
            MigrateOptions {
                assume_yes: true,
                ..options(Some("alice"), Some("bob"))
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.exit_code(), ExitCode::FilesystemError);
        assert!(tools.calls().is_empty());
    }
}

#[cfg(test)]
mod interactive {
    use super::*;

    fn interactive(local: Option<&str>, target: Option<&str>) -> MigrateOptions {
        MigrateOptions {
            interactive: true,
            ..options(local, target)
        }
    }

    /// A definite miss asks again instead of failing
    #[tokio::test]
    async fn test_absent_target_is_asked_again() {
        let root = accounts();
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default()
            .answering_targets(&["ghost", "bob"])
            .confirming(true);

        let code = execute(
            &root,
            &directory_with("bob"),
            &tools,
            &prompter,
            interactive(Some("alice"), None),
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::Success);
        assert!(prompter.notices.borrow()[0].contains("ghost"));
        assert!(root.home("bob").join("Documents/notes.txt").is_file());
    }

    #[tokio::test]
    async fn test_selection_picks_the_local_account() {
        let root = accounts();
        let prompter = ScriptedPrompter::default().selecting(1);

        let code = execute(
            &root,
            &directory_with("bob"),
            &MockAccountTools::new(),
            &prompter,
            MigrateOptions {
                dry_run: true,
                ..interactive(None, Some("bob"))
            },
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::Success);
        assert!(prompter.selections.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_declining_changes_nothing() {
        let root = accounts();
        let before = snapshot(root.path()).unwrap();
        let tools = MockAccountTools::new().provisioning_homes_under(root.path());
        let prompter = ScriptedPrompter::default().confirming(false);

        let code = execute(
            &root,
            &directory_with("bob"),
            &tools,
            &prompter,
            interactive(Some("alice"), Some("bob")),
        )
        .await
        .unwrap();

        assert_eq!(code, ExitCode::Success);
        assert_eq!(*prompter.asked_to_confirm.borrow(), 1);
        assert!(tools.calls().is_empty());
        assert_eq!(snapshot(root.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn test_indeterminate_lookup_is_not_asked_again() {
        let root = accounts();
        let directory =
            MockDirectoryService::new().with_failure(InjectedFailure::NodeOpen(MOCK_FAILURE_STATUS));
        let prompter = ScriptedPrompter::default().answering_targets(&["bob", "bob"]);

        let error = execute(
            &root,
            &directory,
            &MockAccountTools::new(),
            &prompter,
            interactive(Some("alice"), None),
        )
        .await
        .unwrap_err();

        assert_eq!(error.exit_code(), ExitCode::DirectoryError);
        assert_eq!(prompter.targets.borrow().len(), 1);
    }
}

#[cfg(test)]
mod reporting {
    use super::*;

    #[tokio::test]
    async fn test_partial_report_lists_leftovers() {
        colored::control::set_override(false);
        let root = accounts();
        let local = root.identity("alice");
        let target = root.identity("bob");
        let tools = MockAccountTools::new()
            .provisioning_homes_under(root.path())
            .failing_provision();
        let plan = MigrationPlan::for_identities(&local, &target, &ToolPaths::default());

        let report = MigrationOrchestrator::new(tools).run(&local, &target).await;
        let rendered = render_report(&report, &plan);

        assert_eq!(exit_code_for(&report), ExitCode::PartialMigration);
        assert!(rendered.contains("✗ step 3 (provision mobile account)"), "{rendered}");
        assert!(rendered.contains("- step 4 (relocate home content): skipped"));
        assert!(rendered.contains("Partially migrated:"));
        assert!(rendered.contains("alice.Nomadize"));
    }

    #[tokio::test]
    async fn test_quarantine_failure_exits_as_filesystem_error() {
        let root = TestHomeBuilder::new().with_home("bob").build().unwrap();
        let report = MigrationOrchestrator::new(MockAccountTools::new())
            .run(&root.identity("alice"), &root.identity("bob"))
            .await;

        assert_eq!(exit_code_for(&report), ExitCode::FilesystemError);
    }
}
