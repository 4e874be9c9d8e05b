//! Mock account tools for testing

use async_trait::async_trait;
use nomadize_core::error::ToolError;
use nomadize_core::migration::AccountTools;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    DeleteRecord(String),
    Provision(String),
    GroupLookup(String),
    ChangeOwner {
        owner: String,
        group: u32,
        path: PathBuf,
    },
}

type ProvisionHook = Arc<dyn Fn(&str) + Send + Sync>;

struct ToolsBehavior {
    calls: Vec<ToolCall>,
    home_root: Option<PathBuf>,
    group_id: u32,
    fail_delete: bool,
    fail_provision: bool,
    fail_group_lookup: bool,
    fail_chown: bool,
    on_provision: Option<ProvisionHook>,
}

impl Default for ToolsBehavior {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            home_root: None,
            group_id: 20,
            fail_delete: false,
            fail_provision: false,
            fail_group_lookup: false,
            fail_chown: false,
            on_provision: None,
        }
    }
}

/// [`AccountTools`] that records calls instead of touching the account database
///
/// When given a home root, provisioning creates `<root>/<account>` with a
/// placeholder file, the way the real provisioning tool creates a fresh home.
/// Clones share state.
#[derive(Clone, Default)]
pub struct MockAccountTools {
    behavior: Arc<Mutex<ToolsBehavior>>,
}

impl std::fmt::Debug for MockAccountTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAccountTools")
            .field("calls", &self.behavior.lock().unwrap().calls)
            .finish_non_exhaustive()
    }
}

/// File written into homes created by mock provisioning
pub const PROVISIONED_MARKER: &str = ".provisioned";

impl MockAccountTools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create provisioned homes under `root`
    pub fn provisioning_homes_under(self, root: &Path) -> Self {
        self.behavior.lock().unwrap().home_root = Some(root.to_path_buf());
        self
    }

    /// Primary group id reported for every account
    pub fn with_group_id(self, group_id: u32) -> Self {
        self.behavior.lock().unwrap().group_id = group_id;
        self
    }

    pub fn failing_delete(self) -> Self {
        self.behavior.lock().unwrap().fail_delete = true;
        self
    }

    pub fn failing_provision(self) -> Self {
        self.behavior.lock().unwrap().fail_provision = true;
        self
    }

    pub fn failing_group_lookup(self) -> Self {
        self.behavior.lock().unwrap().fail_group_lookup = true;
        self
    }

    pub fn failing_chown(self) -> Self {
        self.behavior.lock().unwrap().fail_chown = true;
        self
    }

    /// Run `hook` with the account name after a successful provisioning
    pub fn on_provision(self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.behavior.lock().unwrap().on_provision = Some(Arc::new(hook));
        self
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<ToolCall> {
        self.behavior.lock().unwrap().calls.clone()
    }

    fn record(&self, call: ToolCall) {
        self.behavior.lock().unwrap().calls.push(call);
    }
}

fn failure(program: &str, account: &str) -> ToolError {
    ToolError::non_zero_exit(program, Some(1), &format!("mock failure for {account}"))
}

#[async_trait]
impl AccountTools for MockAccountTools {
    async fn delete_account_record(&self, account: &str) -> Result<(), ToolError> {
        self.record(ToolCall::DeleteRecord(account.to_string()));
        if self.behavior.lock().unwrap().fail_delete {
            return Err(failure("dscl", account));
        }
        Ok(())
    }

    async fn provision_mobile_account(&self, account: &str) -> Result<(), ToolError> {
        self.record(ToolCall::Provision(account.to_string()));
        let (fail, home_root, hook) = {
            let behavior = self.behavior.lock().unwrap();
            (
                behavior.fail_provision,
                behavior.home_root.clone(),
                behavior.on_provision.clone(),
            )
        };
        if fail {
            return Err(failure("createmobileaccount", account));
        }

        if let Some(root) = home_root {
            let home = root.join(account);
            std::fs::create_dir_all(&home).map_err(|source| ToolError::Spawn {
                program: "createmobileaccount".to_string(),
                source,
            })?;
            std::fs::write(home.join(PROVISIONED_MARKER), b"").map_err(|source| {
                ToolError::Spawn {
                    program: "createmobileaccount".to_string(),
                    source,
                }
            })?;
        }

        if let Some(hook) = hook {
            hook(account);
        }
        Ok(())
    }

    async fn primary_group_id(&self, account: &str) -> Result<u32, ToolError> {
        self.record(ToolCall::GroupLookup(account.to_string()));
        let behavior = self.behavior.lock().unwrap();
        if behavior.fail_group_lookup {
            return Err(failure("id", account));
        }
        Ok(behavior.group_id)
    }

    async fn change_owner_recursive(
        &self,
        owner: &str,
        group: u32,
        path: &Path,
    ) -> Result<(), ToolError> {
        self.record(ToolCall::ChangeOwner {
            owner: owner.to_string(),
            group,
            path: path.to_path_buf(),
        });
        if self.behavior.lock().unwrap().fail_chown {
            return Err(failure("chown", owner));
        }
        Ok(())
    }
}
