//! Account identities
//!
//! An identity pairs a short account name with its home directory. One is
//! resolved for the local source account and one for the network target.

use crate::error::ValidationError;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A short account name and its home directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountIdentity {
    account_name: String,
    home_path: PathBuf,
}

impl AccountIdentity {
    /// Create an identity after validating both parts
    ///
    /// The home path is normalized so that a trailing separator does not
    /// change the derived quarantine paths.
    pub fn new(
        account_name: impl Into<String>,
        home_path: impl AsRef<Path>,
    ) -> Result<Self, ValidationError> {
        let account_name = account_name.into();
        validate_account_name(&account_name)?;

        let home_path: PathBuf = home_path.as_ref().components().collect();
        if !home_path.is_absolute() {
            return Err(ValidationError::invalid_parameter(
                "home_path",
                &format!("'{}' is not absolute", home_path.display()),
            ));
        }
        if home_path.file_name().is_none() {
            return Err(ValidationError::invalid_parameter(
                "home_path",
                &format!("'{}' has no final component", home_path.display()),
            ));
        }

        Ok(Self {
            account_name,
            home_path,
        })
    }

    /// Identity whose home is `<root>/<name>`
    pub fn under_root(root: impl AsRef<Path>, account_name: &str) -> Result<Self, ValidationError> {
        validate_account_name(account_name)?;
        Self::new(account_name, root.as_ref().join(account_name))
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn home_path(&self) -> &Path {
        &self.home_path
    }
}

impl fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.account_name, self.home_path.display())
    }
}

/// Check that a short name is usable as a path component and record name
pub fn validate_account_name(name: &str) -> Result<(), ValidationError> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name == "." || name == ".." {
        "must not be a relative path component"
    } else if name.contains('/') {
        "must not contain '/'"
    } else if name.contains('\0') {
        "must not contain NUL"
    } else {
        return Ok(());
    };
    Err(ValidationError::invalid_parameter("account_name", reason))
}
