//! Local account enumeration
//!
//! Candidate source accounts are the home directories directly under the
//! accounts root. Selection is by 1-based position in the sorted list.

use crate::error::{IoError, Result, ValidationError};
use crate::migration::layout::is_migration_artifact;
use log::trace;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory holding local home directories
pub const DEFAULT_ACCOUNTS_ROOT: &str = "/Users";

/// A home directory that could be migrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalAccountCandidate {
    pub name: String,
    pub home_path: PathBuf,
}

/// List candidate accounts under `root`, sorted by name
///
/// Hidden entries, plain files and leftovers of earlier migrations are skipped.
pub fn list_local_accounts(root: &Path) -> Result<Vec<LocalAccountCandidate>> {
    if !root.exists() {
        return Err(IoError::not_found(root).into());
    }
    if !root.is_dir() {
        return Err(IoError::not_a_directory(root).into());
    }

    let entries = fs::read_dir(root).map_err(|e| IoError::from_std(e).with_path(root))?;
    let mut candidates = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| IoError::from_std(e).with_path(root))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            trace!("Skipping non-UTF-8 entry {:?}", entry.file_name());
            continue;
        };
        if name.starts_with('.') || is_migration_artifact(&name) {
            trace!("Skipping {name}");
            continue;
        }
        let is_dir = entry
            .file_type()
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        candidates.push(LocalAccountCandidate {
            home_path: entry.path(),
            name,
        });
    }

    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(candidates)
}

/// Parse a 1-based menu selection against `count` entries
///
/// Returns the 0-based index.
pub fn parse_selection(input: &str, count: usize) -> std::result::Result<usize, ValidationError> {
    let trimmed = input.trim();
    match trimmed.parse::<usize>() {
        Ok(choice) if (1..=count).contains(&choice) => Ok(choice - 1),
        _ => Err(ValidationError::invalid_selection(trimmed, count)),
    }
}
