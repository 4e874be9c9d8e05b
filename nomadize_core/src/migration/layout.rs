//! On-disk names used during a migration
//!
//! These suffixes are visible to administrators recovering a partial run and
//! must stay stable.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of the quarantined local home
pub const QUARANTINE_SUFFIX: &str = "Nomadize";

/// Suffix of the provisioned home moved out of the way
pub const EMPTIED_TARGET_SUFFIX: &str = "Nomadize_empty";

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// `<home>.Nomadize`
pub fn quarantine_path(home: &Path) -> PathBuf {
    with_suffix(home, QUARANTINE_SUFFIX)
}

/// `<home>.Nomadize_empty`
pub fn emptied_target_path(home: &Path) -> PathBuf {
    with_suffix(home, EMPTIED_TARGET_SUFFIX)
}

/// Whether a directory entry was left behind by an earlier run
pub fn is_migration_artifact(file_name: &str) -> bool {
    file_name.contains(&format!(".{QUARANTINE_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixes_append_to_final_component() {
        let home = Path::new("/Users/alice");
        assert_eq!(quarantine_path(home), Path::new("/Users/alice.Nomadize"));
        assert_eq!(
            emptied_target_path(home),
            Path::new("/Users/alice.Nomadize_empty")
        );
    }

    #[test]
    fn test_dotted_names_keep_their_dots() {
        let home = Path::new("/Users/first.last");
        assert_eq!(quarantine_path(home), Path::new("/Users/first.last.Nomadize"));
    }

    #[test]
    fn test_artifact_detection() {
        assert!(is_migration_artifact("alice.Nomadize"));
        assert!(is_migration_artifact("bob.Nomadize_empty"));
        assert!(!is_migration_artifact("alice"));
        assert!(!is_migration_artifact("Nomadize"));
    }
}
