//! On-disk accounts root fixtures

use nomadize_core::migration::AccountIdentity;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for a temporary accounts root with populated homes
///
/// # Examples
///
/// ```rust
/// use nomadize_test_utils::TestHomeBuilder;
///
/// let root = TestHomeBuilder::new()
///     .with_file("alice", "Documents/notes.txt", b"hello")
///     .with_home("shared")
///     .build()
///     .unwrap();
///
/// assert!(root.home("alice").join("Documents/notes.txt").is_file());
/// ```
#[derive(Debug, Default)]
pub struct TestHomeBuilder {
    homes: BTreeMap<String, Vec<(PathBuf, Vec<u8>)>>,
    stray_files: Vec<String>,
}

impl TestHomeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty home directory
    pub fn with_home(mut self, account: &str) -> Self {
        self.homes.entry(account.to_string()).or_default();
        self
    }

    /// Add a file (and its home) at `relative` inside the account's home
    pub fn with_file(mut self, account: &str, relative: &str, content: &[u8]) -> Self {
        self.homes
            .entry(account.to_string())
            .or_default()
            .push((PathBuf::from(relative), content.to_vec()));
        self
    }

    /// Add a plain file directly under the root
    pub fn with_stray_file(mut self, name: &str) -> Self {
        self.stray_files.push(name.to_string());
        self
    }

    /// Create everything in a fresh temporary directory
    pub fn build(self) -> io::Result<TestAccountsRoot> {
        let dir = TempDir::new()?;
        for (account, files) in &self.homes {
            let home = dir.path().join(account);
            fs::create_dir_all(&home)?;
            for (relative, content) in files {
                let path = home.join(relative);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, content)?;
            }
        }
        for name in &self.stray_files {
            fs::write(dir.path().join(name), b"")?;
        }
        Ok(TestAccountsRoot { dir })
    }
}

/// A temporary accounts root, removed on drop
#[derive(Debug)]
pub struct TestAccountsRoot {
    dir: TempDir,
}

impl TestAccountsRoot {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `<root>/<account>`
    pub fn home(&self, account: &str) -> PathBuf {
        self.dir.path().join(account)
    }

    /// Identity for `account` under this root
    pub fn identity(&self, account: &str) -> AccountIdentity {
        AccountIdentity::under_root(self.path(), account).unwrap()
    }
}

/// Relative path to content of every file under `dir`
pub fn snapshot(dir: &Path) -> io::Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut files = BTreeMap::new();
    collect(dir, dir, &mut files)?;
    Ok(files)
}

fn collect(base: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect(base, &path, files)?;
        } else {
            let relative = path
                .strip_prefix(base)
                .map_err(io::Error::other)?
                .to_path_buf();
            files.insert(relative, fs::read(&path)?);
        }
    }
    Ok(())
}
