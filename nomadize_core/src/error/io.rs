//! I/O related error types

use std::path::PathBuf;
use thiserror::Error;

/// I/O error with additional context
#[derive(Error, Debug)]
#[error("{}", format_io_error(self))]
pub struct IoError {
    /// The kind of I/O error
    pub kind: IoErrorKind,
    /// Path associated with the error (if any)
    pub path: Option<PathBuf>,
    /// Underlying I/O error (if any)
    #[source]
    pub source: Option<std::io::Error>,
}

/// Kind of I/O error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoErrorKind {
    /// Path not found
    NotFound,
    /// Permission denied
    PermissionDenied,
    /// Path exists but is not a directory
    NotADirectory,
    /// Generic I/O error
    Other,
}

impl IoError {
    /// Create a not found error
    pub fn not_found(path: &std::path::Path) -> Self {
        Self {
            kind: IoErrorKind::NotFound,
            path: Some(path.to_path_buf()),
            source: None,
        }
    }

    /// Create a not a directory error
    pub fn not_a_directory(path: &std::path::Path) -> Self {
        Self {
            kind: IoErrorKind::NotADirectory,
            path: Some(path.to_path_buf()),
            source: None,
        }
    }

    /// Create an I/O error from a standard I/O error
    pub fn from_std(source: std::io::Error) -> Self {
        let kind = match source.kind() {
            std::io::ErrorKind::NotFound => IoErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            std::io::ErrorKind::NotADirectory => IoErrorKind::NotADirectory,
            _ => IoErrorKind::Other,
        };

        Self {
            kind,
            path: None,
            source: Some(source),
        }
    }

    /// Create an I/O error with a path
    pub fn with_path(mut self, path: &std::path::Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }
}

fn format_io_error(error: &IoError) -> String {
    match (&error.kind, &error.path) {
        (IoErrorKind::NotFound, Some(path)) => format!("Path not found: {}", path.display()),
        (IoErrorKind::NotFound, None) => "Path not found".to_string(),
        (IoErrorKind::PermissionDenied, Some(path)) => {
            format!("Permission denied for: {}", path.display())
        }
        (IoErrorKind::PermissionDenied, None) => "Permission denied".to_string(),
        (IoErrorKind::NotADirectory, Some(path)) => {
            format!("Not a directory: {}", path.display())
        }
        (IoErrorKind::NotADirectory, None) => "Not a directory".to_string(),
        (IoErrorKind::Other, Some(path)) => match &error.source {
            Some(source) => format!("I/O error on {}: {source}", path.display()),
            None => format!("I/O error on {}", path.display()),
        },
        (IoErrorKind::Other, None) => match &error.source {
            Some(source) => format!("I/O error: {source}"),
            None => "I/O error".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_not_found_message_includes_path() {
        let error = IoError::not_found(Path::new("/Users/ghost"));
        assert_eq!(error.kind, IoErrorKind::NotFound);
        assert_eq!(error.to_string(), "Path not found: /Users/ghost");
    }

    #[test]
    fn test_from_std_maps_permission_denied() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let error = IoError::from_std(source).with_path(Path::new("/Users"));

        assert_eq!(error.kind, IoErrorKind::PermissionDenied);
        assert!(error.to_string().contains("/Users"));
    }

    #[test]
    fn test_other_includes_source() {
        let source = std::io::Error::other("disk on fire");
        let error = IoError::from_std(source);
        assert!(error.to_string().contains("disk on fire"));
    }
}
