//! Error types for the Nomadize Core Library
//!
//! This module contains all error types used throughout the library, organized
//! into logical categories for better maintainability and clarity.

use thiserror::Error;

pub mod directory;
pub mod io;
pub mod migration;
pub mod validation;

pub use self::directory::{DecodeError, DirStatus, QueryError, QueryStage, StageFailure};
pub use self::io::{IoError, IoErrorKind};
pub use self::migration::{MigrationError, ToolError};
pub use self::validation::ValidationError;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Nomadize Core Library
///
/// Errors are categorized into five main types:
/// - I/O errors: filesystem operations outside the migration state machine
/// - Directory errors: a directory-service query stage failed
/// - Decode errors: a daemon record could not be decoded
/// - Migration errors: a migration step failed
/// - Validation errors: input validation and configuration errors
#[derive(Error, Debug)]
pub enum Error {
    /// I/O related errors
    #[error(transparent)]
    Io(#[from] IoError),

    /// Directory-service query errors
    #[error(transparent)]
    Directory(#[from] QueryError),

    /// Record decoding errors
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Migration step errors
    #[error(transparent)]
    Migration(#[from] MigrationError),

    /// Validation related errors
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Whether the error means "could not determine" rather than a definite answer
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io(IoError::from_std(source))
    }
}
