use colored::*;
use nomadize_core::error::{IoErrorKind, MigrationError, QueryError, ValidationError};
use std::error::Error as StdError;
use std::fmt;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Directory,
    Filesystem,
    PartialMigration,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    /// The directory service could not answer
    DirectoryError = 3,
    /// Nothing was migrated because of a filesystem problem
    FilesystemError = 4,
    /// The migration ran but at least one step failed
    PartialMigration = 5,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // All codes fit in a u8
        std::process::ExitCode::from(code as u8)
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
    fn with_source(self, source: Box<dyn StdError + Send + Sync>) -> Self;
}

impl CliError {
    fn with_category(message: &str, category: ErrorCategory) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::with_category(message, ErrorCategory::General)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        let mut error = Self::with_category(message, ErrorCategory::Misuse);
        error
            .suggestions
            .push("Run 'nomadize --help' for usage information".to_string());

        if message.contains("Unknown command")
            && let Some(cmd) = message.split(':').nth(1).map(|s| s.trim())
        {
            let commands = ["migrate", "lookup", "accounts", "config", "completions"];
            for known_cmd in commands {
                if levenshtein_distance(cmd, known_cmd) <= 2 {
                    error
                        .suggestions
                        .insert(0, format!("Did you mean '{known_cmd}'?"));
                    break;
                }
            }
        }

        error
    }

    /// Create a directory-service error
    pub fn directory(message: &str) -> Self {
        let mut error = Self::with_category(message, ErrorCategory::Directory);
        error.suggestions = vec![
            "Check that the Mac is bound to the directory server".to_string(),
            "Nothing was changed; it is safe to try again".to_string(),
        ];
        error
    }

    /// Create a filesystem error
    pub fn filesystem(message: &str) -> Self {
        let mut error = Self::with_category(message, ErrorCategory::Filesystem);

        if message.contains("not found") || message.contains("not accessible") {
            error
                .suggestions
                .push("Check if the file or directory exists".to_string());
            error
                .suggestions
                .push("Verify you have the correct path".to_string());
        } else if message.contains("permission") || message.contains("denied") {
            error.suggestions.push("Check file permissions".to_string());
            error
                .suggestions
                .push("Migration must run as root".to_string());
        } else if message.contains("earlier run") {
            error
                .suggestions
                .push("Inspect and remove the leftover directory before retrying".to_string());
        }

        error
    }

    /// Create a partial migration error
    pub fn partial_migration(message: &str) -> Self {
        let mut error = Self::with_category(message, ErrorCategory::PartialMigration);
        error.suggestions.push(
            "The account is half-migrated; review the failed steps and finish them by hand"
                .to_string(),
        );
        error
    }

    /// Directory lookups need the macOS DirectoryService framework
    pub fn unsupported_platform() -> Self {
        Self::with_category(
            "Directory lookups are not supported on this platform",
            ErrorCategory::Directory,
        )
        .with_suggestion("Run nomadize on macOS")
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Directory => ExitCode::DirectoryError,
            ErrorCategory::Filesystem => ExitCode::FilesystemError,
            ErrorCategory::PartialMigration => ExitCode::PartialMigration,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Directory => "Directory Error",
            ErrorCategory::Filesystem => "File Error",
            ErrorCategory::PartialMigration => "Partial Migration",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse | ErrorCategory::PartialMigration => self.label().yellow(),
            _ => self.label().red(),
        };

        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        // Error chain in debug mode
        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

impl From<nomadize_core::Error> for CliError {
    fn from(error: nomadize_core::Error) -> Self {
        use nomadize_core::Error;

        match error {
            Error::Directory(err) => err.into(),
            Error::Validation(err) => err.into(),
            Error::Migration(err) => err.into(),
            Error::Io(err) => {
                let message = err.to_string();
                let path = err.path.as_ref().map(|p| p.display().to_string());
                let mut cli_error = match err.kind {
                    IoErrorKind::NotFound
                    | IoErrorKind::PermissionDenied
                    | IoErrorKind::NotADirectory => Self::filesystem(&message),
                    IoErrorKind::Other => Self::general(&message),
                };
                if let Some(path) = path {
                    cli_error = cli_error.with_context("path", &path);
                }
                cli_error.with_source(Box::new(err))
            }
            Error::Decode(err) => Self::directory(&err.to_string()).with_source(Box::new(err)),
        }
    }
}

impl From<QueryError> for CliError {
    fn from(error: QueryError) -> Self {
        let mut cli_error = Self::directory(&format!(
            "Could not determine whether the account exists: {error}"
        ))
        .with_context("stage", &error.stage.to_string())
        .with_context("code", &error.code().to_string());
        if let Some(status) = error.daemon_status() {
            cli_error = cli_error.with_context("daemon status", &status.to_string());
        }
        cli_error.with_source(Box::new(error))
    }
}

impl From<ValidationError> for CliError {
    fn from(error: ValidationError) -> Self {
        Self::misuse(&error.to_string()).with_source(Box::new(error))
    }
}

impl From<MigrationError> for CliError {
    fn from(error: MigrationError) -> Self {
        match &error {
            MigrationError::Preflight { reason } => {
                if reason.starts_with("local and target") {
                    Self::misuse(reason)
                } else {
                    Self::filesystem(reason)
                }
            }
            _ => Self::partial_migration(&error.to_string()),
        }
        .with_source(Box::new(error))
    }
}

/// Convert anyhow errors to CLI errors
///
/// Known error types anywhere in the chain keep their category.
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<CliError>() {
            Ok(cli_error) => return cli_error,
            Err(error) => error,
        };
        let error = match error.downcast::<nomadize_core::Error>() {
            Ok(core_error) => return core_error.into(),
            Err(error) => error,
        };
        let error = match error.downcast::<QueryError>() {
            Ok(query_error) => return query_error.into(),
            Err(error) => error,
        };
        let error = match error.downcast::<MigrationError>() {
            Ok(migration_error) => return migration_error.into(),
            Err(error) => error,
        };
        let error = match error.downcast::<ValidationError>() {
            Ok(validation_error) => return validation_error.into(),
            Err(error) => error,
        };

        if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
            let message = format!("{error:#}");
            return match io_error.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    Self::filesystem(&message)
                }
                _ => Self::general(&message),
            };
        }

        Self::general(&format!("{error:#}"))
    }
}

/// Simple Levenshtein distance for command suggestions
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();
    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(len1 + 1) {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate().take(len2 + 1) {
        *cell = j;
    }

    for (i, c1) in s1_chars.iter().enumerate() {
        let i1 = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let j1 = j + 1;
            let cost = if c1 == c2 { 0 } else { 1 };
            matrix[i1][j1] = std::cmp::min(
                std::cmp::min(matrix[i][j1] + 1, matrix[i1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }

    matrix[len1][len2]
}
