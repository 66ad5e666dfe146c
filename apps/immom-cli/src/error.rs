//! CLI error types and exit codes

use thiserror::Error;

use immom::error::ImmError;
use immom_memory::SnapshotError;

/// Exit codes for the CLI
/// - 0: Success
/// - 1: General error
/// - 3: Service error (status returned by the IMM service)
/// - 4: Validation error
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Imm(#[from] ImmError),

    #[error("{0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Imm(e) if e.ais_kind().is_some() => 3,
            CliError::Imm(e) if e.is_local_validation() => 4,
            CliError::Imm(_) => 1,
            CliError::Snapshot(SnapshotError::Rejected(e)) if e.ais_kind().is_some() => 4,
            CliError::Snapshot(e) if e.is_content_error() => 4,
            CliError::Snapshot(_) => 1,
            CliError::Validation(_) => 4,
            CliError::Config(_) => 1,
            CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Config(_) => {
                Some("Pass --snapshot <file> or set IMMOM_SNAPSHOT to a .json/.yaml model.")
            }
            CliError::Imm(e) if e.is_transient() => Some("The service was busy; try again."),
            CliError::Snapshot(SnapshotError::UnsupportedFormat { .. }) => {
                Some("Use a file ending in .json, .yaml or .yml.")
            }
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Validation(format!("JSON error: {err}"))
    }
}
