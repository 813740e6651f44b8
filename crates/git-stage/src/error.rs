//! Error types for git-stage operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for git operations
pub type Result<T> = std::result::Result<T, GitError>;

/// Errors that can occur while driving git
#[derive(Debug, Error)]
pub enum GitError {
    /// Git command execution failed
    #[error("Git command failed: {message}")]
    CommandFailed {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Git command did not finish in time
    #[error("git {command} timed out after {seconds} seconds")]
    Timeout { command: String, seconds: u64 },

    /// Not a git repository
    #[error("Not a git repository: {path}")]
    NotAGitRepository { path: PathBuf },

    /// Path cannot be passed to git
    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse git output
    #[error("Failed to parse git output: {message}")]
    ParseError { message: String },
}

impl GitError {
    /// Create a CommandFailed error
    pub fn git_failed(message: impl Into<String>) -> Self {
        Self::CommandFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a CommandFailed error with source
    pub fn git_failed_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a ParseError
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }
}
