//! Error types for agent-runner

use thiserror::Error;

use git_stage::GitError;

/// Result type alias for executor operations
pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Errors that can occur while running a task
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Cloning or driving the clone into its starting state failed
    #[error("Setup failed: {message}")]
    Setup {
        message: String,
        #[source]
        source: Option<GitError>,
    },

    /// Task record or report problem from the core model
    #[error(transparent)]
    Core(#[from] gb_core::Error),

    /// Failed to spawn agent process
    #[error("Failed to spawn agent process: {message}")]
    SpawnFailed {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Agent process exited unsuccessfully
    #[error("Agent process exited with code {code:?}")]
    ProcessExited { code: Option<i32> },

    /// Agent ran but reported failure
    #[error("Agent failed: {message}")]
    Agent { message: String },

    /// Agent did not finish in time
    #[error("Agent timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Invalid agent type
    #[error("Invalid agent type: {agent_type}")]
    InvalidAgentType { agent_type: String },

    /// Agent-proposed command refused by the command policy
    #[error("Command rejected: {command}: {reason}")]
    CommandRejected { command: String, reason: String },

    /// Invalid configuration, detected before any task runs
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GitError> for ExecutorError {
    fn from(err: GitError) -> Self {
        Self::Setup {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ExecutorError {
    /// Create a Setup error
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
            source: None,
        }
    }

    /// Create a SpawnFailed error with source
    pub fn spawn_failed_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an Agent error
    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent {
            message: message.into(),
        }
    }

    /// Create a CommandRejected error
    pub fn rejected(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandRejected {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
