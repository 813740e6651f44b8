//! Git command execution utilities

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{GitError, Result};

/// Output from a git command
#[derive(Debug)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// Execute a git command in the specified directory.
///
/// Arguments are passed as a vector, never through a shell. The child is
/// killed if it has not exited within `limit`.
pub async fn git_command(repo_path: &Path, args: &[&str], limit: Duration) -> Result<GitOutput> {
    debug!("Running git {:?} in {:?}", args, repo_path);

    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(limit, output)
        .await
        .map_err(|_| GitError::Timeout {
            command: args.first().copied().unwrap_or_default().to_string(),
            seconds: limit.as_secs(),
        })?
        .map_err(|e| GitError::git_failed_with_source("Failed to execute git command", e))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    trace!("git stdout: {}", stdout);
    if !stderr.is_empty() {
        trace!("git stderr: {}", stderr);
    }

    Ok(GitOutput {
        stdout,
        stderr,
        success: output.status.success(),
    })
}

/// Execute a git command and return error if it fails
pub async fn git_command_checked(
    repo_path: &Path,
    args: &[&str],
    limit: Duration,
) -> Result<String> {
    let output = git_command(repo_path, args, limit).await?;

    if !output.success {
        return Err(GitError::git_failed(format!(
            "git {} failed: {}",
            args.join(" "),
            output.stderr.trim()
        )));
    }

    Ok(output.stdout)
}

/// Check if a path is inside a git repository
pub async fn is_git_repository(path: &Path, limit: Duration) -> Result<bool> {
    let output = git_command(path, &["rev-parse", "--git-dir"], limit).await?;
    Ok(output.success)
}

/// Borrow a path as a UTF-8 git argument
pub(crate) fn path_arg(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| GitError::InvalidPath {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) const LIMIT: Duration = Duration::from_secs(30);

    pub(crate) async fn init_test_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        git_command_checked(dir.path(), &["init"], LIMIT).await.unwrap();
        git_command_checked(dir.path(), &["config", "user.email", "test@test.com"], LIMIT)
            .await
            .unwrap();
        git_command_checked(dir.path(), &["config", "user.name", "Test"], LIMIT)
            .await
            .unwrap();
        git_command_checked(dir.path(), &["checkout", "-b", "main"], LIMIT)
            .await
            .ok();

        let test_file = dir.path().join("test.txt");
        tokio::fs::write(&test_file, "test").await.unwrap();
        git_command_checked(dir.path(), &["add", "."], LIMIT)
            .await
            .unwrap();
        git_command_checked(dir.path(), &["commit", "-m", "Initial commit"], LIMIT)
            .await
            .unwrap();

        dir
    }

    #[tokio::test]
    async fn test_is_git_repository() {
        let dir = init_test_repo().await;
        assert!(is_git_repository(dir.path(), LIMIT).await.unwrap());

        let non_git = TempDir::new().unwrap();
        assert!(!is_git_repository(non_git.path(), LIMIT).await.unwrap());
    }

    #[tokio::test]
    async fn test_checked_command_reports_stderr() {
        let dir = init_test_repo().await;
        let err = git_command_checked(dir.path(), &["rev-parse", "--verify", "nope"], LIMIT)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("git rev-parse --verify nope failed"));
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let dir = init_test_repo().await;
        let result = git_command(dir.path(), &["log"], Duration::ZERO).await;
        assert!(matches!(result, Err(GitError::Timeout { .. })));
    }
}
