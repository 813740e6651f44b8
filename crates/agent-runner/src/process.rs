//! Agent process management

use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use serde::{Deserialize, Serialize};

use crate::error::{ExecutorError, Result};

/// Supported agent CLIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    OpenCode,
    ClaudeCode,
    GeminiCli,
    Codex,
}

impl FromStr for AgentType {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "opencode" => Ok(Self::OpenCode),
            "claude-code" | "claudecode" => Ok(Self::ClaudeCode),
            "gemini-cli" | "geminicli" | "gemini" => Ok(Self::GeminiCli),
            "codex" => Ok(Self::Codex),
            _ => Err(ExecutorError::InvalidAgentType {
                agent_type: s.to_string(),
            }),
        }
    }
}

impl AgentType {
    /// Get the canonical string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenCode => "opencode",
            Self::ClaudeCode => "claude-code",
            Self::GeminiCli => "gemini-cli",
            Self::Codex => "codex",
        }
    }

    /// Get the command to run this agent
    pub fn command(&self) -> &'static str {
        match self {
            Self::OpenCode => {
                if cfg!(target_os = "windows") {
                    "opencode.cmd"
                } else {
                    "opencode"
                }
            }
            Self::ClaudeCode => {
                if cfg!(target_os = "windows") {
                    "claude.cmd"
                } else {
                    "claude"
                }
            }
            Self::GeminiCli => "gemini",
            Self::Codex => "codex",
        }
    }

    /// Non-interactive arguments placed before the prompt
    pub fn default_args(&self) -> Vec<&'static str> {
        match self {
            Self::OpenCode => vec!["run"],
            Self::ClaudeCode => vec!["--dangerously-skip-permissions", "-p"],
            Self::GeminiCli => vec!["--yolo", "-p"],
            Self::Codex => vec!["exec", "--full-auto", "--sandbox", "workspace-write"],
        }
    }

    /// Extra environment the agent needs, read from the current process.
    ///
    /// Fails when a required credential is missing so the run can stop before
    /// any task starts.
    pub fn environment(&self) -> Result<Vec<(String, String)>> {
        match self {
            Self::Codex => {
                let key = std::env::var("OPENAI_API_KEY")
                    .or_else(|_| std::env::var("CODEX_API_KEY"))
                    .map_err(|_| ExecutorError::config("OPENAI_API_KEY or CODEX_API_KEY not set"))?;
                Ok(vec![("CODEX_API_KEY".to_string(), key)])
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Configuration for one agent process
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Executable to run
    pub program: String,
    /// Arguments placed before the prompt
    pub args: Vec<String>,
    /// Working directory for the agent
    pub working_dir: PathBuf,
    /// The prompt, passed as the last argument
    pub prompt: String,
    /// Additional environment variables
    pub env: Vec<(String, String)>,
    /// Wall-clock limit; the process is killed when it expires
    pub timeout: Duration,
}

/// Runs an agent executable to completion
pub struct AgentProcess;

impl AgentProcess {
    /// Run the agent and wait for it.
    ///
    /// Returns the exit code on success. A missing executable, a non-zero
    /// exit or an expired timeout are errors.
    pub async fn run(config: &AgentConfig) -> Result<i32> {
        info!(
            "Spawning {} in {:?} with prompt: {}",
            config.program,
            config.working_dir,
            config.prompt.chars().take(100).collect::<String>()
        );

        let mut cmd = if cfg!(target_os = "windows") && config.program.ends_with(".cmd") {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&config.program);
            c
        } else {
            Command::new(&config.program)
        };

        cmd.args(&config.args)
            .arg(&config.prompt)
            .current_dir(&config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| {
            let message = if e.kind() == std::io::ErrorKind::NotFound {
                format!("{} not found", config.program)
            } else {
                format!("Failed to spawn {}: {}", config.program, e)
            };
            ExecutorError::spawn_failed_with_source(message, e)
        })?;

        // Dropping the child on timeout kills it
        let output = tokio::time::timeout(config.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecutorError::Timeout {
                seconds: config.timeout.as_secs(),
            })??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines() {
            debug!("stdout: {}", line);
        }
        for line in stderr.lines() {
            debug!("stderr: {}", line);
        }

        if !output.status.success() {
            return Err(ExecutorError::ProcessExited {
                code: output.status.code(),
            });
        }

        Ok(output.status.code().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &TempDir, program: &str, args: &[&str], timeout: Duration) -> AgentConfig {
        AgentConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            working_dir: dir.path().to_path_buf(),
            prompt: "do the task".to_string(),
            env: vec![("GB_TEST_VAR".to_string(), "value".to_string())],
            timeout,
        }
    }

    #[test]
    fn test_agent_type_from_str() {
        assert_eq!("opencode".parse::<AgentType>().unwrap(), AgentType::OpenCode);
        assert_eq!("claude-code".parse::<AgentType>().unwrap(), AgentType::ClaudeCode);
        assert_eq!("gemini-cli".parse::<AgentType>().unwrap(), AgentType::GeminiCli);
        assert_eq!("codex".parse::<AgentType>().unwrap(), AgentType::Codex);
        assert!("unknown".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_codex_args_match_cli_contract() {
        assert_eq!(
            AgentType::Codex.default_args(),
            vec!["exec", "--full-auto", "--sandbox", "workspace-write"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_passes_prompt_env_and_cwd() {
        let dir = TempDir::new().unwrap();
        let cfg = config(
            &dir,
            "sh",
            &["-c", "printf '%s|%s' \"$1\" \"$GB_TEST_VAR\" > out.txt", "agent"],
            Duration::from_secs(10),
        );

        assert_eq!(AgentProcess::run(&cfg).await.unwrap(), 0);
        let written = tokio::fs::read_to_string(dir.path().join("out.txt")).await.unwrap();
        assert_eq!(written, "do the task|value");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_nonzero_exit() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "sh", &["-c", "exit 3", "agent"], Duration::from_secs(10));
        let result = AgentProcess::run(&cfg).await;
        assert!(matches!(result, Err(ExecutorError::ProcessExited { code: Some(3) })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "sh", &["-c", "sleep 5", "agent"], Duration::from_millis(200));
        let result = AgentProcess::run(&cfg).await;
        assert!(matches!(result, Err(ExecutorError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_run_missing_executable() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir, "gb-no-such-agent-binary", &[], Duration::from_secs(10));
        let result = AgentProcess::run(&cfg).await;
        assert!(matches!(result, Err(ExecutorError::SpawnFailed { .. })));
    }
}
