//! Agent invocation boundary
//!
//! The runner only knows [`AgentInvoker`]: hand over a working tree and a
//! prompt, get back whether the agent reported success. Failures of any kind
//! come back as `false` and are logged here.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use git_stage::{git_command, GitError};

use crate::command_policy::CommandPolicy;
use crate::error::{ExecutorError, Result};
use crate::process::{AgentConfig, AgentProcess, AgentType};

/// Anything that can attempt a task in a working tree
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Name recorded in the report
    fn name(&self) -> &str;

    /// Attempt the task; `true` only if the agent finished successfully in time
    async fn invoke(&self, repo_path: &Path, prompt: &str, timeout: Duration) -> bool;
}

/// Agent run as an external executable with the prompt as last argument
#[derive(Debug, Clone)]
pub struct CliAgent {
    name: String,
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CliAgent {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            env: Vec::new(),
        }
    }

    /// One of the known agent CLIs, with its credentials taken from the
    /// environment
    pub fn from_type(agent_type: AgentType) -> Result<Self> {
        let args = agent_type
            .default_args()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut agent = Self::new(agent_type.as_str(), agent_type.command(), args);
        agent.env = agent_type.environment()?;
        Ok(agent)
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[async_trait]
impl AgentInvoker for CliAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, repo_path: &Path, prompt: &str, timeout: Duration) -> bool {
        let config = AgentConfig {
            program: self.program.clone(),
            args: self.args.clone(),
            working_dir: repo_path.to_path_buf(),
            prompt: prompt.to_string(),
            env: self.env.clone(),
            timeout,
        };

        match AgentProcess::run(&config).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Agent {} failed: {}", self.name, e);
                false
            }
        }
    }
}

/// Supplier of git command text for a prompt, e.g. a completion model
#[async_trait]
pub trait CommandSource: Send + Sync {
    async fn propose(&self, prompt: &str) -> Result<Vec<String>>;
}

/// A fixed list of commands, independent of the prompt
#[derive(Debug, Clone)]
pub struct StaticCommands(pub Vec<String>);

impl StaticCommands {
    /// Read one command per line; blank lines and `#` comments are skipped
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ExecutorError::config(format!("cannot read script {}: {}", path.display(), e))
        })?;
        Ok(Self(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string)
                .collect(),
        ))
    }
}

#[async_trait]
impl CommandSource for StaticCommands {
    async fn propose(&self, _prompt: &str) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

/// Agent that turns proposed command text into git invocations.
///
/// Every line must pass the [`CommandPolicy`] before anything runs, and each
/// command is executed as an argument vector without a shell.
pub struct GitCommandAgent {
    name: String,
    source: Arc<dyn CommandSource>,
    policy: CommandPolicy,
}

impl GitCommandAgent {
    pub fn new(name: impl Into<String>, source: Arc<dyn CommandSource>) -> Self {
        Self {
            name: name.into(),
            source,
            policy: CommandPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CommandPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn execute(&self, repo_path: &Path, prompt: &str, deadline: Instant) -> Result<()> {
        let lines = self.source.propose(prompt).await?;
        if lines.is_empty() {
            return Err(ExecutorError::agent("no commands proposed"));
        }

        let commands = lines
            .iter()
            .map(|line| self.policy.validate(line))
            .collect::<Result<Vec<_>>>()?;

        for argv in &commands {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let args: Vec<&str> = argv.iter().map(String::as_str).collect();
            debug!("Agent {} runs git {:?}", self.name, args);

            let output = git_command(repo_path, &args, remaining)
                .await
                .map_err(|e| match e {
                    GitError::Timeout { .. } => ExecutorError::Timeout {
                        seconds: remaining.as_secs(),
                    },
                    other => ExecutorError::agent(other.to_string()),
                })?;

            if !output.success {
                return Err(ExecutorError::agent(format!(
                    "git {} failed: {}",
                    args.join(" "),
                    output.stderr.trim()
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl AgentInvoker for GitCommandAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, repo_path: &Path, prompt: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let run = self.execute(repo_path, prompt, deadline);

        match tokio::time::timeout(timeout, run).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Agent {} failed: {}", self.name, e);
                false
            }
            Err(_) => {
                warn!("Agent {} timed out after {}s", self.name, timeout.as_secs());
                false
            }
        }
    }
}

/// Agent selection as written on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSpec {
    /// A known agent CLI: `codex`, `claude-code`, `opencode`, `gemini-cli`
    Known(AgentType),
    /// `command:<program> [args...]`
    Command { program: String, args: Vec<String> },
    /// `script:<path>`, one git command per line
    Script(PathBuf),
}

impl FromStr for AgentSpec {
    type Err = ExecutorError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(command) = s.strip_prefix("command:") {
            let mut words = command.split_whitespace().map(str::to_string);
            let program = words
                .next()
                .ok_or_else(|| ExecutorError::config("command: needs a program"))?;
            return Ok(Self::Command {
                program,
                args: words.collect(),
            });
        }
        if let Some(path) = s.strip_prefix("script:") {
            if path.is_empty() {
                return Err(ExecutorError::config("script: needs a path"));
            }
            return Ok(Self::Script(PathBuf::from(path)));
        }
        s.parse().map(Self::Known)
    }
}

impl AgentSpec {
    /// Build the invoker, failing early on missing credentials or files
    pub async fn build(&self) -> Result<Arc<dyn AgentInvoker>> {
        let invoker: Arc<dyn AgentInvoker> = match self {
            Self::Known(agent_type) => Arc::new(CliAgent::from_type(*agent_type)?),
            Self::Command { program, args } => {
                Arc::new(CliAgent::new(program.clone(), program.clone(), args.clone()))
            }
            Self::Script(path) => {
                let commands = StaticCommands::from_file(path).await?;
                info!("Loaded {} scripted commands from {}", commands.0.len(), path.display());
                Arc::new(GitCommandAgent::new("script", Arc::new(commands)))
            }
        };
        Ok(invoker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LIMIT: Duration = Duration::from_secs(30);

    async fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        for args in [
            vec!["init"],
            vec!["config", "user.email", "test@test.com"],
            vec!["config", "user.name", "Test"],
        ] {
            git_stage::git_command_checked(dir.path(), &args, LIMIT)
                .await
                .unwrap();
        }
        tokio::fs::write(dir.path().join("a.txt"), "a").await.unwrap();
        dir
    }

    fn script(lines: &[&str]) -> GitCommandAgent {
        let commands = StaticCommands(lines.iter().map(|l| l.to_string()).collect());
        GitCommandAgent::new("script", Arc::new(commands))
    }

    #[test]
    fn test_agent_spec_parsing() {
        assert_eq!(
            "codex".parse::<AgentSpec>().unwrap(),
            AgentSpec::Known(AgentType::Codex)
        );
        assert_eq!(
            "command:my-agent --fast".parse::<AgentSpec>().unwrap(),
            AgentSpec::Command {
                program: "my-agent".to_string(),
                args: vec!["--fast".to_string()],
            }
        );
        assert_eq!(
            "script:fix.txt".parse::<AgentSpec>().unwrap(),
            AgentSpec::Script(PathBuf::from("fix.txt"))
        );
        assert!("command:".parse::<AgentSpec>().is_err());
        assert!("nonsense".parse::<AgentSpec>().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cli_agent_reports_exit_status() {
        let dir = TempDir::new().unwrap();
        let ok = CliAgent::new("true", "true", Vec::new());
        let failing = CliAgent::new("false", "false", Vec::new());
        let missing = CliAgent::new("missing", "gb-no-such-agent-binary", Vec::new());

        assert!(ok.invoke(dir.path(), "prompt", LIMIT).await);
        assert!(!failing.invoke(dir.path(), "prompt", LIMIT).await);
        assert!(!missing.invoke(dir.path(), "prompt", LIMIT).await);
    }

    #[tokio::test]
    async fn test_script_agent_runs_allowed_commands() {
        let dir = init_repo().await;
        let agent = script(&["git add a.txt", "git commit -m 'scripted commit'"]);

        assert!(agent.invoke(dir.path(), "ignored", LIMIT).await);
        let log = git_stage::git_command_checked(dir.path(), &["log", "--format=%s"], LIMIT)
            .await
            .unwrap();
        assert_eq!(log.trim(), "scripted commit");
    }

    #[tokio::test]
    async fn test_script_agent_refuses_before_running_anything() {
        let dir = init_repo().await;
        let agent = script(&["git add a.txt", "git push origin main"]);

        assert!(!agent.invoke(dir.path(), "ignored", LIMIT).await);
        let staged = git_stage::git_command_checked(dir.path(), &["diff", "--cached", "--name-only"], LIMIT)
            .await
            .unwrap();
        assert!(staged.trim().is_empty());
    }

    #[tokio::test]
    async fn test_script_agent_refuses_abbreviated_exec() {
        let dir = init_repo().await;
        let marker = dir.path().join("MARKER");
        let exec = format!("git rebase --exe='touch {}' HEAD~1", marker.display());
        let attached = format!("git rebase -x'touch {}' HEAD~1", marker.display());

        for line in [exec, attached] {
            let agent = script(&["git add a.txt", "git commit -m one", &line]);
            assert!(!agent.invoke(dir.path(), "ignored", LIMIT).await);
        }
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_script_agent_stops_on_failing_command() {
        let dir = init_repo().await;
        let agent = script(&["git checkout does-not-exist"]);
        assert!(!agent.invoke(dir.path(), "ignored", LIMIT).await);
    }

    #[tokio::test]
    async fn test_script_from_file_skips_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fix.txt");
        tokio::fs::write(&path, "# resolve\n\ngit add -A\n  git status  \n")
            .await
            .unwrap();

        let commands = StaticCommands::from_file(&path).await.unwrap();
        assert_eq!(commands.0, vec!["git add -A", "git status"]);
    }
}
