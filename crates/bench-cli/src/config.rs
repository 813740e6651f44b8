//! Run settings: defaults, an optional JSON file, and command-line overrides

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agent_runner::{AgentSpec, ExecutorConfig, StagerConfig};
use gb_core::task::TaskSelection;

pub const DEFAULT_OUTPUT: &str = "codex_results.json";
pub const DEFAULT_WORK_DIR: &str = "./codex_workdir";
pub const DEFAULT_AGENT: &str = "codex";
pub const DEFAULT_BENCHMARK: &str = "git_good_bench";

/// Every setting a run accepts. Unset fields fall through to the next layer.
///
/// Durations are whole seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    pub dataset: Option<PathBuf>,
    pub num_tasks: Option<usize>,
    pub task_ids: Vec<String>,
    pub output: Option<PathBuf>,
    pub work_dir: Option<PathBuf>,
    pub agent: Option<String>,
    pub agent_timeout: Option<u64>,
    pub git_timeout: Option<u64>,
    pub clone_timeout: Option<u64>,
    pub clone_depth: Option<u32>,
    pub remote_base: Option<String>,
    pub concurrency: Option<usize>,
    pub cleanup: Option<bool>,
    pub benchmark_name: Option<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub dataset: PathBuf,
    pub selection: TaskSelection,
    pub output: PathBuf,
    pub agent: AgentSpec,
    pub benchmark_name: String,
    pub stager: StagerConfig,
    pub executor: ExecutorConfig,
}

impl HarnessConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    pub fn merge(self, overrides: HarnessConfig) -> Self {
        Self {
            dataset: overrides.dataset.or(self.dataset),
            num_tasks: overrides.num_tasks.or(self.num_tasks),
            task_ids: if overrides.task_ids.is_empty() {
                self.task_ids
            } else {
                overrides.task_ids
            },
            output: overrides.output.or(self.output),
            work_dir: overrides.work_dir.or(self.work_dir),
            agent: overrides.agent.or(self.agent),
            agent_timeout: overrides.agent_timeout.or(self.agent_timeout),
            git_timeout: overrides.git_timeout.or(self.git_timeout),
            clone_timeout: overrides.clone_timeout.or(self.clone_timeout),
            clone_depth: overrides.clone_depth.or(self.clone_depth),
            remote_base: overrides.remote_base.or(self.remote_base),
            concurrency: overrides.concurrency.or(self.concurrency),
            cleanup: overrides.cleanup.or(self.cleanup),
            benchmark_name: overrides.benchmark_name.or(self.benchmark_name),
        }
    }

    /// Fill in defaults and reject settings no run could use
    pub fn resolve(self) -> Result<RunSettings> {
        let Some(dataset) = self.dataset else {
            bail!("no dataset given; pass --dataset or set \"dataset\" in the config file");
        };

        let agent_name = self.agent.unwrap_or_else(|| DEFAULT_AGENT.to_string());
        let agent: AgentSpec = agent_name
            .parse()
            .with_context(|| format!("unknown agent '{}'", agent_name))?;

        let mut stager = StagerConfig::default()
            .with_work_dir(self.work_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_WORK_DIR)));
        if let Some(base) = self.remote_base {
            stager = stager.with_remote_base(base);
        }
        if let Some(depth) = self.clone_depth {
            if depth == 0 {
                bail!("clone depth must be at least 1");
            }
            stager = stager.with_clone_depth(depth);
        }
        if let Some(secs) = self.git_timeout {
            stager = stager.with_plumbing_timeout(seconds("git timeout", secs)?);
        }
        if let Some(secs) = self.clone_timeout {
            stager = stager.with_network_timeout(seconds("clone timeout", secs)?);
        }

        let mut executor = ExecutorConfig::default();
        if let Some(secs) = self.agent_timeout {
            executor = executor.with_agent_timeout(seconds("agent timeout", secs)?);
        }
        if let Some(concurrency) = self.concurrency {
            if concurrency == 0 {
                bail!("concurrency must be at least 1");
            }
            executor = executor.with_concurrency(concurrency);
        }
        if let Some(cleanup) = self.cleanup {
            executor = executor.with_cleanup(cleanup);
        }

        Ok(RunSettings {
            dataset,
            selection: TaskSelection {
                num_tasks: self.num_tasks,
                task_ids: self.task_ids,
            },
            output: self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            agent,
            benchmark_name: self
                .benchmark_name
                .unwrap_or_else(|| DEFAULT_BENCHMARK.to_string()),
            stager,
            executor,
        })
    }
}

fn seconds(name: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        bail!("{} must be at least one second", name);
    }
    Ok(Duration::from_secs(secs))
}
