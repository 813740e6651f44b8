//! gitbench - measures how well a coding agent reproduces recorded git history
//!
//! Each task stages a repository at a historical commit, lets the agent work,
//! and checks the result by content hash. Results go to a JSON report.

mod config;
mod run;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::HarnessConfig;

/// Git history benchmark runner
#[derive(Parser, Debug)]
#[command(name = "gitbench")]
#[command(version, about)]
struct Cli {
    /// JSON file with run settings; flags take precedence over it
    #[arg(long, env = "GITBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Task dataset, a JSON array or JSON Lines file
    #[arg(long, env = "GITBENCH_DATASET")]
    dataset: Option<PathBuf>,

    /// Attempt only the first N tasks
    #[arg(long)]
    num_tasks: Option<usize>,

    /// Attempt only these task ids (comma separated)
    #[arg(long, value_delimiter = ',')]
    task_ids: Vec<String>,

    /// Report file [default: codex_results.json]
    #[arg(long)]
    output: Option<PathBuf>,

    /// Root directory for staged repositories [default: ./codex_workdir]
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// codex, claude-code, opencode, gemini-cli, command:<program> or script:<file>
    #[arg(long, env = "GITBENCH_AGENT")]
    agent: Option<String>,

    /// Seconds an agent may run per task [default: 600]
    #[arg(long)]
    agent_timeout: Option<u64>,

    /// Seconds for local git commands [default: 60]
    #[arg(long)]
    git_timeout: Option<u64>,

    /// Seconds for clone and fetch [default: 300]
    #[arg(long)]
    clone_timeout: Option<u64>,

    /// History depth of the initial clone [default: 100]
    #[arg(long)]
    clone_depth: Option<u32>,

    /// Base URL repositories are cloned from [default: https://github.com]
    #[arg(long, env = "GITBENCH_REMOTE_BASE")]
    remote_base: Option<String>,

    /// Tasks run at once [default: 1]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Delete each task's directory after it is recorded
    #[arg(long)]
    cleanup: bool,

    /// Benchmark name written to the report [default: git_good_bench]
    #[arg(long)]
    benchmark_name: Option<String>,
}

impl Cli {
    /// Settings given on the command line, unset ones left empty
    fn overrides(&self) -> HarnessConfig {
        HarnessConfig {
            dataset: self.dataset.clone(),
            num_tasks: self.num_tasks,
            task_ids: self.task_ids.clone(),
            output: self.output.clone(),
            work_dir: self.work_dir.clone(),
            agent: self.agent.clone(),
            agent_timeout: self.agent_timeout,
            git_timeout: self.git_timeout,
            clone_timeout: self.clone_timeout,
            clone_depth: self.clone_depth,
            remote_base: self.remote_base.clone(),
            concurrency: self.concurrency,
            cleanup: self.cleanup.then_some(true),
            benchmark_name: self.benchmark_name.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitbench=info,agent_runner=info,git_stage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => HarnessConfig::load(path).await?,
        None => HarnessConfig::default(),
    };
    let settings = file.merge(cli.overrides()).resolve()?;

    tracing::info!(
        "Benchmark {} with agent {:?}, dataset {}",
        settings.benchmark_name,
        settings.agent,
        settings.dataset.display()
    );

    let report = run::run(settings).await?;
    println!("Results: {}", report.summary_line());
    Ok(())
}
