//! Repository staging: clone and drive a repository into a task's start state

use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use gb_core::task::{FileCommitChainScenario, MergeScenario, Scenario, Task};
use git_stage::{GitError, GitRepo, GitTimeouts, MergeOutcome, StagedRepository, StagingArea};

use crate::error::{ExecutorError, Result};

/// Configuration for the stager
#[derive(Debug, Clone)]
pub struct StagerConfig {
    /// Root under which each task gets its own directory
    pub work_dir: PathBuf,
    /// Clone URLs are `<remote_base>/<owner>/<name>.git`
    pub remote_base: String,
    /// History kept by the initial clone
    pub clone_depth: u32,
    /// Committer identity configured on every clone
    pub identity_name: String,
    pub identity_email: String,
    pub timeouts: GitTimeouts,
}

impl Default for StagerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./gitbench_workdir"),
            remote_base: "https://github.com".to_string(),
            clone_depth: 100,
            identity_name: "gitbench".to_string(),
            identity_email: "gitbench@localhost".to_string(),
            timeouts: GitTimeouts::default(),
        }
    }
}

impl StagerConfig {
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = base.into();
        self
    }

    pub fn with_clone_depth(mut self, depth: u32) -> Self {
        self.clone_depth = depth;
        self
    }

    pub fn with_plumbing_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.plumbing = timeout;
        self
    }

    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.network = timeout;
        self
    }
}

/// Puts a fresh clone into the state an agent starts from
#[derive(Debug, Clone)]
pub struct RepositoryStager {
    config: StagerConfig,
    area: StagingArea,
}

impl RepositoryStager {
    pub fn new(config: StagerConfig) -> Self {
        let area = StagingArea::new(&config.work_dir);
        Self { config, area }
    }

    pub fn config(&self) -> &StagerConfig {
        &self.config
    }

    /// Clone URL for an `owner/name` identifier
    pub fn clone_url(&self, repository: &str) -> String {
        format!(
            "{}/{}.git",
            self.config.remote_base.trim_end_matches('/'),
            repository.trim_end_matches(".git")
        )
    }

    /// Stage `task` into its own, freshly wiped directory
    pub async fn stage(&self, task: &Task) -> Result<StagedRepository> {
        let repo_dir = self.area.prepare(&task.id).await?;
        let url = self.clone_url(&task.repository);

        let repo = GitRepo::clone_shallow(
            &url,
            &repo_dir,
            self.config.clone_depth,
            self.config.timeouts,
        )
        .await
        .map_err(step_failed(format!("clone {}", url)))?;

        repo.configure_identity(&self.config.identity_name, &self.config.identity_email)
            .await
            .map_err(step_failed("configure identity"))?;

        match &task.scenario {
            Scenario::Merge(merge) => self.stage_merge(&repo, merge).await?,
            Scenario::FileCommitChain(chain) => self.stage_file_chain(&repo, chain).await?,
        }

        info!("Staged {} at {:?}", task.id, repo.path());
        Ok(StagedRepository::new(
            task.id.clone(),
            self.area.task_dir(&task.id),
            repo,
        ))
    }

    /// Remove whatever a failed staging left behind for `task_id`
    pub async fn discard(&self, task_id: &str) {
        let dir = self.area.task_dir(task_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Removed {:?}", dir),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {:?}: {}", dir, e),
        }
    }

    async fn stage_merge(&self, repo: &GitRepo, merge: &MergeScenario) -> Result<()> {
        let [ours, theirs] = &merge.parents;

        fetch_and_checkout(repo, ours).await?;
        repo.fetch(theirs)
            .await
            .map_err(step_failed(format!("fetch {}", theirs)))?;

        match repo
            .merge_no_commit(theirs)
            .await
            .map_err(step_failed(format!("merge {}", theirs)))?
        {
            MergeOutcome::Conflicted(paths) => {
                debug!("Merge left conflicts in {:?}", paths);
                if !merge.conflicted_paths.is_empty() && paths != merge.conflicted_paths {
                    warn!(
                        "Conflicted paths {:?} differ from the dataset's {:?}",
                        paths, merge.conflicted_paths
                    );
                }
            }
            MergeOutcome::Clean => {
                warn!("Merging {} into {} produced no conflicts", theirs, ours);
            }
        }

        Ok(())
    }

    async fn stage_file_chain(&self, repo: &GitRepo, chain: &FileCommitChainScenario) -> Result<()> {
        fetch_and_checkout(repo, &chain.oldest_commit).await
    }
}

async fn fetch_and_checkout(repo: &GitRepo, reference: &str) -> Result<()> {
    repo.fetch(reference)
        .await
        .map_err(step_failed(format!("fetch {}", reference)))?;
    repo.checkout(reference)
        .await
        .map_err(step_failed(format!("checkout {}", reference)))?;
    Ok(())
}

/// Attach the failing step to the git diagnostic
fn step_failed(step: impl Into<String>) -> impl FnOnce(GitError) -> ExecutorError {
    let step = step.into();
    move |err| ExecutorError::Setup {
        message: format!("{}: {}", step, err),
        source: Some(err),
    }
}
