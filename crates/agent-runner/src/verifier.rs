//! Content-hash verification of an agent's work
//!
//! Success never depends on commit ids or messages. A merge task passes when
//! the whole working tree hashes to the target commit's tree; a file task
//! passes when the one target file hashes to the target commit's blob.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use gb_core::task::{FileCommitChainScenario, MergeScenario, Scenario, Task};
use git_stage::{GitError, GitRepo, StagedRepository};

/// Decides whether a staged repository reached the task's target state
#[async_trait]
pub trait Verifier: Send + Sync {
    /// `true` only when the content matches; every failure reads as `false`
    async fn evaluate(&self, task: &Task, staged: &StagedRepository) -> bool;
}

#[derive(Debug, Error)]
enum VerificationError {
    #[error("cannot resolve {reference}: {source}")]
    UnresolvableRef {
        reference: String,
        #[source]
        source: GitError,
    },

    #[error("{path} does not exist at {commit}")]
    MissingTargetPath { path: String, commit: String },

    #[error("{path} is missing from the working tree")]
    MissingLocalFile { path: String },

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Compares git object ids of the working tree against the target commit
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHashVerifier;

impl ContentHashVerifier {
    pub fn new() -> Self {
        Self
    }

    async fn check(&self, task: &Task, repo: &GitRepo) -> Result<bool, VerificationError> {
        match &task.scenario {
            Scenario::Merge(merge) => self.check_merge(repo, merge).await,
            Scenario::FileCommitChain(chain) => self.check_file(repo, chain).await,
        }
    }

    async fn check_merge(
        &self,
        repo: &GitRepo,
        merge: &MergeScenario,
    ) -> Result<bool, VerificationError> {
        let current = repo.worktree_tree_id().await?;

        fetch_if_missing(repo, &merge.merge_commit).await;
        let expected = repo
            .tree_of(&merge.merge_commit)
            .await
            .map_err(|source| VerificationError::UnresolvableRef {
                reference: merge.merge_commit.clone(),
                source,
            })?;

        debug!("Working tree {} against target tree {}", current, expected);
        Ok(current == expected)
    }

    async fn check_file(
        &self,
        repo: &GitRepo,
        chain: &FileCommitChainScenario,
    ) -> Result<bool, VerificationError> {
        fetch_if_missing(repo, &chain.newest_commit).await;

        let expected = repo
            .blob_at(&chain.newest_commit, &chain.path)
            .await
            .map_err(|source| match source {
                GitError::ParseError { .. } => VerificationError::Git(source),
                source => VerificationError::UnresolvableRef {
                    reference: chain.newest_commit.clone(),
                    source,
                },
            })?
            .ok_or_else(|| VerificationError::MissingTargetPath {
                path: chain.path.clone(),
                commit: chain.newest_commit.clone(),
            })?;

        let local = repo.path().join(&chain.path);
        let current = match tokio::fs::symlink_metadata(&local).await {
            Ok(meta) if meta.file_type().is_symlink() => repo.index_blob(&chain.path).await?,
            Ok(meta) if meta.is_file() => repo.hash_file(&chain.path).await?,
            _ => {
                return Err(VerificationError::MissingLocalFile {
                    path: chain.path.clone(),
                })
            }
        };
        debug!("{} is {} against target blob {}", chain.path, current, expected);
        Ok(current == expected)
    }
}

#[async_trait]
impl Verifier for ContentHashVerifier {
    async fn evaluate(&self, task: &Task, staged: &StagedRepository) -> bool {
        match self.check(task, staged.repo()).await {
            Ok(matched) => {
                info!(
                    "Verification of {}: {}",
                    task.id,
                    if matched { "content matches" } else { "content differs" }
                );
                matched
            }
            Err(e) => {
                warn!("Verification of {} failed: {}", task.id, e);
                false
            }
        }
    }
}

/// A fetch failure is left for the following lookup to report
async fn fetch_if_missing(repo: &GitRepo, reference: &str) {
    if let Err(e) = repo.ensure_commit(reference).await {
        debug!("Could not fetch {}: {}", reference, e);
    }
}
