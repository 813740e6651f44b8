//! Per-task staging directories

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::repo::GitRepo;

/// Root directory under which every task gets its own subdirectory
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by `task_id`.
    ///
    /// The name is a readable slug of the id plus a digest of the raw id, so
    /// ids that slug to the same text still get distinct directories.
    pub fn task_dir(&self, task_id: &str) -> PathBuf {
        let slug: String = task_id
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .take(64)
            .collect();
        let digest = hex::encode(Sha256::digest(task_id.as_bytes()));
        self.root.join(format!("{}-{}", slug.trim_start_matches('.'), &digest[..8]))
    }

    /// Wipe and recreate the task directory, returning where the clone goes
    pub async fn prepare(&self, task_id: &str) -> Result<PathBuf> {
        let dir = self.task_dir(task_id);

        if tokio::fs::try_exists(&dir).await? {
            info!("Removing previous staging directory {:?}", dir);
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Prepared staging directory {:?}", dir);

        Ok(dir.join("repo"))
    }
}

/// A clone driven into a task's starting state.
///
/// Owns its task directory for one attempt; nothing else writes there.
#[derive(Debug)]
pub struct StagedRepository {
    task_id: String,
    task_dir: PathBuf,
    repo: GitRepo,
}

impl StagedRepository {
    pub fn new(task_id: impl Into<String>, task_dir: impl Into<PathBuf>, repo: GitRepo) -> Self {
        Self {
            task_id: task_id.into(),
            task_dir: task_dir.into(),
            repo,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Working tree the agent operates on
    pub fn path(&self) -> &Path {
        self.repo.path()
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    /// Delete the whole task directory
    pub async fn remove(self) -> Result<()> {
        info!("Removing staging directory {:?}", self.task_dir);
        tokio::fs::remove_dir_all(&self.task_dir).await?;
        Ok(())
    }
}
