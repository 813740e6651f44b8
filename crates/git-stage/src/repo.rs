//! A cloned repository and the plumbing the harness drives it with

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::commands::{git_command, git_command_checked, is_git_repository, path_arg};
use crate::error::{GitError, Result};
use crate::object::ObjectId;

/// Upper bounds for git subprocesses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitTimeouts {
    /// Local plumbing: checkout, merge, write-tree, ls-tree, hash-object
    pub plumbing: Duration,
    /// Network operations: clone and fetch
    pub network: Duration,
}

impl Default for GitTimeouts {
    fn default() -> Self {
        Self {
            plumbing: Duration::from_secs(60),
            network: Duration::from_secs(300),
        }
    }
}

/// Result of a merge that leaves the commit to someone else
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merged without conflicts, nothing committed
    Clean,
    /// Paths left with conflict markers in the working tree
    Conflicted(BTreeSet<String>),
}

/// Handle to a local clone
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    timeouts: GitTimeouts,
}

impl GitRepo {
    /// Open an existing repository
    pub async fn open(path: impl Into<PathBuf>, timeouts: GitTimeouts) -> Result<Self> {
        let path = path.into();

        if !is_git_repository(&path, timeouts.plumbing).await? {
            return Err(GitError::NotAGitRepository { path });
        }

        Ok(Self { path, timeouts })
    }

    /// Clone `url` into `dest` keeping at most `depth` commits of history
    pub async fn clone_shallow(
        url: &str,
        dest: &Path,
        depth: u32,
        timeouts: GitTimeouts,
    ) -> Result<Self> {
        let parent = dest.parent().ok_or_else(|| GitError::InvalidPath {
            path: dest.to_path_buf(),
        })?;
        tokio::fs::create_dir_all(parent).await?;

        info!("Cloning {} into {:?} (depth {})", url, dest, depth);

        let depth = depth.to_string();
        git_command_checked(
            parent,
            &["clone", "--quiet", "--depth", &depth, "--", url, path_arg(dest)?],
            timeouts.network,
        )
        .await?;

        Ok(Self {
            path: dest.to_path_buf(),
            timeouts,
        })
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn timeouts(&self) -> GitTimeouts {
        self.timeouts
    }

    async fn plumbing(&self, args: &[&str]) -> Result<String> {
        git_command_checked(&self.path, args, self.timeouts.plumbing).await
    }

    /// Set the committer identity on this clone only
    pub async fn configure_identity(&self, name: &str, email: &str) -> Result<()> {
        self.plumbing(&["config", "user.name", name]).await?;
        self.plumbing(&["config", "user.email", email]).await?;
        Ok(())
    }

    /// Fetch a single ref or commit from origin
    pub async fn fetch(&self, reference: &str) -> Result<()> {
        debug!("Fetching {} from origin", reference);
        git_command_checked(
            &self.path,
            &["fetch", "--quiet", "origin", reference],
            self.timeouts.network,
        )
        .await?;
        Ok(())
    }

    /// Check whether `reference` names a commit available locally
    pub async fn has_commit(&self, reference: &str) -> Result<bool> {
        let spec = format!("{}^{{commit}}", reference);
        let output = git_command(
            &self.path,
            &["rev-parse", "--verify", "--quiet", &spec],
            self.timeouts.plumbing,
        )
        .await?;
        Ok(output.success)
    }

    /// Fetch `reference` unless it is already present
    pub async fn ensure_commit(&self, reference: &str) -> Result<()> {
        if self.has_commit(reference).await? {
            return Ok(());
        }
        self.fetch(reference).await
    }

    /// Check out `reference` with a detached HEAD
    pub async fn checkout(&self, reference: &str) -> Result<()> {
        self.plumbing(&["checkout", "--quiet", "--detach", reference])
            .await?;
        Ok(())
    }

    /// Merge `reference` into HEAD without committing.
    ///
    /// A failing merge is only an error when it left no conflicted paths
    /// behind; conflicts are the state the caller asked for.
    pub async fn merge_no_commit(&self, reference: &str) -> Result<MergeOutcome> {
        let output = git_command(
            &self.path,
            &["merge", "--no-ff", "--no-commit", reference],
            self.timeouts.plumbing,
        )
        .await?;

        if output.success {
            return Ok(MergeOutcome::Clean);
        }

        let conflicted = self.unmerged_paths().await?;
        if conflicted.is_empty() {
            return Err(GitError::git_failed(format!(
                "git merge {} failed: {} {}",
                reference,
                output.stdout.trim(),
                output.stderr.trim()
            )));
        }

        Ok(MergeOutcome::Conflicted(conflicted))
    }

    /// Paths with unresolved merge entries in the index
    pub async fn unmerged_paths(&self) -> Result<BTreeSet<String>> {
        let output = self
            .plumbing(&["diff", "--name-only", "--diff-filter=U", "-z"])
            .await?;
        Ok(output
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Tree id of the whole working tree.
    ///
    /// Stages every change (additions, edits, deletions) into the index and
    /// writes it as a tree object. The working tree files are left untouched.
    pub async fn worktree_tree_id(&self) -> Result<ObjectId> {
        self.plumbing(&["add", "-A"]).await?;
        let output = self.plumbing(&["write-tree"]).await?;
        ObjectId::parse(&output)
    }

    /// Tree id of the commit named by `reference`
    pub async fn tree_of(&self, reference: &str) -> Result<ObjectId> {
        let spec = format!("{}^{{tree}}", reference);
        let output = self.plumbing(&["rev-parse", "--verify", &spec]).await?;
        ObjectId::parse(&output)
    }

    /// Blob id of `path` at `commit`, `None` if the commit has no such file
    pub async fn blob_at(&self, commit: &str, path: &str) -> Result<Option<ObjectId>> {
        let output = self
            .plumbing(&["ls-tree", "-r", "-z", commit, "--", path])
            .await?;

        for entry in output.split('\0').filter(|e| !e.is_empty()) {
            let (meta, entry_path) = entry
                .split_once('\t')
                .ok_or_else(|| GitError::parse_error(format!("ls-tree entry '{}'", entry)))?;

            let mut fields = meta.split(' ');
            let (Some(_mode), Some(kind), Some(oid)) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(GitError::parse_error(format!("ls-tree entry '{}'", entry)));
            };

            if entry_path == path && kind == "blob" {
                return ObjectId::parse(oid).map(Some);
            }
        }

        Ok(None)
    }

    /// Blob id of a working tree file, hashed exactly as git would store it
    pub async fn hash_file(&self, path: &str) -> Result<ObjectId> {
        let output = self.plumbing(&["hash-object", "--", path]).await?;
        ObjectId::parse(&output)
    }

    /// Blob id of `path` after staging it into the index.
    ///
    /// Unlike [`hash_file`](Self::hash_file) this does not follow symlinks:
    /// a link is stored as its target text, the way a commit records it.
    pub async fn index_blob(&self, path: &str) -> Result<ObjectId> {
        self.plumbing(&["--literal-pathspecs", "add", "--force", "--", path])
            .await?;
        let output = self
            .plumbing(&["--literal-pathspecs", "ls-files", "--stage", "-z", "--", path])
            .await?;

        for entry in output.split('\0').filter(|e| !e.is_empty()) {
            let (meta, entry_path) = entry
                .split_once('\t')
                .ok_or_else(|| GitError::parse_error(format!("ls-files entry '{}'", entry)))?;
            if entry_path != path {
                continue;
            }
            let mut fields = meta.split(' ');
            let (Some(_mode), Some(oid)) = (fields.next(), fields.next()) else {
                return Err(GitError::parse_error(format!("ls-files entry '{}'", entry)));
            };
            return ObjectId::parse(oid);
        }

        Err(GitError::parse_error(format!("{} is not in the index", path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{init_test_repo, LIMIT};

    fn timeouts() -> GitTimeouts {
        GitTimeouts {
            plumbing: LIMIT,
            network: LIMIT,
        }
    }

    async fn git(dir: &Path, args: &[&str]) -> String {
        git_command_checked(dir, args, LIMIT).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_rejects_plain_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = GitRepo::open(dir.path(), timeouts()).await;
        assert!(matches!(result, Err(GitError::NotAGitRepository { .. })));
    }

    #[tokio::test]
    async fn test_worktree_tree_matches_head() {
        let dir = init_test_repo().await;
        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();

        let current = repo.worktree_tree_id().await.unwrap();
        let head = repo.tree_of("HEAD").await.unwrap();
        assert_eq!(current, head);
    }

    #[tokio::test]
    async fn test_worktree_tree_sees_single_byte_change() {
        let dir = init_test_repo().await;
        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();

        tokio::fs::write(dir.path().join("test.txt"), "tesT").await.unwrap();
        let current = repo.worktree_tree_id().await.unwrap();
        assert_ne!(current, repo.tree_of("HEAD").await.unwrap());
    }

    #[tokio::test]
    async fn test_worktree_tree_sees_untracked_file() {
        let dir = init_test_repo().await;
        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();

        tokio::fs::write(dir.path().join("extra.txt"), "x").await.unwrap();
        let current = repo.worktree_tree_id().await.unwrap();
        assert_ne!(current, repo.tree_of("HEAD").await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_file_depends_only_on_bytes() {
        let dir = init_test_repo().await;
        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();

        tokio::fs::write(dir.path().join("a.txt"), "same bytes\n").await.unwrap();
        tokio::fs::write(dir.path().join("b.txt"), "same bytes\n").await.unwrap();
        tokio::fs::write(dir.path().join("c.txt"), "same bytez\n").await.unwrap();

        let a = repo.hash_file("a.txt").await.unwrap();
        let b = repo.hash_file("b.txt").await.unwrap();
        let c = repo.hash_file("c.txt").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_blob_at_requires_exact_path() {
        let dir = init_test_repo().await;
        tokio::fs::create_dir_all(dir.path().join("nested")).await.unwrap();
        tokio::fs::write(dir.path().join("nested/test.txt"), "nested")
            .await
            .unwrap();
        git(dir.path(), &["add", "."]).await;
        git(dir.path(), &["commit", "-m", "nested"]).await;

        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();

        let top = repo.blob_at("HEAD", "test.txt").await.unwrap().unwrap();
        assert_eq!(top, repo.hash_file("test.txt").await.unwrap());

        let nested = repo.blob_at("HEAD", "nested/test.txt").await.unwrap().unwrap();
        assert_ne!(top, nested);

        assert!(repo.blob_at("HEAD", "missing.txt").await.unwrap().is_none());
        assert!(repo.blob_at("HEAD", "nested").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_index_blob_keeps_symlink_text() {
        let dir = init_test_repo().await;
        std::os::unix::fs::symlink("test.txt", dir.path().join("link")).unwrap();
        git(dir.path(), &["add", "."]).await;
        git(dir.path(), &["commit", "-m", "link"]).await;

        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();
        let committed = repo.blob_at("HEAD", "link").await.unwrap().unwrap();

        assert_eq!(repo.index_blob("link").await.unwrap(), committed);
        assert_ne!(repo.hash_file("link").await.unwrap(), committed);
        assert_eq!(
            repo.index_blob("test.txt").await.unwrap(),
            repo.hash_file("test.txt").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_blob_at_unknown_commit_is_error() {
        let dir = init_test_repo().await;
        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();
        let missing = "0123456789abcdef0123456789abcdef01234567";
        assert!(repo.blob_at(missing, "test.txt").await.is_err());
        assert!(repo.tree_of(missing).await.is_err());
        assert!(!repo.has_commit(missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_merge_no_commit_reports_conflicts() {
        let dir = init_test_repo().await;
        let path = dir.path();

        git(path, &["checkout", "-b", "left"]).await;
        tokio::fs::write(path.join("test.txt"), "left").await.unwrap();
        git(path, &["commit", "-am", "left"]).await;

        git(path, &["checkout", "main"]).await;
        git(path, &["checkout", "-b", "right"]).await;
        tokio::fs::write(path.join("test.txt"), "right").await.unwrap();
        git(path, &["commit", "-am", "right"]).await;

        let repo = GitRepo::open(path, timeouts()).await.unwrap();
        repo.checkout("left").await.unwrap();

        let outcome = repo.merge_no_commit("right").await.unwrap();
        let expected: BTreeSet<String> = ["test.txt".to_string()].into_iter().collect();
        assert_eq!(outcome, MergeOutcome::Conflicted(expected));

        let content = tokio::fs::read_to_string(path.join("test.txt")).await.unwrap();
        assert!(content.contains("<<<<<<<"));
        assert!(content.contains(">>>>>>>"));
    }

    #[tokio::test]
    async fn test_merge_unknown_ref_is_error() {
        let dir = init_test_repo().await;
        let repo = GitRepo::open(dir.path(), timeouts()).await.unwrap();
        assert!(repo.merge_no_commit("no-such-branch").await.is_err());
    }

    #[tokio::test]
    async fn test_clone_shallow_and_fetch_by_commit() {
        let source = init_test_repo().await;
        tokio::fs::write(source.path().join("test.txt"), "second").await.unwrap();
        git(source.path(), &["commit", "-am", "second"]).await;
        let first = git(source.path(), &["rev-parse", "HEAD~1"]).await;
        let first = first.trim();

        let target = tempfile::TempDir::new().unwrap();
        let dest = target.path().join("clone");
        let url = format!("file://{}", source.path().display());

        let repo = GitRepo::clone_shallow(&url, &dest, 1, timeouts()).await.unwrap();
        assert!(!repo.has_commit(first).await.unwrap());

        repo.ensure_commit(first).await.unwrap();
        repo.checkout(first).await.unwrap();
        let content = tokio::fs::read_to_string(dest.join("test.txt")).await.unwrap();
        assert_eq!(content, "test");
    }

    #[tokio::test]
    async fn test_clone_missing_remote_fails() {
        let target = tempfile::TempDir::new().unwrap();
        let url = format!("file://{}/nowhere.git", target.path().display());
        let result =
            GitRepo::clone_shallow(&url, &target.path().join("clone"), 1, timeouts()).await;
        assert!(matches!(result, Err(GitError::CommandFailed { .. })));
    }
}
