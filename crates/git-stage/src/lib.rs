//! Git staging library
//!
//! This crate drives the `git` binary to put a fresh clone into an exact
//! historical state and to read content-addressed ids back out of it.

mod commands;
mod error;
mod object;
mod repo;
mod staging;

pub use commands::{git_command, git_command_checked, GitOutput};
pub use error::{GitError, Result};
pub use object::ObjectId;
pub use repo::{GitRepo, GitTimeouts, MergeOutcome};
pub use staging::{StagedRepository, StagingArea};
