//! Task module
//!
//! This module contains task records, typed scenarios and task sources.

mod file_source;
mod literal;
mod model;
mod scenario;
mod source;

pub use file_source::FileTaskSource;
pub use model::*;
pub use scenario::{FileCommitChainScenario, MergeScenario, Scenario};
pub use source::{ensure_unique_ids, TaskSelection, TaskSource};
