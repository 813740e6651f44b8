//! Agent Runner - task lifecycle for the git history benchmark
//!
//! Each task is staged into a fresh clone, handed to an agent with a prompt,
//! and verified by comparing git content hashes against the target commit.

mod command_policy;
mod error;
mod executor;
mod invoker;
mod process;
mod prompt;
mod reporter;
mod stager;
mod verifier;

pub use command_policy::CommandPolicy;
pub use error::{ExecutorError, Result};
pub use executor::{ExecutorConfig, TaskRunner, TaskStage, AGENT_FAILED, DUPLICATE_TASK_ID};
pub use invoker::{AgentInvoker, AgentSpec, CliAgent, CommandSource, GitCommandAgent, StaticCommands};
pub use process::{AgentConfig, AgentProcess, AgentType};
pub use prompt::build_prompt;
pub use reporter::ResultReporter;
pub use stager::{RepositoryStager, StagerConfig};
pub use verifier::{ContentHashVerifier, Verifier};
