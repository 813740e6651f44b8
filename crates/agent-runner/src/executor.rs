//! Task runner - drives each task through staging, the agent and verification

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{stream, FutureExt, StreamExt};
use tracing::{debug, error, info, info_span, warn, Instrument};

use gb_core::report::TaskResult;
use gb_core::task::{Task, TaskRecord};
use git_stage::StagedRepository;

use crate::invoker::AgentInvoker;
use crate::prompt::build_prompt;
use crate::stager::RepositoryStager;
use crate::verifier::Verifier;

/// Error recorded when the agent reports failure or runs out of time
pub const AGENT_FAILED: &str = "agent failed";

/// Error recorded for a record whose id already appeared earlier in the run
pub const DUPLICATE_TASK_ID: &str = "duplicate task id";

/// Configuration for the task runner
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound for one agent invocation
    pub agent_timeout: Duration,
    /// Tasks in flight at once; results keep dataset order regardless
    pub concurrency: usize,
    /// Remove each task directory once its result is recorded
    pub cleanup: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            agent_timeout: Duration::from_secs(600),
            concurrency: 1,
            cleanup: false,
        }
    }
}

impl ExecutorConfig {
    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }
}

/// Lifecycle of one task. `Failed` is absorbing: nothing runs after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStage {
    Staging,
    Invoking,
    Verifying,
    Recorded { success: bool },
    Failed { stage: &'static str, error: String },
}

impl TaskStage {
    fn name(&self) -> &'static str {
        match self {
            Self::Staging => "staging",
            Self::Invoking => "invoking",
            Self::Verifying => "verifying",
            Self::Recorded { .. } => "recorded",
            Self::Failed { .. } => "failed",
        }
    }

    /// Move to `next`, unless the task already failed
    fn advance(&mut self, next: TaskStage) {
        if matches!(self, Self::Failed { .. }) {
            return;
        }
        debug!("{} -> {}", self, next);
        *self = next;
    }

    /// Fail in the current stage
    fn fail(&mut self, error: impl Into<String>) {
        if matches!(self, Self::Failed { .. }) {
            return;
        }
        *self = Self::Failed {
            stage: self.name(),
            error: error.into(),
        };
    }

    fn into_result(self, record: &TaskRecord, elapsed: Duration) -> TaskResult {
        match self {
            Self::Recorded { success } => {
                TaskResult::verified(&record.id, &record.sample_type, success, elapsed)
            }
            Self::Failed { error, .. } => {
                TaskResult::failed(&record.id, &record.sample_type, elapsed, error)
            }
            unfinished => TaskResult::failed(
                &record.id,
                &record.sample_type,
                elapsed,
                format!("task stopped while {}", unfinished),
            ),
        }
    }
}

impl fmt::Display for TaskStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { stage, error } => write!(f, "failed while {}: {}", stage, error),
            other => f.write_str(other.name()),
        }
    }
}

/// Runs tasks one stage at a time and turns every outcome into a result
pub struct TaskRunner {
    config: ExecutorConfig,
    stager: RepositoryStager,
    agent: Arc<dyn AgentInvoker>,
    verifier: Arc<dyn Verifier>,
}

impl TaskRunner {
    pub fn new(
        config: ExecutorConfig,
        stager: RepositoryStager,
        agent: Arc<dyn AgentInvoker>,
        verifier: Arc<dyn Verifier>,
    ) -> Self {
        Self {
            config,
            stager,
            agent,
            verifier,
        }
    }

    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    /// Run every record, returning exactly one result per record in order
    pub async fn run(&self, records: Vec<TaskRecord>) -> Vec<TaskResult> {
        let total = records.len();
        let concurrency = self.config.concurrency.max(1);
        info!(
            "Running {} tasks with agent {} (concurrency {})",
            total,
            self.agent.name(),
            concurrency
        );

        // A repeated id would share its staging directory with the first one
        let mut seen = HashSet::new();
        let records: Vec<_> = records
            .into_iter()
            .map(|record| {
                let repeated = !seen.insert(record.id.clone());
                (record, repeated)
            })
            .collect();

        stream::iter(records.into_iter().enumerate())
            .map(|(index, (record, repeated))| {
                let span = info_span!("task", id = %record.id);
                async move {
                    info!("[{}/{}] {}", index + 1, total, record.id);
                    let result = if repeated {
                        warn!("Skipping repeated task id {}", record.id);
                        TaskResult::failed(
                            &record.id,
                            &record.sample_type,
                            Duration::ZERO,
                            DUPLICATE_TASK_ID,
                        )
                    } else {
                        self.run_task(&record).await
                    };
                    if result.success {
                        info!("PASS ({:.1}s)", result.elapsed_seconds);
                    } else {
                        info!("FAIL ({:.1}s)", result.elapsed_seconds);
                    }
                    result
                }
                .instrument(span)
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    /// Run one record to a result; errors and panics never escape
    pub async fn run_task(&self, record: &TaskRecord) -> TaskResult {
        let started = Instant::now();

        match AssertUnwindSafe(self.drive(record)).catch_unwind().await {
            Ok(stage) => stage.into_result(record, started.elapsed()),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Task {} panicked: {}", record.id, message);
                TaskResult::failed(
                    &record.id,
                    &record.sample_type,
                    started.elapsed(),
                    format!("task panicked: {}", message),
                )
            }
        }
    }

    async fn drive(&self, record: &TaskRecord) -> TaskStage {
        let mut stage = TaskStage::Staging;

        let task = match Task::from_record(record) {
            Ok(task) => task,
            Err(e) => {
                stage.fail(format!("invalid scenario: {}", e));
                return stage;
            }
        };

        let staged = match self.stager.stage(&task).await {
            Ok(staged) => staged,
            Err(e) => {
                stage.fail(e.to_string());
                if self.config.cleanup {
                    self.stager.discard(&task.id).await;
                }
                return stage;
            }
        };

        self.attempt(&task, &staged, &mut stage).await;

        if self.config.cleanup {
            if let Err(e) = staged.remove().await {
                warn!("Failed to clean up {}: {}", task.id, e);
            }
        }
        stage
    }

    async fn attempt(&self, task: &Task, staged: &StagedRepository, stage: &mut TaskStage) {
        stage.advance(TaskStage::Invoking);
        let prompt = build_prompt(task);
        let finished = self
            .agent
            .invoke(staged.path(), &prompt, self.config.agent_timeout)
            .await;
        if !finished {
            stage.fail(AGENT_FAILED);
            return;
        }

        stage.advance(TaskStage::Verifying);
        let success = self.verifier.evaluate(task, staged).await;
        stage.advance(TaskStage::Recorded { success });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
