//! Task source trait
//!
//! Defines where task records come from and which of them a run uses.

use async_trait::async_trait;
use std::collections::HashSet;

use super::model::TaskRecord;
use crate::{Error, Result};

/// Provider of raw task records, in dataset order
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Load every record
    async fn load(&self) -> Result<Vec<TaskRecord>>;
}

/// Refuse datasets that repeat a task id.
///
/// Each id owns one staging directory, so two records with the same id
/// would overwrite each other's clone.
pub fn ensure_unique_ids(records: &[TaskRecord]) -> Result<()> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(Error::Dataset(format!("duplicate task id '{}'", record.id)));
        }
    }
    Ok(())
}

/// Which records of a dataset a run attempts
#[derive(Debug, Clone, Default)]
pub struct TaskSelection {
    /// Take only the first N records
    pub num_tasks: Option<usize>,
    /// Take exactly these ids; wins over `num_tasks`
    pub task_ids: Vec<String>,
}

impl TaskSelection {
    /// Filter records, keeping dataset order
    pub fn apply(&self, records: Vec<TaskRecord>) -> Vec<TaskRecord> {
        if !self.task_ids.is_empty() {
            let wanted: HashSet<&str> = self.task_ids.iter().map(String::as_str).collect();
            return records
                .into_iter()
                .filter(|r| wanted.contains(r.id.as_str()))
                .collect();
        }

        match self.num_tasks {
            Some(n) => records.into_iter().take(n).collect(),
            None => records,
        }
    }
}
