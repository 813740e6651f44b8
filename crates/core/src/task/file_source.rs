//! File-based task source
//!
//! Reads task records from a JSON array file or a JSON Lines file.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use super::model::TaskRecord;
use super::source::{ensure_unique_ids, TaskSource};
use crate::{Error, Result};

/// Dataset exported to disk
pub struct FileTaskSource {
    path: PathBuf,
}

impl FileTaskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, content: &str) -> Result<Vec<TaskRecord>> {
        if content.trim_start().starts_with('[') {
            return Ok(serde_json::from_str(content)?);
        }

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str(line).map_err(|e| {
                    Error::Dataset(format!(
                        "{}:{}: invalid task record: {}",
                        self.path.display(),
                        index + 1,
                        e
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl TaskSource for FileTaskSource {
    async fn load(&self) -> Result<Vec<TaskRecord>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::Dataset(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        let records = self.parse(&content)?;
        ensure_unique_ids(&records)?;
        info!("Loaded {} tasks from {}", records.len(), self.path.display());
        Ok(records)
    }
}
