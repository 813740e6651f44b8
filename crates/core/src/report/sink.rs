//! Report persistence

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::model::Report;
use crate::Result;

/// Destination for a finished report
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&self, report: &Report) -> Result<()>;
}

/// Writes the report as pretty-printed JSON to a file
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn write(&self, report: &Report) -> Result<()> {
        let content = serde_json::to_string_pretty(report)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await?;
        debug!("Saved report to {}", self.path.display());
        Ok(())
    }
}
