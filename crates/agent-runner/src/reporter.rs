//! Result aggregation and report output

use std::sync::Arc;
use tracing::info;

use gb_core::report::{Report, ReportSink, TaskResult};

use crate::error::Result;

/// Aggregates results into a [`Report`] and hands it to a sink
pub struct ResultReporter {
    benchmark: String,
    agent: String,
    sink: Arc<dyn ReportSink>,
}

impl ResultReporter {
    pub fn new(
        benchmark: impl Into<String>,
        agent: impl Into<String>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            benchmark: benchmark.into(),
            agent: agent.into(),
            sink,
        }
    }

    pub async fn report(&self, results: Vec<TaskResult>) -> Result<Report> {
        let report = Report::from_results(&self.benchmark, &self.agent, results);
        self.sink.write(&report).await?;
        info!("{} {}: {}", self.benchmark, self.agent, report.summary_line());
        Ok(report)
    }
}
