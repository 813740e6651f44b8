//! One benchmark run from resolved settings to a written report

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use agent_runner::{ContentHashVerifier, RepositoryStager, ResultReporter, TaskRunner};
use gb_core::report::{JsonFileSink, Report};
use gb_core::task::{FileTaskSource, TaskSource};

use crate::config::RunSettings;

pub async fn run(settings: RunSettings) -> Result<Report> {
    // Configuration problems abort here, before any task starts
    let agent = settings
        .agent
        .build()
        .await
        .context("failed to set up agent")?;

    let records = FileTaskSource::new(&settings.dataset)
        .load()
        .await
        .with_context(|| format!("failed to load dataset {}", settings.dataset.display()))?;
    let records = settings.selection.apply(records);
    info!("Selected {} tasks", records.len());

    tokio::fs::create_dir_all(&settings.stager.work_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create work directory {}",
                settings.stager.work_dir.display()
            )
        })?;

    let runner = TaskRunner::new(
        settings.executor,
        RepositoryStager::new(settings.stager),
        agent,
        Arc::new(ContentHashVerifier::new()),
    );
    let results = runner.run(records).await;

    let reporter = ResultReporter::new(
        settings.benchmark_name,
        runner.agent_name(),
        Arc::new(JsonFileSink::new(&settings.output)),
    );
    let report = reporter
        .report(results)
        .await
        .with_context(|| format!("failed to write report {}", settings.output.display()))?;

    info!("Report written to {}", settings.output.display());
    Ok(report)
}
