//! Per-task results and the aggregate report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one task attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    /// Sample type as given by the dataset, kept even when it did not parse
    #[serde(rename = "sample_type")]
    pub sample_kind: String,
    pub success: bool,
    #[serde(rename = "execution_time_sec")]
    pub elapsed_seconds: f64,
    pub error: Option<String>,
}

impl TaskResult {
    /// A task that ran to verification
    pub fn verified(
        task_id: impl Into<String>,
        sample_kind: impl Into<String>,
        success: bool,
        elapsed: Duration,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            sample_kind: sample_kind.into(),
            success,
            elapsed_seconds: elapsed.as_secs_f64(),
            error: None,
        }
    }

    /// A task that stopped at some stage with an error
    pub fn failed(
        task_id: impl Into<String>,
        sample_kind: impl Into<String>,
        elapsed: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            sample_kind: sample_kind.into(),
            success: false,
            elapsed_seconds: elapsed.as_secs_f64(),
            error: Some(error.into()),
        }
    }
}

/// Aggregate over a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "benchmark")]
    pub benchmark_name: String,
    #[serde(rename = "agent")]
    pub agent_name: String,
    pub total: usize,
    pub passed: usize,
    pub rate: f64,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<TaskResult>,
}

impl Report {
    /// Aggregate results, keeping their order
    pub fn from_results(
        benchmark_name: impl Into<String>,
        agent_name: impl Into<String>,
        results: Vec<TaskResult>,
    ) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.success).count();
        let rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64
        };

        Self {
            benchmark_name: benchmark_name.into(),
            agent_name: agent_name.into(),
            total,
            passed,
            rate,
            generated_at: Utc::now(),
            results,
        }
    }

    /// `passed/total (rate%)`
    pub fn summary_line(&self) -> String {
        format!("{}/{} ({:.1}%)", self.passed, self.total, self.rate * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, success: bool) -> TaskResult {
        TaskResult::verified(id, "merge", success, Duration::from_millis(1500))
    }

    #[test]
    fn test_rate_for_empty_run_is_zero() {
        let report = Report::from_results("git_good_bench", "codex", Vec::new());
        assert_eq!(report.total, 0);
        assert_eq!(report.passed, 0);
        assert_eq!(report.rate, 0.0);
        assert_eq!(report.summary_line(), "0/0 (0.0%)");
    }

    #[test]
    fn test_rate_counts_passes() {
        let report = Report::from_results(
            "git_good_bench",
            "codex",
            vec![
                result("a", true),
                result("b", false),
                result("c", true),
                TaskResult::failed("d", "merge", Duration::ZERO, "agent failed"),
            ],
        );
        assert_eq!(report.total, 4);
        assert_eq!(report.passed, 2);
        assert_eq!(report.rate, 0.5);
        assert_eq!(report.summary_line(), "2/4 (50.0%)");
        let order: Vec<&str> = report.results.iter().map(|r| r.task_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_serialized_field_names() {
        let report = Report::from_results("bench", "agent", vec![result("a", true)]);
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["benchmark"], "bench");
        assert_eq!(value["agent"], "agent");
        assert_eq!(value["rate"], 1.0);
        let entry = &value["results"][0];
        assert_eq!(entry["task_id"], "a");
        assert_eq!(entry["sample_type"], "merge");
        assert_eq!(entry["success"], true);
        assert_eq!(entry["execution_time_sec"], 1.5);
        assert!(entry["error"].is_null());
    }
}
