//! Task model definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::scenario::Scenario;
use crate::{Error, Result};

/// Task family, deciding how a task is staged and verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    Merge,
    FileCommitChain,
}

impl SampleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::FileCommitChain => "file_commit_chain",
        }
    }
}

impl FromStr for SampleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "file_commit_chain" | "file-commit-chain" => Ok(Self::FileCommitChain),
            other => Err(Error::ScenarioParse(format!("unknown sample type '{}'", other))),
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dataset row as delivered by the dataset source, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    /// `owner/name` of the upstream repository
    #[serde(alias = "repository_identifier")]
    pub name: String,
    pub sample_type: String,
    /// Either a JSON object or a string holding one
    pub scenario: Value,
}

/// A validated task with its typed scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub repository: String,
    pub scenario: Scenario,
}

impl Task {
    /// Validate a raw record and parse its scenario payload
    pub fn from_record(record: &TaskRecord) -> Result<Self> {
        if record.id.trim().is_empty() {
            return Err(Error::InvalidInput("task id is empty".to_string()));
        }
        validate_repository(&record.name)?;

        let kind: SampleKind = record.sample_type.parse()?;
        let scenario = Scenario::parse(kind, &record.scenario)?;

        Ok(Self {
            id: record.id.clone(),
            repository: record.name.clone(),
            scenario,
        })
    }

    pub fn sample_kind(&self) -> SampleKind {
        self.scenario.kind()
    }
}

/// Repository identifiers end up in a clone URL; only `owner/name` is allowed
fn validate_repository(name: &str) -> Result<()> {
    let mut parts = name.split('/');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) => [owner, repo].iter().all(|part| {
            !part.is_empty()
                && !part.starts_with('-')
                && !part.starts_with('.')
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "repository identifier '{}' is not of the form owner/name",
            name
        )))
    }
}
