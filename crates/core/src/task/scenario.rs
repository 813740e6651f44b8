//! Typed scenarios, parsed once from the loosely typed dataset payload

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::literal;
use super::model::SampleKind;
use crate::{Error, Result};

/// Merge-conflict task: reproduce the tree of `merge_commit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeScenario {
    /// `[ours, theirs]`; the second is merged into the first
    pub parents: [String; 2],
    pub merge_commit: String,
    pub conflicted_paths: BTreeSet<String>,
}

/// File history task: bring `path` from its old content to its content at
/// `newest_commit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCommitChainScenario {
    pub path: String,
    pub oldest_commit: String,
    pub newest_commit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scenario {
    Merge(MergeScenario),
    FileCommitChain(FileCommitChainScenario),
}

impl Scenario {
    /// Parse a dataset payload for the given kind.
    ///
    /// The payload may be a JSON object, a string containing JSON, or a
    /// string containing a Python dict literal.
    pub fn parse(kind: SampleKind, payload: &Value) -> Result<Self> {
        let decoded;
        let payload = match payload {
            Value::String(text) => {
                decoded = match serde_json::from_str::<Value>(text) {
                    Ok(value) => value,
                    Err(_) => literal::parse(text)?,
                };
                &decoded
            }
            other => other,
        };

        let map = payload.as_object().ok_or_else(|| {
            Error::ScenarioParse(format!("scenario must be a mapping, got {}", payload))
        })?;

        match kind {
            SampleKind::Merge => Self::parse_merge(map),
            SampleKind::FileCommitChain => Self::parse_file_commit_chain(map),
        }
    }

    fn parse_merge(map: &Map<String, Value>) -> Result<Self> {
        let parents = map
            .get("parents")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::ScenarioParse("merge scenario needs a 'parents' list".into()))?;

        if parents.len() < 2 {
            return Err(Error::ScenarioParse(format!(
                "merge scenario needs two parents, got {}",
                parents.len()
            )));
        }

        let ours = commit_ref("parents[0]", parents.first())?;
        let theirs = commit_ref("parents[1]", parents.get(1))?;
        let merge_commit = commit_ref("merge_commit_hash", map.get("merge_commit_hash"))?;

        let conflicted_paths = match map.get("files_in_merge_conflict") {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| repo_path("files_in_merge_conflict", Some(item)))
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(Error::ScenarioParse(format!(
                    "'files_in_merge_conflict' must be a list, got {}",
                    other
                )))
            }
        };

        Ok(Self::Merge(MergeScenario {
            parents: [ours, theirs],
            merge_commit,
            conflicted_paths,
        }))
    }

    fn parse_file_commit_chain(map: &Map<String, Value>) -> Result<Self> {
        Ok(Self::FileCommitChain(FileCommitChainScenario {
            path: repo_path("file", map.get("file"))?,
            oldest_commit: commit_ref("oldest_commit", map.get("oldest_commit"))?,
            newest_commit: commit_ref("newest_commit", map.get("newest_commit"))?,
        }))
    }

    pub fn kind(&self) -> SampleKind {
        match self {
            Self::Merge(_) => SampleKind::Merge,
            Self::FileCommitChain(_) => SampleKind::FileCommitChain,
        }
    }
}

fn required_str<'a>(key: &str, value: Option<&'a Value>) -> Result<&'a str> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        Some(other) => Err(Error::ScenarioParse(format!(
            "'{}' must be a non-empty string, got {}",
            key, other
        ))),
        None => Err(Error::ScenarioParse(format!("missing required key '{}'", key))),
    }
}

/// Refs are handed to git as arguments, so they may not look like options
fn commit_ref(key: &str, value: Option<&Value>) -> Result<String> {
    let reference = required_str(key, value)?.trim();
    if reference.starts_with('-') || reference.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(Error::ScenarioParse(format!(
            "'{}' is not a valid commit reference: '{}'",
            key, reference
        )));
    }
    Ok(reference.to_string())
}

/// Paths must stay inside the working tree
fn repo_path(key: &str, value: Option<&Value>) -> Result<String> {
    let path = required_str(key, value)?;
    let escapes = path.starts_with('/')
        || path.split('/').any(|part| part == "..")
        || path.chars().any(char::is_control);
    if escapes {
        return Err(Error::ScenarioParse(format!(
            "'{}' is not a relative repository path: '{}'",
            key, path
        )));
    }
    Ok(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_merge_object() {
        let scenario = Scenario::parse(
            SampleKind::Merge,
            &json!({
                "parents": ["aaa", "bbb"],
                "merge_commit_hash": "ccc",
                "files_in_merge_conflict": ["src/a.rs", "src/b.rs", "src/a.rs"]
            }),
        )
        .unwrap();

        let Scenario::Merge(merge) = scenario else {
            panic!("expected merge scenario");
        };
        assert_eq!(merge.parents, ["aaa".to_string(), "bbb".to_string()]);
        assert_eq!(merge.merge_commit, "ccc");
        assert_eq!(merge.conflicted_paths.len(), 2);
    }

    #[test]
    fn test_parse_merge_from_python_literal_string() {
        let payload = Value::String(
            "{'merge_commit_hash': 'ccc', 'parents': ['aaa', 'bbb'], \
             'number_of_files_with_merge_conflict': 1, 'total_number_of_merge_conflicts': 2, \
             'files_in_merge_conflict': ['README.md']}"
                .to_string(),
        );
        let scenario = Scenario::parse(SampleKind::Merge, &payload).unwrap();
        assert_eq!(scenario.kind(), SampleKind::Merge);
    }

    #[test]
    fn test_parse_file_chain_from_json_string() {
        let payload = Value::String(
            r#"{"file": "docs/guide.md", "oldest_commit": "111", "newest_commit": "222"}"#
                .to_string(),
        );
        let scenario = Scenario::parse(SampleKind::FileCommitChain, &payload).unwrap();
        assert_eq!(
            scenario,
            Scenario::FileCommitChain(FileCommitChainScenario {
                path: "docs/guide.md".to_string(),
                oldest_commit: "111".to_string(),
                newest_commit: "222".to_string(),
            })
        );
    }

    #[test]
    fn test_merge_needs_two_parents() {
        let err = Scenario::parse(
            SampleKind::Merge,
            &json!({"parents": ["aaa"], "merge_commit_hash": "ccc"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("two parents"));
    }

    #[test]
    fn test_missing_keys_are_parse_errors() {
        let missing_merge = Scenario::parse(SampleKind::Merge, &json!({"parents": ["a", "b"]}));
        assert!(matches!(missing_merge, Err(Error::ScenarioParse(_))));

        let missing_file = Scenario::parse(
            SampleKind::FileCommitChain,
            &json!({"oldest_commit": "1", "newest_commit": "2"}),
        );
        assert!(matches!(missing_file, Err(Error::ScenarioParse(_))));

        let wrong_shape = Scenario::parse(
            SampleKind::FileCommitChain,
            &json!({"file": ["x"], "oldest_commit": "1", "newest_commit": "2"}),
        );
        assert!(matches!(wrong_shape, Err(Error::ScenarioParse(_))));
    }

    #[test]
    fn test_rejects_option_like_refs_and_escaping_paths() {
        let option_ref = Scenario::parse(
            SampleKind::Merge,
            &json!({"parents": ["--upload-pack=evil", "b"], "merge_commit_hash": "c"}),
        );
        assert!(option_ref.is_err());

        let escaping = Scenario::parse(
            SampleKind::FileCommitChain,
            &json!({"file": "../outside", "oldest_commit": "1", "newest_commit": "2"}),
        );
        assert!(escaping.is_err());
    }

    #[test]
    fn test_file_path_keeps_surrounding_spaces() {
        let scenario = Scenario::parse(
            SampleKind::FileCommitChain,
            &json!({"file": " notes .txt ", "oldest_commit": " 111\n", "newest_commit": "222"}),
        )
        .unwrap();

        let Scenario::FileCommitChain(chain) = scenario else {
            panic!("expected file commit chain scenario");
        };
        assert_eq!(chain.path, " notes .txt ");
        assert_eq!(chain.oldest_commit, "111");

        let blank = Scenario::parse(
            SampleKind::FileCommitChain,
            &json!({"file": "   ", "oldest_commit": "1", "newest_commit": "2"}),
        );
        assert!(blank.is_err());
    }

    #[test]
    fn test_non_mapping_payload() {
        assert!(Scenario::parse(SampleKind::Merge, &json!([1, 2])).is_err());
        assert!(Scenario::parse(SampleKind::Merge, &json!("not a mapping")).is_err());
    }
}
