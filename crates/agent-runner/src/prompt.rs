//! Task prompts handed to agents

use gb_core::task::{Scenario, Task};

/// Build the prompt for a task
pub fn build_prompt(task: &Task) -> String {
    match &task.scenario {
        Scenario::Merge(merge) => {
            let files = if merge.conflicted_paths.is_empty() {
                "N/A".to_string()
            } else {
                merge
                    .conflicted_paths
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            format!(
                "Resolve the merge conflict in this git repository.\n\
                 \n\
                 Target commit: {}\n\
                 Files with conflicts: {}\n\
                 \n\
                 Steps:\n\
                 1. Check git status and git diff\n\
                 2. Resolve all conflicts\n\
                 3. Stage files with git add\n\
                 4. Complete the merge",
                merge.merge_commit, files
            )
        }
        Scenario::FileCommitChain(chain) => format!(
            "Update the target file to match the expected state.\n\
             \n\
             Target file: {}\n\
             Target commit: {}\n\
             \n\
             Use git commands to get the file content from the target commit.",
            chain.path, chain.newest_commit
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb_core::task::{FileCommitChainScenario, MergeScenario};

    #[test]
    fn test_merge_prompt_names_target_and_files() {
        let task = Task {
            id: "t1".to_string(),
            repository: "acme/widgets".to_string(),
            scenario: Scenario::Merge(MergeScenario {
                parents: ["a".to_string(), "b".to_string()],
                merge_commit: "cafe".to_string(),
                conflicted_paths: ["src/x.rs".to_string(), "README.md".to_string()]
                    .into_iter()
                    .collect(),
            }),
        };
        let prompt = build_prompt(&task);
        assert!(prompt.starts_with("Resolve the merge conflict"));
        assert!(prompt.contains("Target commit: cafe"));
        assert!(prompt.contains("Files with conflicts: README.md, src/x.rs"));
    }

    #[test]
    fn test_file_chain_prompt_names_file_and_commit() {
        let task = Task {
            id: "t2".to_string(),
            repository: "acme/widgets".to_string(),
            scenario: Scenario::FileCommitChain(FileCommitChainScenario {
                path: "docs/guide.md".to_string(),
                oldest_commit: "old".to_string(),
                newest_commit: "new".to_string(),
            }),
        };
        let prompt = build_prompt(&task);
        assert!(prompt.contains("Target file: docs/guide.md"));
        assert!(prompt.contains("Target commit: new"));
        assert!(!prompt.contains("Target commit: old"));
    }
}
