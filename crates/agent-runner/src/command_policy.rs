//! Allow-list for agent-proposed git commands
//!
//! Agents that answer with command text never get a shell. Each line is
//! split into an argument vector here, checked against the allowed git
//! subcommands, and only then executed directly.

use std::collections::BTreeSet;

use crate::error::{ExecutorError, Result};

/// Subcommands an agent may run inside its staged repository
const DEFAULT_SUBCOMMANDS: &[&str] = &[
    "add",
    "checkout",
    "cherry-pick",
    "commit",
    "diff",
    "fetch",
    "log",
    "ls-files",
    "merge",
    "mv",
    "rebase",
    "reset",
    "restore",
    "rev-parse",
    "rm",
    "show",
    "status",
    "switch",
];

/// Options that make git run arbitrary programs
const FORBIDDEN_OPTIONS: &[&str] = &[
    "--exec",
    "--ext-diff",
    "--output",
    "--receive-pack",
    "--textconv",
    "--upload-pack",
];

/// Characters a shell would interpret when they appear unquoted
const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '$', '`', '<', '>', '(', ')', '\n'];

#[derive(Debug, Clone)]
pub struct CommandPolicy {
    subcommands: BTreeSet<String>,
}

impl Default for CommandPolicy {
    fn default() -> Self {
        Self {
            subcommands: DEFAULT_SUBCOMMANDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CommandPolicy {
    /// Policy allowing exactly `subcommands`
    pub fn with_subcommands<I, S>(subcommands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subcommands: subcommands.into_iter().map(Into::into).collect(),
        }
    }

    /// Turn one line of command text into git arguments, or refuse it.
    ///
    /// A leading `git` is optional. The returned vector excludes it.
    pub fn validate(&self, line: &str) -> Result<Vec<String>> {
        let mut argv = split_command_line(line)?;

        if argv.first().map(String::as_str) == Some("git") {
            argv.remove(0);
        }

        let subcommand = argv
            .first()
            .ok_or_else(|| ExecutorError::rejected(line, "empty command"))?;

        if subcommand.starts_with('-') {
            return Err(ExecutorError::rejected(
                line,
                "global git options are not allowed",
            ));
        }
        if !self.subcommands.contains(subcommand) {
            return Err(ExecutorError::rejected(
                line,
                format!("git {} is not allowed", subcommand),
            ));
        }

        for arg in &argv[1..] {
            if let Some(option) = forbidden_long_option(arg) {
                return Err(ExecutorError::rejected(
                    line,
                    format!("option {} is not allowed", option),
                ));
            }
            // `-x<cmd>` and clusters such as `-ix` are `--exec` for rebase
            if subcommand == "rebase"
                && arg.starts_with('-')
                && !arg.starts_with("--")
                && arg.contains('x')
            {
                return Err(ExecutorError::rejected(line, "option -x is not allowed"));
            }
        }

        Ok(argv)
    }
}

/// The forbidden option `arg` names, if any.
///
/// git accepts any unambiguous prefix of a long option, so `--exe` and
/// `--upload-pac=...` count as the full names.
fn forbidden_long_option(arg: &str) -> Option<&'static str> {
    let name = arg.strip_prefix("--")?;
    let name = name.split('=').next().unwrap_or(name);
    if name.is_empty() {
        return None;
    }
    FORBIDDEN_OPTIONS
        .iter()
        .copied()
        .find(|option| option[2..].starts_with(name))
}

/// Split like a POSIX shell would for plain words and quotes, but refuse
/// anything that needs a shell to mean something.
fn split_command_line(line: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.trim().chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(ExecutorError::rejected(line, "unterminated quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch) => current.push(ch),
                            None => {
                                return Err(ExecutorError::rejected(line, "unterminated quote"))
                            }
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(ExecutorError::rejected(line, "unterminated quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(ch) => current.push(ch),
                    None => return Err(ExecutorError::rejected(line, "trailing backslash")),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c if SHELL_METACHARACTERS.contains(&c) => {
                return Err(ExecutorError::rejected(
                    line,
                    format!("shell metacharacter '{}'", c),
                ));
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        args.push(current);
    }
    Ok(args)
}
