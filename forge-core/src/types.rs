//! Domain types for a forge run.
//!
//! All string forms (`as_str`, `Display`, `FromStr`, serde) share one spelling
//! per variant so menus, config files and comparisons can never drift apart.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for the task a forge run executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskName(pub String);

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaskName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// One phase of the fixed run sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Init,
    Prompt,
    Write,
    Conflicts,
    Commit,
    Rollback,
    End,
}

impl Stage {
    /// All stages in pipeline order.
    pub fn all() -> &'static [Stage] {
        &[
            Stage::Init,
            Stage::Prompt,
            Stage::Write,
            Stage::Conflicts,
            Stage::Commit,
            Stage::Rollback,
            Stage::End,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Prompt => "prompt",
            Stage::Write => "write",
            Stage::Conflicts => "conflicts",
            Stage::Commit => "commit",
            Stage::Rollback => "rollback",
            Stage::End => "end",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

/// Kind of a staged entry. Part of the staging index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Directory => "directory",
            EntryKind::File => "file",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConflictPolicy
// ---------------------------------------------------------------------------

/// How a pre-existing target file with different content is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Prompt the operator.
    #[default]
    Ask,
    /// Keep the destination as it is.
    Ignore,
    /// Overwrite the destination.
    Replace,
    /// Fail the run (and roll back).
    Throw,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::Ask => "ask",
            ConflictPolicy::Ignore => "ignore",
            ConflictPolicy::Replace => "replace",
            ConflictPolicy::Throw => "throw",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ask" => Ok(ConflictPolicy::Ask),
            "ignore" => Ok(ConflictPolicy::Ignore),
            "replace" => Ok(ConflictPolicy::Replace),
            "throw" => Ok(ConflictPolicy::Throw),
            other => Err(format!(
                "unknown conflict policy '{other}'; expected: ask, ignore, replace, throw"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// ConflictChoice
// ---------------------------------------------------------------------------

/// Operator answer to an interactive conflict prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictChoice {
    Replace,
    Ignore,
    Stop,
    Rollback,
}

impl ConflictChoice {
    /// Menu order; the first entry is the default selection.
    pub fn all() -> &'static [ConflictChoice] {
        &[
            ConflictChoice::Replace,
            ConflictChoice::Ignore,
            ConflictChoice::Stop,
            ConflictChoice::Rollback,
        ]
    }

    /// Value stored in the answer map.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictChoice::Replace => "replace",
            ConflictChoice::Ignore => "ignore",
            ConflictChoice::Stop => "stop",
            ConflictChoice::Rollback => "rollback",
        }
    }

    /// Label shown in the menu.
    pub fn title(&self) -> &'static str {
        match self {
            ConflictChoice::Replace => "Replace",
            ConflictChoice::Ignore => "Ignore",
            ConflictChoice::Stop => "Stop Execution",
            ConflictChoice::Rollback => "Rollback",
        }
    }
}

impl fmt::Display for ConflictChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConflictChoice::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown conflict choice '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// WriteOptions
// ---------------------------------------------------------------------------

/// Per-operation options accepted by every staging write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Policy applied when the target already exists with other content.
    pub if_file_exists: Option<ConflictPolicy>,
    /// Mark the staged file approved immediately, bypassing conflict checks.
    pub approve: bool,
}

impl WriteOptions {
    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self {
            if_file_exists: Some(policy),
            approve: false,
        }
    }

    pub fn approved() -> Self {
        Self {
            if_file_exists: None,
            approve: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_choice_spelling_round_trips() {
        for choice in ConflictChoice::all() {
            let parsed: ConflictChoice = choice.as_str().parse().unwrap();
            assert_eq!(parsed, *choice);
        }
        assert!("rolback".parse::<ConflictChoice>().is_err());
    }

    #[test]
    fn conflict_policy_parses_case_insensitively() {
        assert_eq!("THROW".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Throw);
        assert!("overwrite".parse::<ConflictPolicy>().is_err());
    }

    #[test]
    fn stage_order_starts_with_init_and_ends_with_end() {
        let all = Stage::all();
        assert_eq!(all.first(), Some(&Stage::Init));
        assert_eq!(all.last(), Some(&Stage::End));
        assert_eq!(Stage::Conflicts.to_string(), "conflicts");
    }
}
