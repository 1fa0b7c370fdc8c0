//! Conflict resolution between staged files and the real target tree.
//!
//! For each staged file:
//!
//! | Target on disk          | Policy          | Outcome                     |
//! |-------------------------|-----------------|-----------------------------|
//! | missing                 | any             | approved                    |
//! | same bytes as the blob  | any             | left unapproved (no write)  |
//! | different               | `replace`       | approved                    |
//! | different               | `ignore`        | left unapproved             |
//! | different               | `throw`         | [`StagingError::Conflict`]  |
//! | different               | `ask` / none    | operator chooses            |
//!
//! An operator choice of Stop or Rollback ends the scan immediately and is
//! reported back as a [`Resolution`] for the pipeline to act on.

use std::path::Path;

use forge_core::{Choice, ConflictChoice, ConflictPolicy, EntryKind, Prompter, Question, Variables};

use crate::equality::files_equal;
use crate::error::StagingError;
use crate::index::{EntryFilter, StagingEntry};
use crate::temp_area::TempArea;

/// Answer key of the conflict question.
pub const ACTION_KEY: &str = "action";

/// Per-outcome counts of a completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictSummary {
    /// Approved because the target did not exist yet.
    pub created: usize,
    /// Approved over existing, different content.
    pub replaced: usize,
    /// Target already held the staged bytes.
    pub identical: usize,
    /// Existing target kept by policy or operator choice.
    pub ignored: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Every staged file has a disposition.
    Completed(ConflictSummary),
    /// The operator chose Rollback.
    RollbackRequested,
    /// The operator chose Stop Execution.
    StopRequested,
}

/// Scan every staged file and decide whether commit may write it.
pub fn resolve_conflicts(
    area: &mut TempArea,
    prompter: &mut dyn Prompter,
) -> Result<Resolution, StagingError> {
    let mut summary = ConflictSummary::default();

    for entry in area.entries(EntryFilter::kind(EntryKind::File))? {
        let entry = entry?;
        let target = entry.target_path.as_path();

        if !target.exists() {
            area.approve(target)?;
            summary.created += 1;
            continue;
        }

        if is_identical(&entry)? {
            tracing::debug!(path = %target.display(), "target already up to date");
            summary.identical += 1;
            continue;
        }

        let choice = match entry.conflict_policy {
            Some(ConflictPolicy::Replace) => ConflictChoice::Replace,
            Some(ConflictPolicy::Ignore) => ConflictChoice::Ignore,
            Some(ConflictPolicy::Throw) => {
                return Err(StagingError::Conflict {
                    path: target.to_path_buf(),
                })
            }
            Some(ConflictPolicy::Ask) | None => ask(prompter, target)?,
        };

        tracing::debug!(path = %target.display(), choice = %choice, "conflict resolved");
        match choice {
            ConflictChoice::Replace => {
                area.approve(target)?;
                summary.replaced += 1;
            }
            ConflictChoice::Ignore => summary.ignored += 1,
            ConflictChoice::Stop => return Ok(Resolution::StopRequested),
            ConflictChoice::Rollback => return Ok(Resolution::RollbackRequested),
        }
    }

    tracing::info!(
        created = summary.created,
        replaced = summary.replaced,
        identical = summary.identical,
        ignored = summary.ignored,
        "conflicts resolved"
    );
    Ok(Resolution::Completed(summary))
}

/// An existing directory at a file's target is never "identical".
fn is_identical(entry: &StagingEntry) -> Result<bool, StagingError> {
    let Some(blob) = entry.blob_path.as_deref() else {
        return Ok(false);
    };
    if entry.target_path.is_dir() {
        return Ok(false);
    }
    files_equal(&entry.target_path, blob)
}

/// The conflict menu; the first choice is the default.
pub fn conflict_question(target: &Path) -> Question {
    Question::Select {
        name: ACTION_KEY.to_string(),
        message: format!("The file '{}' already exists\nSelect your action:", target.display()),
        choices: ConflictChoice::all()
            .iter()
            .map(|c| Choice::new(c.title(), c.as_str()))
            .collect(),
        initial: 0,
    }
}

fn ask(prompter: &mut dyn Prompter, target: &Path) -> Result<ConflictChoice, StagingError> {
    let mut answers = Variables::new();
    prompter.ask(&[conflict_question(target)], &mut answers)?;

    let answer = answers
        .get(ACTION_KEY)
        .map(|v| v.to_string())
        .unwrap_or_default();
    answer
        .parse::<ConflictChoice>()
        .map_err(|_| StagingError::ResolutionNotImplemented {
            path: target.to_path_buf(),
            answer,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{PromptError, ScriptedPrompter, Value, WriteOptions};
    use forge_renderer::TeraInjector;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        area: TempArea,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let area = TempArea::new(tmp.path().join("run"), Arc::new(TeraInjector::new()));
            std::fs::create_dir_all(tmp.path().join("proj")).unwrap();
            Self { tmp, area }
        }

        fn target(&self, name: &str) -> std::path::PathBuf {
            self.tmp.path().join("proj").join(name)
        }

        fn approved(&mut self, name: &str) -> bool {
            let target = self.target(name);
            self.area
                .get(&target, EntryKind::File)
                .unwrap()
                .unwrap()
                .approved
        }
    }

    /// Answers with something outside the menu, bypassing validation.
    struct RawPrompter(&'static str);

    impl Prompter for RawPrompter {
        fn ask(&mut self, questions: &[Question], answers: &mut Variables) -> Result<(), PromptError> {
            answers.insert(questions[0].name().to_string(), Value::from(self.0));
            Ok(())
        }
    }

    #[test]
    fn missing_target_is_approved_without_prompt() {
        let mut fx = Fixture::new();
        let target = fx.target("new.txt");
        fx.area.write_file(&target, b"hello", WriteOptions::default()).unwrap();

        let mut prompter = ScriptedPrompter::default();
        let res = resolve_conflicts(&mut fx.area, &mut prompter).unwrap();
        assert!(matches!(res, Resolution::Completed(s) if s.created == 1));
        assert!(prompter.asked().is_empty());
        assert!(fx.approved("new.txt"));
    }

    #[test]
    fn identical_content_stays_unapproved_without_prompt() {
        let mut fx = Fixture::new();
        let target = fx.target("same.txt");
        std::fs::write(&target, b"hello").unwrap();
        fx.area.write_file(&target, b"hello", WriteOptions::default()).unwrap();

        let mut prompter = ScriptedPrompter::default();
        let res = resolve_conflicts(&mut fx.area, &mut prompter).unwrap();
        assert!(matches!(res, Resolution::Completed(s) if s.identical == 1));
        assert!(prompter.asked().is_empty());
        assert!(!fx.approved("same.txt"));
    }

    #[test]
    fn policies_apply_without_prompting() {
        let mut fx = Fixture::new();
        for name in ["r.txt", "i.txt"] {
            std::fs::write(fx.target(name), b"old").unwrap();
        }
        let r = fx.target("r.txt");
        let i = fx.target("i.txt");
        fx.area.write_file(&r, b"new", WriteOptions::with_policy(ConflictPolicy::Replace)).unwrap();
        fx.area.write_file(&i, b"new", WriteOptions::with_policy(ConflictPolicy::Ignore)).unwrap();

        let mut prompter = ScriptedPrompter::default();
        let res = resolve_conflicts(&mut fx.area, &mut prompter).unwrap();
        assert_eq!(
            res,
            Resolution::Completed(ConflictSummary {
                replaced: 1,
                ignored: 1,
                ..Default::default()
            })
        );
        assert!(fx.approved("r.txt"));
        assert!(!fx.approved("i.txt"));
    }

    #[test]
    fn throw_policy_is_a_conflict_error() {
        let mut fx = Fixture::new();
        let target = fx.target("app.txt");
        std::fs::write(&target, b"world").unwrap();
        fx.area.write_file(&target, b"hello", WriteOptions::with_policy(ConflictPolicy::Throw)).unwrap();

        let err = resolve_conflicts(&mut fx.area, &mut ScriptedPrompter::default()).unwrap_err();
        assert!(matches!(err, StagingError::Conflict { ref path } if path == &target));
    }

    #[test]
    fn ask_prompts_with_four_choices() {
        let mut fx = Fixture::new();
        let target = fx.target("app.txt");
        std::fs::write(&target, b"world").unwrap();
        fx.area.write_file(&target, b"hello", WriteOptions::default()).unwrap();

        let mut prompter = ScriptedPrompter::new(["replace"]);
        resolve_conflicts(&mut fx.area, &mut prompter).unwrap();
        assert_eq!(prompter.asked().len(), 1);
        assert!(prompter.asked()[0].contains("already exists"));
        assert!(fx.approved("app.txt"));

        let Question::Select { choices, .. } = conflict_question(&target) else {
            panic!("conflict question must be a select");
        };
        let titles: Vec<_> = choices.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["Replace", "Ignore", "Stop Execution", "Rollback"]);
    }

    #[test]
    fn rollback_and_stop_choices_end_the_scan() {
        for (answer, expected) in [
            ("rollback", Resolution::RollbackRequested),
            ("stop", Resolution::StopRequested),
        ] {
            let mut fx = Fixture::new();
            let target = fx.target("app.txt");
            std::fs::write(&target, b"world").unwrap();
            fx.area.write_file(&target, b"hello", WriteOptions::default()).unwrap();

            let mut prompter = ScriptedPrompter::new([answer]);
            assert_eq!(resolve_conflicts(&mut fx.area, &mut prompter).unwrap(), expected);
        }
    }

    #[test]
    fn unknown_answer_is_not_implemented() {
        let mut fx = Fixture::new();
        let target = fx.target("app.txt");
        std::fs::write(&target, b"world").unwrap();
        fx.area.write_file(&target, b"hello", WriteOptions::default()).unwrap();

        let err = resolve_conflicts(&mut fx.area, &mut RawPrompter("rolback")).unwrap_err();
        assert!(matches!(
            err,
            StagingError::ResolutionNotImplemented { ref answer, .. } if answer == "rolback"
        ));
    }

    #[test]
    fn directory_at_file_target_is_a_conflict() {
        let mut fx = Fixture::new();
        let target = fx.target("occupied");
        std::fs::create_dir_all(&target).unwrap();
        fx.area.write_file(&target, b"x", WriteOptions::with_policy(ConflictPolicy::Throw)).unwrap();

        let err = resolve_conflicts(&mut fx.area, &mut ScriptedPrompter::default()).unwrap_err();
        assert!(matches!(err, StagingError::Conflict { .. }));
    }
}
