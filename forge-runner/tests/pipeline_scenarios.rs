use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use assert_fs::prelude::*;
use assert_fs::TempDir;
use forge_core::{ConflictPolicy, Scope, ScriptedPrompter, Stage, Value, WriteOptions, CONFIG_FILE_NAME};
use forge_runner::{is_locked, Forge, RunError, RunLock, RunOutcome, Runner, LOCK_FILE_NAME};
use predicates::prelude::*;
use rstest::rstest;

struct Fixture {
    tmp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().expect("tmp");
        tmp.child("template").create_dir_all().expect("template");
        tmp.child("proj").create_dir_all().expect("proj");
        Self { tmp }
    }

    fn runner(&self, answers: &[&str]) -> Runner {
        let forge = Forge::builder("test")
            .source(self.tmp.child("template").path())
            .target(self.tmp.child("proj").path())
            .temp(self.tmp.child("run").path())
            .prompter(ScriptedPrompter::new(answers.iter().copied()))
            .build();
        let mut runner = Runner::new(forge);
        runner.load_config(false);
        runner
    }
}

/// Records every stage event reached.
fn record_stages(runner: &mut Runner) -> Rc<RefCell<Vec<Stage>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for &stage in Stage::all() {
        let log = Rc::clone(&log);
        runner.on(stage, move |_forge| {
            log.borrow_mut().push(stage);
            Ok(())
        });
    }
    log
}

fn stage_file(runner: &mut Runner, path: &'static str, content: &'static str, opts: WriteOptions) {
    runner.on(Stage::Write, move |forge| {
        forge.staging()?.write_file(path, content, opts)?;
        Ok(())
    });
}

#[test]
fn new_file_is_committed_and_temp_root_removed() {
    let fx = Fixture::new();
    let mut runner = fx.runner(&[]);
    let stages = record_stages(&mut runner);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::default());

    let outcome = runner.run().expect("run");
    assert!(matches!(outcome, RunOutcome::Committed(s) if s.files == 1));
    fx.tmp.child("proj/app.txt").assert("hello");
    fx.tmp.child("run").assert(predicate::path::missing());
    assert_eq!(
        *stages.borrow(),
        vec![Stage::Init, Stage::Prompt, Stage::Write, Stage::Conflicts, Stage::Commit, Stage::End]
    );
}

#[test]
fn identical_content_commits_without_prompt_or_write() {
    let fx = Fixture::new();
    fx.tmp.child("proj/app.txt").write_str("hello").expect("seed");
    // No scripted answers: any prompt would fail the run.
    let mut runner = fx.runner(&[]);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::default());

    let outcome = runner.run().expect("run");
    assert!(matches!(outcome, RunOutcome::Committed(s) if s.files == 0 && s.unapproved == 1));
    fx.tmp.child("proj/app.txt").assert("hello");
    fx.tmp.child("run").assert(predicate::path::missing());
}

#[test]
fn throw_policy_rolls_back_and_keeps_target() {
    let fx = Fixture::new();
    fx.tmp.child("proj/app.txt").write_str("world").expect("seed");
    let mut runner = fx.runner(&[]);
    let stages = record_stages(&mut runner);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::with_policy(ConflictPolicy::Throw));
    stage_file(&mut runner, "other.txt", "other", WriteOptions::approved());

    let outcome = runner.run().expect("run");
    match outcome {
        RunOutcome::RolledBack { stage, reason } => {
            assert_eq!(stage, Stage::Conflicts);
            assert!(reason.contains("already exists"), "{reason}");
        }
        other => panic!("expected rollback, got {other:?}"),
    }
    fx.tmp.child("proj/app.txt").assert("world");
    fx.tmp.child("proj/other.txt").assert(predicate::path::missing());
    fx.tmp.child("run").assert(predicate::path::missing());
    assert_eq!(
        *stages.borrow(),
        vec![Stage::Init, Stage::Prompt, Stage::Write, Stage::Rollback, Stage::End]
    );
}

#[test]
fn reverse_ordered_directories_are_created() {
    let fx = Fixture::new();
    let mut runner = fx.runner(&[]);
    runner.on(Stage::Write, |forge| {
        let staging = forge.staging()?;
        staging.ensure_directory("a/b/c")?;
        staging.ensure_directory("a/b")?;
        Ok(())
    });

    assert!(matches!(runner.run().expect("run"), RunOutcome::Committed(_)));
    fx.tmp.child("proj/a/b").assert(predicate::path::is_dir());
    fx.tmp.child("proj/a/b/c").assert(predicate::path::is_dir());
}

#[test]
fn rollback_choice_skips_commit_and_conflicts_event() {
    let fx = Fixture::new();
    fx.tmp.child("proj/app.txt").write_str("world").expect("seed");
    let mut runner = fx.runner(&["rollback"]);
    let stages = record_stages(&mut runner);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::default());
    stage_file(&mut runner, "fresh.txt", "fresh", WriteOptions::default());

    let outcome = runner.run().expect("run");
    assert!(matches!(outcome, RunOutcome::RolledBack { stage: Stage::Conflicts, .. }));
    fx.tmp.child("proj/app.txt").assert("world");
    fx.tmp.child("proj/fresh.txt").assert(predicate::path::missing());
    assert_eq!(
        *stages.borrow(),
        vec![Stage::Init, Stage::Prompt, Stage::Write, Stage::Rollback, Stage::End]
    );
}

#[rstest]
#[case(ConflictPolicy::Replace, "hello")]
#[case(ConflictPolicy::Ignore, "world")]
fn declared_policy_decides_without_prompt(#[case] policy: ConflictPolicy, #[case] expected: &str) {
    let fx = Fixture::new();
    fx.tmp.child("proj/app.txt").write_str("world").expect("seed");
    let mut runner = fx.runner(&[]);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::with_policy(policy));

    assert!(matches!(runner.run().expect("run"), RunOutcome::Committed(_)));
    fx.tmp.child("proj/app.txt").assert(expected);
}

#[test]
fn replace_choice_overwrites_target() {
    let fx = Fixture::new();
    fx.tmp.child("proj/app.txt").write_str("world").expect("seed");
    let mut runner = fx.runner(&["replace"]);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::default());

    assert!(matches!(runner.run().expect("run"), RunOutcome::Committed(s) if s.files == 1));
    fx.tmp.child("proj/app.txt").assert("hello");
}

#[test]
fn stop_choice_cleans_up_without_rollback_or_end_events() {
    let fx = Fixture::new();
    fx.tmp.child("proj/app.txt").write_str("world").expect("seed");
    let mut runner = fx.runner(&["stop"]);
    let stages = record_stages(&mut runner);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::default());

    assert_eq!(runner.run().expect("run"), RunOutcome::Stopped);
    fx.tmp.child("proj/app.txt").assert("world");
    fx.tmp.child("run").assert(predicate::path::missing());
    assert_eq!(
        *stages.borrow(),
        vec![Stage::Init, Stage::Prompt, Stage::Write]
    );

    // The lock was released: a new run over the same temp root succeeds.
    let mut again = fx.runner(&["replace"]);
    stage_file(&mut again, "app.txt", "hello", WriteOptions::default());
    assert!(matches!(again.run().expect("second run"), RunOutcome::Committed(_)));
}

#[test]
fn failing_write_listener_rolls_back_staged_files() {
    let fx = Fixture::new();
    let mut runner = fx.runner(&[]);
    stage_file(&mut runner, "first.txt", "1", WriteOptions::approved());
    runner.on(Stage::Write, |_forge| {
        Err(RunError::Listener {
            stage: Stage::Write,
            message: "template missing".into(),
        })
    });

    let outcome = runner.run().expect("run");
    assert!(matches!(outcome, RunOutcome::RolledBack { stage: Stage::Write, ref reason } if reason.contains("template missing")));
    fx.tmp.child("proj/first.txt").assert(predicate::path::missing());
    fx.tmp.child("run").assert(predicate::path::missing());
}

#[test]
fn failure_after_commit_reports_instead_of_rolling_back() {
    let fx = Fixture::new();
    let mut runner = fx.runner(&[]);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::default());
    runner.on(Stage::Commit, |_forge| {
        Err(RunError::Listener {
            stage: Stage::Commit,
            message: "post-commit hook".into(),
        })
    });

    let outcome = runner.run().expect("run");
    assert!(matches!(outcome, RunOutcome::RolledBack { stage: Stage::Commit, .. }));
    fx.tmp.child("proj/app.txt").assert("hello");
    assert!(runner.forge_mut().staging().expect("staging").is_disposed());
}

#[test]
fn init_listener_failure_aborts_after_cleanup() {
    let fx = Fixture::new();
    let mut runner = fx.runner(&[]);
    let stages = record_stages(&mut runner);
    runner.on(Stage::Init, |_forge| {
        Err(RunError::Listener {
            stage: Stage::Init,
            message: "no".into(),
        })
    });

    let err = runner.run().expect_err("init fails");
    assert!(matches!(err, RunError::Listener { stage: Stage::Init, .. }));
    assert_eq!(*stages.borrow(), vec![Stage::Init, Stage::End]);
    fx.tmp.child("run").assert(predicate::path::missing());
}

#[test]
fn invalid_option_aborts_before_staging_exists() {
    let fx = Fixture::new();
    let forge = Forge::builder("test")
        .target(fx.tmp.child("proj").path())
        .temp(fx.tmp.child("run").path())
        .option("port", Value::from("eighty"))
        .prompter(ScriptedPrompter::default())
        .build();
    let mut runner = Runner::new(forge);
    runner.load_config(false).validate_options(|name, value| match (name, value) {
        ("port", Value::Integer(_)) => Ok(()),
        ("port", _) => Err("expected a number".into()),
        _ => Ok(()),
    });

    let err = runner.run().expect_err("validation");
    assert!(matches!(err, RunError::InvalidOption { ref name, .. } if name == "port"));
    assert!(err.to_string().contains("expected a number"));
    fx.tmp.child("run").assert(predicate::path::missing());
}

#[test]
fn invalid_command_aborts_before_staging_exists() {
    let fx = Fixture::new();
    let mut runner = fx.runner(&[]);
    runner.validate_command(|forge| {
        if forge.option("name").is_none() {
            return Err("missing required option 'name'".into());
        }
        Ok(())
    });

    let err = runner.run().expect_err("validation");
    assert!(matches!(err, RunError::InvalidCommand(_)));
    fx.tmp.child("run").assert(predicate::path::missing());
}

#[test]
fn held_lock_refuses_second_run_and_leaves_it_alone() {
    let fx = Fixture::new();
    fx.tmp.child("run").create_dir_all().expect("run dir");
    let lock_path = fx.tmp.child("run").child(LOCK_FILE_NAME);
    let held = RunLock::acquire(lock_path.path()).expect("first lock");

    let mut runner = fx.runner(&[]);
    stage_file(&mut runner, "app.txt", "hello", WriteOptions::default());
    let err = runner.run().expect_err("locked");
    assert!(matches!(err, RunError::Locked { .. }));
    lock_path.assert(predicate::path::exists());
    assert!(is_locked(lock_path.path()));
    fx.tmp.child("proj/app.txt").assert(predicate::path::missing());

    held.release().expect("release");
}

#[test]
fn project_config_redirects_target_and_saves_changes() {
    let fx = Fixture::new();
    fx.tmp
        .child("proj")
        .child(CONFIG_FILE_NAME)
        .write_str(r#"{ "project": { "name": "billing" }, "tasks": {} }"#)
        .expect("config");
    fx.tmp.child("proj/sub/dir").create_dir_all().expect("sub");

    let forge = Forge::builder("service")
        .target(fx.tmp.child("proj/sub/dir").path())
        .temp(fx.tmp.child("run").path())
        .prompter(ScriptedPrompter::default())
        .build();
    let mut runner = Runner::new(forge);
    runner.on(Stage::Write, |forge| {
        let name = forge.variable("name").map(|v| v.to_string()).unwrap_or_default();
        forge.config_mut().set("generated", true, Scope::Task);
        forge.staging()?.write_file("NAME", name, WriteOptions::default())?;
        Ok(())
    });

    assert!(matches!(runner.run().expect("run"), RunOutcome::Committed(_)));
    fx.tmp.child("proj/NAME").assert("billing");
    let saved = fs::read_to_string(fx.tmp.child("proj").child(CONFIG_FILE_NAME).path()).expect("read");
    assert!(saved.contains("\"generated\": true"), "{saved}");
    assert!(saved.contains("\"service\""), "{saved}");
}
