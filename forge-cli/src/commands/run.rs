//! `forge run` — render a template directory into a project.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use forge_core::{ConflictChoice, ConflictPolicy, ScriptedPrompter, Stage, Value, Variables, WriteOptions};
use forge_runner::{DialoguerPrompter, Forge, RunOutcome, Runner};
use forge_stage::CommitSummary;

/// Arguments for `forge run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory holding the templates to render.
    pub template: PathBuf,

    /// Project directory to generate into.
    #[arg(long, default_value = ".")]
    pub target: PathBuf,

    /// Task name used for task-scoped config values. Defaults to the
    /// template directory name.
    #[arg(long)]
    pub task: Option<String>,

    /// Template variable, repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// What to do when a generated file already exists with other content.
    #[arg(long, value_name = "POLICY")]
    pub if_exists: Option<ConflictPolicy>,

    /// Answer every conflict prompt with Replace.
    #[arg(short, long)]
    pub yes: bool,

    /// Do not search for a project config above the target.
    #[arg(long)]
    pub no_config: bool,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let variables = parse_vars(&self.vars)?;
        let task = self.task.clone().unwrap_or_else(|| {
            self.template
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "default".to_string())
        });

        let builder = Forge::builder(task.clone())
            .source(&self.template)
            .target(&self.target)
            .variables(variables);
        let forge = if self.yes {
            builder
                .prompter(ScriptedPrompter::default().with_fallback(ConflictChoice::Replace.as_str()))
                .build()
        } else {
            builder.prompter(DialoguerPrompter::new()).build()
        };

        let template = forge.paths().source().to_path_buf();
        let opts = WriteOptions {
            if_file_exists: self.if_exists,
            approve: false,
        };

        let mut runner = Runner::new(forge);
        runner
            .load_config(!self.no_config)
            .validate_command(move |_forge| {
                if template.is_dir() {
                    Ok(())
                } else {
                    Err(format!("template directory '{}' does not exist", template.display()))
                }
            })
            .on(Stage::Write, move |forge| {
                let variables = forge.variables();
                let staged = forge.staging()?.inject(&["**/*"], &variables, opts)?;
                report_empty_template(staged);
                Ok(())
            });

        let outcome = runner.run().with_context(|| format!("run failed for '{task}'"))?;
        let target = runner.forge().paths().target().display().to_string();
        match outcome {
            RunOutcome::Committed(summary) => print_committed(&task, &target, &summary),
            RunOutcome::RolledBack { stage, reason } => {
                println!(
                    "{} '{task}' rolled back during '{stage}': {reason}",
                    "✗".red()
                );
            }
            RunOutcome::Stopped => {}
        }
        Ok(())
    }
}

fn parse_vars(raw: &[String]) -> Result<Variables> {
    let mut variables = Variables::new();
    for item in raw {
        let (key, value): (String, Value) = Value::parse_assignment(item)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("invalid --var '{item}'"))?;
        variables.insert(key, value);
    }
    Ok(variables)
}

fn report_empty_template(staged: usize) {
    if staged == 0 {
        println!("{}", "template directory is empty, nothing to stage".yellow());
    }
}

fn print_committed(task: &str, target: &str, summary: &CommitSummary) {
    if summary.files == 0 && summary.directories == 0 {
        println!("✓ '{task}' — nothing to do");
        return;
    }
    println!(
        "✓ '{task}' generated into {target} ({} files written, {} directories, {} kept)",
        summary.files, summary.directories, summary.unapproved
    );
}
