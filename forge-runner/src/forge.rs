//! Per-run context handed to every listener.

use std::path::{Path, PathBuf};

use forge_core::{
    ConfigOptions, ForgePaths, ProjectConfig, Prompter, Question, Scope, Stage, TaskName, Value,
    Variables,
};
use forge_stage::StagingArea;

use crate::error::RunError;
use crate::paths::new_execution_dir;
use crate::prompt_tty::DialoguerPrompter;

/// Which layers feed [`Forge::variables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariablesOptions {
    /// Include project then task values from the project config.
    pub merge_config_values: bool,
    /// Include program options.
    pub merge_program_options: bool,
}

impl Default for VariablesOptions {
    fn default() -> Self {
        Self {
            merge_config_values: true,
            merge_program_options: true,
        }
    }
}

/// State of one run: paths, variables, config, staging and the prompter.
pub struct Forge {
    task: TaskName,
    pub(crate) stage: Stage,
    pub(crate) paths: ForgePaths,
    options: Variables,
    variables: Variables,
    pub(crate) config: ProjectConfig,
    pub(crate) variables_options: VariablesOptions,
    pub(crate) staging: Option<StagingArea>,
    pub(crate) prompter: Box<dyn Prompter>,
}

impl Forge {
    pub fn builder(task: impl Into<TaskName>) -> ForgeBuilder {
        ForgeBuilder::new(task.into())
    }

    pub fn task(&self) -> &TaskName {
        &self.task
    }

    /// Stage currently executing.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn paths(&self) -> &ForgePaths {
        &self.paths
    }

    /// Program options as given on the command line.
    pub fn options(&self) -> &Variables {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Effective variables: project config, task config, program options,
    /// then run variables. Later layers win.
    pub fn variables(&self) -> Variables {
        let mut merged = Variables::new();
        if self.variables_options.merge_config_values {
            merged.extend(self.config.values(Scope::Project));
            merged.extend(self.config.values(Scope::Task));
        }
        if self.variables_options.merge_program_options {
            merged.extend(self.options.clone());
        }
        merged.extend(self.variables.clone());
        merged
    }

    pub fn variable(&self, name: &str) -> Option<Value> {
        self.variables().remove(name)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn set_variables(&mut self, values: Variables) {
        self.variables.extend(values);
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    /// Staging façade; available from `init` until the end of the run.
    pub fn staging(&mut self) -> Result<&mut StagingArea, RunError> {
        let stage = self.stage;
        self.staging.as_mut().ok_or(RunError::NotReady(stage))
    }

    pub fn prompter(&mut self) -> &mut dyn Prompter {
        self.prompter.as_mut()
    }

    /// Ask `questions` and keep the answers as run variables.
    pub fn prompt(&mut self, questions: &[Question]) -> Result<Variables, RunError> {
        let mut answers = Variables::new();
        self.prompter.ask(questions, &mut answers)?;
        self.variables.extend(answers.clone());
        Ok(answers)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct ForgeBuilder {
    task: TaskName,
    root: Option<PathBuf>,
    source: Option<PathBuf>,
    target: Option<PathBuf>,
    temp: Option<PathBuf>,
    options: Variables,
    variables: Variables,
    config_options: ConfigOptions,
    variables_options: VariablesOptions,
    prompter: Option<Box<dyn Prompter>>,
}

impl ForgeBuilder {
    fn new(task: TaskName) -> Self {
        Self {
            task,
            root: None,
            source: None,
            target: None,
            temp: None,
            options: Variables::new(),
            variables: Variables::new(),
            config_options: ConfigOptions::default(),
            variables_options: VariablesOptions::default(),
            prompter: None,
        }
    }

    /// Generator directory. Defaults to the source directory.
    pub fn root(mut self, dir: impl AsRef<Path>) -> Self {
        self.root = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Template directory. Defaults to the current directory.
    pub fn source(mut self, dir: impl AsRef<Path>) -> Self {
        self.source = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Project directory. Defaults to the current directory.
    pub fn target(mut self, dir: impl AsRef<Path>) -> Self {
        self.target = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Staging root. Defaults to a fresh directory under the executions root.
    pub fn temp(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn variables(mut self, values: Variables) -> Self {
        self.variables.extend(values);
        self
    }

    pub fn config_options(mut self, options: ConfigOptions) -> Self {
        self.config_options = options;
        self
    }

    pub fn variables_options(mut self, options: VariablesOptions) -> Self {
        self.variables_options = options;
        self
    }

    pub fn prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Some(Box::new(prompter));
        self
    }

    pub fn build(self) -> Forge {
        let source = self.source.unwrap_or_else(|| PathBuf::from("."));
        let root = self.root.unwrap_or_else(|| source.clone());
        let target = self.target.unwrap_or_else(|| PathBuf::from("."));
        let temp = self.temp.unwrap_or_else(new_execution_dir);

        let mut config = ProjectConfig::new(self.task.clone());
        config.options = self.config_options;

        Forge {
            task: self.task,
            stage: Stage::Init,
            paths: ForgePaths::new(root, source, target, temp),
            options: self.options,
            variables: self.variables,
            config,
            variables_options: self.variables_options,
            staging: None,
            prompter: self
                .prompter
                .unwrap_or_else(|| Box::new(DialoguerPrompter::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::ScriptedPrompter;

    #[test]
    fn later_layers_win_when_merging() {
        let mut forge = Forge::builder("api")
            .option("name", "from-option")
            .option("port", Value::Integer(80))
            .build();
        forge.config.set("name", "from-project", Scope::Project);
        forge.config.set("db", "pg", Scope::Project);
        forge.config.set("db", "sqlite", Scope::Task);
        forge.set_variable("port", Value::Integer(8080));

        let vars = forge.variables();
        assert_eq!(vars["name"], Value::from("from-option"));
        assert_eq!(vars["db"], Value::from("sqlite"));
        assert_eq!(vars["port"], Value::Integer(8080));
    }

    #[test]
    fn merge_layers_can_be_switched_off() {
        let mut forge = Forge::builder("api")
            .option("opt", true)
            .variables_options(VariablesOptions {
                merge_config_values: false,
                merge_program_options: false,
            })
            .build();
        forge.config.set("cfg", "x", Scope::Project);
        forge.set_variable("run", "y");

        let vars = forge.variables();
        assert_eq!(vars.len(), 1);
        assert!(vars.contains_key("run"));
    }

    #[test]
    fn staging_is_not_ready_before_init() {
        let mut forge = Forge::builder("api").build();
        assert!(matches!(forge.staging(), Err(RunError::NotReady(Stage::Init))));
    }

    #[test]
    fn prompt_answers_become_variables() {
        let mut forge = Forge::builder("api")
            .prompter(ScriptedPrompter::new(["billing"]))
            .build();
        let answers = forge
            .prompt(&[Question::Input {
                name: "service".into(),
                message: "Service name?".into(),
                default: None,
            }])
            .unwrap();
        assert_eq!(answers["service"], Value::from("billing"));
        assert_eq!(forge.variable("service"), Some(Value::from("billing")));
    }
}
