//! Terminal prompter backed by dialoguer.

use dialoguer::{Confirm, Input, Select};

use forge_core::{PromptError, Prompter, Question, Value, Variables};

#[derive(Debug, Clone, Copy, Default)]
pub struct DialoguerPrompter;

impl DialoguerPrompter {
    pub fn new() -> Self {
        Self
    }
}

fn interaction(e: dialoguer::Error) -> PromptError {
    PromptError::Interaction(e.to_string())
}

impl Prompter for DialoguerPrompter {
    fn ask(&mut self, questions: &[Question], answers: &mut Variables) -> Result<(), PromptError> {
        for question in questions {
            let answer = match question {
                Question::Select {
                    message,
                    choices,
                    initial,
                    ..
                } => {
                    let titles: Vec<&str> = choices.iter().map(|c| c.title.as_str()).collect();
                    let picked = Select::new()
                        .with_prompt(message)
                        .items(&titles)
                        .default(*initial)
                        .interact()
                        .map_err(interaction)?;
                    let choice = choices.get(picked).ok_or_else(|| {
                        PromptError::InvalidChoice {
                            name: question.name().to_string(),
                            answer: picked.to_string(),
                        }
                    })?;
                    Value::String(choice.value.clone())
                }
                Question::Input {
                    message, default, ..
                } => {
                    let mut input = Input::<String>::new().with_prompt(message);
                    if let Some(default) = default {
                        input = input.default(default.clone());
                    }
                    Value::String(input.interact_text().map_err(interaction)?)
                }
                Question::Confirm {
                    message, default, ..
                } => Value::Bool(
                    Confirm::new()
                        .with_prompt(message)
                        .default(*default)
                        .interact()
                        .map_err(interaction)?,
                ),
            };
            answers.insert(question.name().to_string(), answer);
        }
        Ok(())
    }
}
