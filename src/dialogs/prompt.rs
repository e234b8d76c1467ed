//! Prompt dialogs that ask for one piece of input and end with it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::channels::{Activity, Reply};
use crate::error::DialogError;

use super::context::DialogContext;
use super::{Dialog, DialogTurnStatus};

/// What a prompt shows the user. Persisted with the prompt's instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOptions {
    pub prompt: String,
    /// Shown when the answer is not recognized; falls back to `prompt`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
}

impl PromptOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_retry(mut self, retry_prompt: impl Into<String>) -> Self {
        self.retry_prompt = Some(retry_prompt.into());
        self
    }

    pub fn with_choices(mut self, choices: Vec<String>) -> Self {
        self.choices = choices;
        self
    }

    /// Text to show, given whether this is a re-prompt.
    pub fn text(&self, retry: bool) -> &str {
        match (&self.retry_prompt, retry) {
            (Some(retry_prompt), true) => retry_prompt,
            _ => &self.prompt,
        }
    }
}

/// How a prompt renders its question and recognizes an answer.
pub trait Prompt: Send + Sync {
    fn render(&self, options: &PromptOptions, retry: bool) -> Reply;

    /// The answer carried by `activity`, or `None` to re-prompt.
    fn recognize(&self, activity: &Activity, options: &PromptOptions) -> Option<Value>;
}

/// Free text. Any message text is accepted as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextPrompt;

impl Prompt for TextPrompt {
    fn render(&self, options: &PromptOptions, retry: bool) -> Reply {
        Reply::text(options.text(retry))
    }

    fn recognize(&self, activity: &Activity, _options: &PromptOptions) -> Option<Value> {
        activity.text().map(|t| Value::String(t.to_string()))
    }
}

/// How strictly a [`ChoicePrompt`] checks the answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChoiceValidation {
    /// Only an offered choice is accepted. Surrounding whitespace and case
    /// are ignored; the canonical choice is returned.
    #[default]
    Strict,
    /// Only the exact text of an offered choice is accepted.
    Exact,
    /// Any text is accepted as the answer.
    AcceptAny,
}

/// A choice from a fixed list, rendered as suggested actions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChoicePrompt {
    validation: ChoiceValidation,
}

impl ChoicePrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// A choice prompt that matches case and whitespace exactly.
    pub fn exact() -> Self {
        Self {
            validation: ChoiceValidation::Exact,
        }
    }

    /// A choice prompt that accepts whatever the user types.
    pub fn lenient() -> Self {
        Self {
            validation: ChoiceValidation::AcceptAny,
        }
    }

    pub fn validation(&self) -> ChoiceValidation {
        self.validation
    }
}

impl Prompt for ChoicePrompt {
    fn render(&self, options: &PromptOptions, retry: bool) -> Reply {
        Reply::suggested_actions(options.text(retry), options.choices.clone())
    }

    fn recognize(&self, activity: &Activity, options: &PromptOptions) -> Option<Value> {
        let text = activity.text()?;
        match self.validation {
            ChoiceValidation::AcceptAny => Some(Value::String(text.to_string())),
            ChoiceValidation::Exact => options
                .choices
                .iter()
                .find(|c| c.as_str() == text)
                .map(|c| Value::String(c.clone())),
            ChoiceValidation::Strict => {
                let wanted = text.trim().to_lowercase();
                options
                    .choices
                    .iter()
                    .find(|c| c.as_str() == text)
                    .or_else(|| options.choices.iter().find(|c| c.to_lowercase() == wanted))
                    .map(|c| Value::String(c.clone()))
            }
        }
    }
}

/// Adapts a [`Prompt`] into a dialog registered under `id`.
///
/// The instance's cursor counts re-prompts.
pub struct PromptDialog<P> {
    id: String,
    prompt: P,
}

impl<P: Prompt> PromptDialog<P> {
    pub fn new(id: &str, prompt: P) -> Self {
        Self {
            id: id.to_string(),
            prompt,
        }
    }

    fn stored_options(&self, dc: &mut DialogContext<'_>) -> Result<PromptOptions, DialogError> {
        let value = dc.active_dialog_mut()?.options.clone().unwrap_or(Value::Null);
        self.parse_options(value)
    }

    fn parse_options(&self, value: Value) -> Result<PromptOptions, DialogError> {
        serde_json::from_value(value).map_err(|e| DialogError::InvalidOptions {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

impl<P: Prompt> Dialog for PromptDialog<P> {
    fn id(&self) -> &str {
        &self.id
    }

    fn begin(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnStatus, DialogError> {
        let value = options.ok_or_else(|| DialogError::InvalidOptions {
            id: self.id.clone(),
            reason: "a prompt needs options".to_string(),
        })?;
        let parsed = self.parse_options(value.clone())?;

        let instance = dc.active_dialog_mut()?;
        instance.cursor = 0;
        instance.options = Some(value);

        dc.send(self.prompt.render(&parsed, false));
        Ok(DialogTurnStatus::Waiting)
    }

    fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnStatus, DialogError> {
        let options = self.stored_options(dc)?;
        if let Some(answer) = self.prompt.recognize(dc.activity(), &options) {
            return dc.end_dialog(Some(answer));
        }

        let attempts = {
            let instance = dc.active_dialog_mut()?;
            instance.cursor += 1;
            instance.cursor
        };
        debug!(prompt = %self.id, attempts, "Answer not recognized, re-prompting");
        dc.send(self.prompt.render(&options, true));
        Ok(DialogTurnStatus::Waiting)
    }

    /// Prompts start no children; show the question again.
    fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        _result: Option<Value>,
    ) -> Result<DialogTurnStatus, DialogError> {
        let options = self.stored_options(dc)?;
        dc.send(self.prompt.render(&options, false));
        Ok(DialogTurnStatus::Waiting)
    }
}
