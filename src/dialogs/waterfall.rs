//! Ordered multi-step dialogs, one step per turn.
//!
//! The dialog's cursor is the index of the next step to run. It is advanced
//! before a step executes, so a step that suspends (prompt or child dialog)
//! is never re-run when control comes back: the value the child ends with is
//! handed to the step after it.

use serde_json::Value;
use tracing::debug;

use crate::channels::{Activity, Reply};
use crate::context::TurnContext;
use crate::error::DialogError;

use super::context::DialogContext;
use super::prompt::PromptOptions;
use super::{Dialog, DialogTurnStatus};

/// What a step asks the engine to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Suspend on a registered prompt; its answer feeds the next step.
    Prompt {
        prompt_id: String,
        options: PromptOptions,
    },
    /// Start any registered dialog as a child; its result feeds the next step.
    BeginDialog {
        dialog_id: String,
        options: Option<Value>,
    },
    /// Suspend until the next message. `Some(v)` hands `v` to the next step in
    /// place of the message text.
    Next(Option<Value>),
    /// End this dialog with a result.
    End(Option<Value>),
}

impl StepOutcome {
    pub fn prompt(prompt_id: &str, options: PromptOptions) -> Self {
        Self::Prompt {
            prompt_id: prompt_id.to_string(),
            options,
        }
    }

    pub fn begin_dialog(dialog_id: &str, options: Option<Value>) -> Self {
        Self::BeginDialog {
            dialog_id: dialog_id.to_string(),
            options,
        }
    }
}

/// Per-invocation view handed to a step. Rebuilt every turn from the
/// persisted instance and the current activity.
pub struct StepContext<'s, 'a> {
    dc: &'s mut DialogContext<'a>,
    result: Option<Value>,
    options: Option<Value>,
}

impl<'s, 'a> StepContext<'s, 'a> {
    /// Result of the previous step or of the prompt it issued.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The result as a string, if it is one.
    pub fn result_str(&self) -> Option<&str> {
        self.result.as_ref().and_then(Value::as_str)
    }

    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    /// Options the dialog was begun with.
    pub fn options(&self) -> Option<&Value> {
        self.options.as_ref()
    }

    pub fn activity(&self) -> &Activity {
        self.dc.activity()
    }

    pub fn turn(&mut self) -> &mut TurnContext {
        self.dc.turn()
    }

    pub fn send(&mut self, reply: Reply) {
        self.dc.send(reply);
    }
}

/// One step of a waterfall.
pub trait WaterfallStep: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError>;
}

/// A step backed by a function or closure.
pub struct FnStep<F> {
    name: String,
    f: F,
}

impl<F> FnStep<F>
where
    F: Fn(&mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError> + Send + Sync,
{
    pub fn new(name: &str, f: F) -> Self {
        Self {
            name: name.to_string(),
            f,
        }
    }
}

impl<F> WaterfallStep for FnStep<F>
where
    F: Fn(&mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, step: &mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError> {
        (self.f)(step)
    }
}

/// A dialog made of ordered steps.
pub struct WaterfallDialog {
    id: String,
    steps: Vec<Box<dyn WaterfallStep>>,
}

impl WaterfallDialog {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            steps: Vec::new(),
        }
    }

    /// Append a function step.
    pub fn step<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError>
            + Send
            + Sync
            + 'static,
    {
        self.with_step(FnStep::new(name, f))
    }

    /// Append any step implementation.
    pub fn with_step(mut self, step: impl WaterfallStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    fn run_step(
        &self,
        dc: &mut DialogContext<'_>,
        index: usize,
        result: Option<Value>,
    ) -> Result<DialogTurnStatus, DialogError> {
        let Some(step) = self.steps.get(index) else {
            // Ran off the end: finish with whatever the last step produced.
            return dc.end_dialog(result);
        };

        let options = {
            let instance = dc.active_dialog_mut()?;
            instance.cursor = index + 1;
            instance.carried = None;
            instance.options.clone()
        };
        debug!(dialog = %self.id, step = step.name(), index, "Running waterfall step");

        let outcome = {
            let mut ctx = StepContext {
                dc: &mut *dc,
                result,
                options,
            };
            step.run(&mut ctx)?
        };

        match outcome {
            StepOutcome::Prompt { prompt_id, options } => dc.prompt(&prompt_id, options),
            StepOutcome::BeginDialog { dialog_id, options } => dc.begin_dialog(&dialog_id, options),
            StepOutcome::Next(carried) => {
                dc.active_dialog_mut()?.carried = carried;
                Ok(DialogTurnStatus::Waiting)
            }
            StepOutcome::End(result) => dc.end_dialog(result),
        }
    }
}

impl Dialog for WaterfallDialog {
    fn id(&self) -> &str {
        &self.id
    }

    fn begin(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<Value>,
    ) -> Result<DialogTurnStatus, DialogError> {
        let instance = dc.active_dialog_mut()?;
        instance.cursor = 0;
        instance.options = options;
        self.run_step(dc, 0, None)
    }

    fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnStatus, DialogError> {
        let (cursor, carried) = {
            let instance = dc.active_dialog_mut()?;
            (instance.cursor, instance.carried.take())
        };
        let input = carried.or_else(|| dc.activity().text().map(|t| Value::String(t.to_string())));
        self.run_step(dc, cursor, input)
    }

    fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        result: Option<Value>,
    ) -> Result<DialogTurnStatus, DialogError> {
        let cursor = dc.active_dialog_mut()?.cursor;
        self.run_step(dc, cursor, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogs::{DIALOG_STATE, DialogCatalog, PromptDialog, TextPrompt};
    use crate::state::{CachedState, StateKey};
    use serde_json::json;

    fn turn(text: &str) -> TurnContext {
        let activity = Activity::message("test", "u1", text);
        TurnContext::new(
            activity.clone(),
            CachedState::empty(StateKey::user(&activity)),
            CachedState::empty(StateKey::conversation(&activity)),
        )
    }

    /// Carry the previous turn's state into a new turn with `text`.
    fn next_turn(prev: &TurnContext, text: &str) -> TurnContext {
        let activity = Activity::message("test", "u1", text);
        TurnContext::new(
            activity,
            prev.state(crate::state::StateScope::User).clone(),
            prev.state(crate::state::StateScope::Conversation).clone(),
        )
    }

    fn texts(turn: &TurnContext) -> Vec<String> {
        turn.replies().iter().map(|r| r.content().to_string()).collect()
    }

    fn echo_steps() -> WaterfallDialog {
        WaterfallDialog::new("collect")
            .step("ask", |step| {
                step.send(Reply::text("first?"));
                Ok(StepOutcome::Next(None))
            })
            .step("ask_again", |step| {
                let got = step.result_str().unwrap_or_default().to_string();
                step.send(Reply::text(format!("got {got}, second?")));
                Ok(StepOutcome::Next(None))
            })
            .step("finish", |step| {
                let got = step.result_str().unwrap_or_default().to_string();
                Ok(StepOutcome::End(Some(json!(got))))
            })
    }

    #[test]
    fn one_step_per_turn() {
        let mut catalog = DialogCatalog::new();
        catalog.add(echo_steps()).unwrap();

        let mut t1 = turn("start");
        let status = catalog.run(&mut t1, |dc| dc.begin_dialog("collect", None)).unwrap();
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(texts(&t1), vec!["first?"]);

        let mut t2 = next_turn(&t1, "a");
        let status = catalog.run(&mut t2, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(texts(&t2), vec!["got a, second?"]);

        let mut t3 = next_turn(&t2, "b");
        let status = catalog.run(&mut t3, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Complete(Some(json!("b"))));
        assert!(t3.replies().is_empty());
        assert!(DIALOG_STATE.get(&t3).unwrap().is_none());

        // Nothing runs again until the dialog is begun anew.
        let mut t4 = next_turn(&t3, "c");
        let status = catalog.run(&mut t4, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Empty);
        assert!(t4.replies().is_empty());
    }

    #[test]
    fn next_with_value_is_carried() {
        let mut catalog = DialogCatalog::new();
        catalog
            .add(
                WaterfallDialog::new("carry")
                    .step("hand_over", |_| Ok(StepOutcome::Next(Some(json!({"n": 7})))))
                    .step("receive", |step| Ok(StepOutcome::End(step.take_result()))),
            )
            .unwrap();

        let mut t1 = turn("start");
        catalog.run(&mut t1, |dc| dc.begin_dialog("carry", None)).unwrap();
        let stack = DIALOG_STATE.get(&t1).unwrap().unwrap();
        assert_eq!(stack.top().unwrap().carried, Some(json!({"n": 7})));

        let mut t2 = next_turn(&t1, "ignored text");
        let status = catalog.run(&mut t2, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Complete(Some(json!({"n": 7}))));
    }

    #[test]
    fn options_are_visible_to_every_step() {
        let mut catalog = DialogCatalog::new();
        catalog
            .add(
                WaterfallDialog::new("opts")
                    .step("one", |step| {
                        assert_eq!(step.options(), Some(&json!({"k": "v"})));
                        Ok(StepOutcome::Next(None))
                    })
                    .step("two", |step| Ok(StepOutcome::End(step.options().cloned()))),
            )
            .unwrap();

        let mut t1 = turn("start");
        catalog
            .run(&mut t1, |dc| dc.begin_dialog("opts", Some(json!({"k": "v"}))))
            .unwrap();
        let mut t2 = next_turn(&t1, "x");
        let status = catalog.run(&mut t2, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Complete(Some(json!({"k": "v"}))));
    }

    #[test]
    fn running_past_last_step_ends_with_result() {
        let mut catalog = DialogCatalog::new();
        catalog
            .add(WaterfallDialog::new("short").step("only", |_| Ok(StepOutcome::Next(None))))
            .unwrap();

        let mut t1 = turn("start");
        catalog.run(&mut t1, |dc| dc.begin_dialog("short", None)).unwrap();
        let mut t2 = next_turn(&t1, "tail");
        let status = catalog.run(&mut t2, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Complete(Some(json!("tail"))));
    }

    #[test]
    fn prompt_answer_feeds_following_step() {
        let mut catalog = DialogCatalog::new();
        catalog.add(PromptDialog::new("ask_text", TextPrompt)).unwrap();
        catalog
            .add(
                WaterfallDialog::new("asker")
                    .step("ask", |_| {
                        Ok(StepOutcome::prompt("ask_text", PromptOptions::new("Say something")))
                    })
                    .step("answer", |step| Ok(StepOutcome::End(step.take_result()))),
            )
            .unwrap();

        let mut t1 = turn("start");
        let status = catalog.run(&mut t1, |dc| dc.begin_dialog("asker", None)).unwrap();
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(texts(&t1), vec!["Say something"]);
        let stack = DIALOG_STATE.get(&t1).unwrap().unwrap();
        assert_eq!(stack.ids(), vec!["asker", "ask_text"]);

        let mut t2 = next_turn(&t1, "hola");
        let status = catalog.run(&mut t2, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Complete(Some(json!("hola"))));
    }

    #[test]
    fn ending_child_resumes_parent_with_its_result() {
        let mut catalog = DialogCatalog::new();
        catalog
            .add(
                WaterfallDialog::new("child")
                    .step("wait", |_| Ok(StepOutcome::Next(None)))
                    .step("done", |step| {
                        let text = step.result_str().unwrap_or_default().to_uppercase();
                        Ok(StepOutcome::End(Some(json!(text))))
                    }),
            )
            .unwrap();
        catalog
            .add(
                WaterfallDialog::new("parent")
                    .step("spawn", |_| Ok(StepOutcome::begin_dialog("child", None)))
                    .step("after_child", |step| {
                        let got = step.take_result();
                        let shown = got.clone().unwrap_or_default();
                        step.send(Reply::text(format!("child said {shown}")));
                        Ok(StepOutcome::Next(got))
                    }),
            )
            .unwrap();

        let mut t1 = turn("start");
        catalog.run(&mut t1, |dc| dc.begin_dialog("parent", None)).unwrap();
        let stack = DIALOG_STATE.get(&t1).unwrap().unwrap();
        assert_eq!(stack.depth(), 2);

        let mut t2 = next_turn(&t1, "ana");
        let status = catalog.run(&mut t2, |dc| dc.continue_dialog()).unwrap();
        assert_eq!(status, DialogTurnStatus::Waiting);
        assert_eq!(texts(&t2), vec!["child said \"ANA\""]);

        let stack = DIALOG_STATE.get(&t2).unwrap().unwrap();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.ids(), vec!["parent"]);
        assert_eq!(stack.top().unwrap().carried, Some(json!("ANA")));
    }

    #[test]
    fn step_errors_propagate() {
        let mut catalog = DialogCatalog::new();
        catalog
            .add(WaterfallDialog::new("broken").step("boom", |_| {
                Err(DialogError::InvalidOptions {
                    id: "broken".into(),
                    reason: "boom".into(),
                })
            }))
            .unwrap();

        let mut t1 = turn("start");
        let err = catalog
            .run(&mut t1, |dc| dc.begin_dialog("broken", None))
            .unwrap_err();
        assert!(matches!(err, DialogError::InvalidOptions { .. }));
    }

    #[test]
    fn step_names_in_order() {
        let names: Vec<String> = echo_steps().step_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["ask", "ask_again", "finish"]);
    }
}
