//! Persisted dialog stack.

use serde::{Deserialize, Serialize};

use crate::state::{StateProperty, StateScope};

/// Conversation-scoped property holding the dialog stack.
pub const DIALOG_STATE: StateProperty<DialogStack> =
    StateProperty::new(StateScope::Conversation, "dialogState");

/// One running dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogInstance {
    pub dialog_id: String,
    /// Waterfalls: index of the next step to run.
    /// Prompts: number of re-prompts issued so far.
    #[serde(default)]
    pub cursor: usize,
    /// Options the dialog was begun with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
    /// Value a step handed forward with `StepOutcome::Next`, consumed by the
    /// next step on the following turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried: Option<serde_json::Value>,
}

impl DialogInstance {
    pub fn new(dialog_id: &str) -> Self {
        Self {
            dialog_id: dialog_id.to_string(),
            ..Default::default()
        }
    }
}

/// Stack of running dialogs for one conversation; the innermost is last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogStack {
    #[serde(default)]
    stack: Vec<DialogInstance>,
}

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, instance: DialogInstance) {
        self.stack.push(instance);
    }

    pub fn pop(&mut self) -> Option<DialogInstance> {
        self.stack.pop()
    }

    /// The innermost (active) dialog.
    pub fn top(&self) -> Option<&DialogInstance> {
        self.stack.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut DialogInstance> {
        self.stack.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Dialog ids from outermost to innermost.
    pub fn ids(&self) -> Vec<&str> {
        self.stack.iter().map(|i| i.dialog_id.as_str()).collect()
    }
}
