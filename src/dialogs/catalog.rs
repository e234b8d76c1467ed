//! Dialog catalog — registry of dialog definitions and the engine entry point.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::TurnContext;
use crate::error::DialogError;

use super::context::DialogContext;
use super::instance::{DIALOG_STATE, DialogStack};
use super::{Dialog, DialogTurnStatus};

/// Registry of dialogs, keyed by unique id.
#[derive(Default)]
pub struct DialogCatalog {
    dialogs: HashMap<String, Arc<dyn Dialog>>,
}

impl DialogCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dialog. Ids are unique; a second registration is rejected.
    pub fn add(&mut self, dialog: impl Dialog + 'static) -> Result<(), DialogError> {
        self.add_shared(Arc::new(dialog))
    }

    /// Register an already shared dialog.
    pub fn add_shared(&mut self, dialog: Arc<dyn Dialog>) -> Result<(), DialogError> {
        let id = dialog.id().to_string();
        if self.dialogs.contains_key(&id) {
            return Err(DialogError::DuplicateDialogId { id });
        }
        debug!(dialog = %id, "Registered dialog");
        self.dialogs.insert(id, dialog);
        Ok(())
    }

    /// Look up a dialog by id.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Dialog>, DialogError> {
        self.dialogs
            .get(id)
            .cloned()
            .ok_or_else(|| DialogError::UnknownDialogId { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dialogs.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.dialogs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Run one dialog operation against the conversation's persisted stack.
    ///
    /// Loads the stack from the turn's conversation state, hands `operation`
    /// a [`DialogContext`], and writes the stack back (an empty stack deletes
    /// the property). An unreadable stack is discarded and the operation runs
    /// on an empty one. A `LostDialogState` raised by the operation leaves
    /// the conversation with no running dialogs.
    pub fn run<F>(&self, turn: &mut TurnContext, operation: F) -> Result<DialogTurnStatus, DialogError>
    where
        F: FnOnce(&mut DialogContext<'_>) -> Result<DialogTurnStatus, DialogError>,
    {
        let mut stack = match DIALOG_STATE.get(turn) {
            Ok(stack) => stack.unwrap_or_default(),
            Err(e) => {
                warn!(reason = %e, "Stored dialog stack unreadable, starting fresh");
                DIALOG_STATE.delete(turn);
                DialogStack::default()
            }
        };

        let outcome = {
            let mut dc = DialogContext::new(self, turn, &mut stack);
            operation(&mut dc)
        };

        if matches!(outcome, Err(DialogError::LostDialogState { .. })) {
            stack.clear();
        }

        if stack.is_empty() {
            DIALOG_STATE.delete(turn);
        } else {
            DIALOG_STATE.set(turn, &stack)?;
        }

        outcome
    }
}
