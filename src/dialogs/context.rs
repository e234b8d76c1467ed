//! The engine's view of one dialog operation within a turn.

use std::sync::Arc;

use tracing::debug;

use crate::channels::{Activity, Reply};
use crate::context::TurnContext;
use crate::error::DialogError;

use super::catalog::DialogCatalog;
use super::instance::{DialogInstance, DialogStack};
use super::prompt::PromptOptions;
use super::{Dialog, DialogTurnStatus};

/// Binds the catalog, the turn and the conversation's dialog stack together
/// for the duration of one dialog operation.
pub struct DialogContext<'a> {
    catalog: &'a DialogCatalog,
    turn: &'a mut TurnContext,
    stack: &'a mut DialogStack,
}

impl<'a> DialogContext<'a> {
    pub fn new(
        catalog: &'a DialogCatalog,
        turn: &'a mut TurnContext,
        stack: &'a mut DialogStack,
    ) -> Self {
        Self {
            catalog,
            turn,
            stack,
        }
    }

    pub fn turn(&mut self) -> &mut TurnContext {
        &mut *self.turn
    }

    pub fn activity(&self) -> &Activity {
        self.turn.activity()
    }

    /// Queue a reply on the turn.
    pub fn send(&mut self, reply: Reply) {
        self.turn.send(reply);
    }

    pub fn stack(&self) -> &DialogStack {
        &*self.stack
    }

    /// The innermost running dialog, if any.
    pub fn active_dialog(&self) -> Option<&DialogInstance> {
        self.stack.top()
    }

    pub fn active_dialog_mut(&mut self) -> Result<&mut DialogInstance, DialogError> {
        self.stack
            .top_mut()
            .ok_or_else(|| DialogError::LostDialogState {
                reason: "no active dialog on the stack".to_string(),
            })
    }

    /// Push `dialog_id` onto the stack and start it.
    pub fn begin_dialog(
        &mut self,
        dialog_id: &str,
        options: Option<serde_json::Value>,
    ) -> Result<DialogTurnStatus, DialogError> {
        let dialog = self.catalog.get(dialog_id)?;
        self.stack.push(DialogInstance::new(dialog_id));
        debug!(dialog = dialog_id, depth = self.stack.depth(), "Dialog begun");
        dialog.begin(self, options)
    }

    /// Start a registered prompt dialog with the given options.
    pub fn prompt(
        &mut self,
        prompt_id: &str,
        options: PromptOptions,
    ) -> Result<DialogTurnStatus, DialogError> {
        let options = serde_json::to_value(options)?;
        self.begin_dialog(prompt_id, Some(options))
    }

    /// Route the current message to the innermost dialog.
    pub fn continue_dialog(&mut self) -> Result<DialogTurnStatus, DialogError> {
        let Some(dialog_id) = self.stack.top().map(|i| i.dialog_id.clone()) else {
            return Ok(DialogTurnStatus::Empty);
        };
        let dialog = self.lookup_running(&dialog_id)?;
        dialog.continue_dialog(self)
    }

    /// Pop the innermost dialog. Its parent, if any, is resumed with `result`;
    /// otherwise the stack is now empty and the result is returned to the
    /// caller.
    pub fn end_dialog(
        &mut self,
        result: Option<serde_json::Value>,
    ) -> Result<DialogTurnStatus, DialogError> {
        let ended = self.stack.pop().ok_or_else(|| DialogError::LostDialogState {
            reason: "end requested with an empty dialog stack".to_string(),
        })?;
        debug!(dialog = %ended.dialog_id, depth = self.stack.depth(), "Dialog ended");

        match self.stack.top().map(|i| i.dialog_id.clone()) {
            Some(parent_id) => {
                let parent = self.lookup_running(&parent_id)?;
                parent.resume(self, result)
            }
            None => Ok(DialogTurnStatus::Complete(result)),
        }
    }

    /// Drop every running dialog.
    pub fn cancel_all_dialogs(&mut self) -> DialogTurnStatus {
        if self.stack.is_empty() {
            return DialogTurnStatus::Empty;
        }
        debug!(depth = self.stack.depth(), "Cancelling all dialogs");
        self.stack.clear();
        DialogTurnStatus::Cancelled
    }

    /// Resolve a dialog that is already on the stack. A persisted id that is
    /// no longer registered means the stack cannot be resumed.
    fn lookup_running(
        &self,
        dialog_id: &str,
    ) -> Result<Arc<dyn Dialog>, DialogError> {
        self.catalog
            .get(dialog_id)
            .map_err(|_| DialogError::LostDialogState {
                reason: format!("running dialog '{dialog_id}' is not registered"),
            })
    }
}
