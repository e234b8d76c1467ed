//! Multi-turn dialogs.
//!
//! A dialog is anything that can be begun, continued with the next inbound
//! message, and resumed when a child dialog it started has ended. Running
//! dialogs live on a per-conversation [`DialogStack`] that is persisted
//! between turns, so a dialog can suspend on one turn and pick up on the next
//! even across a process restart.
//!
//! - [`WaterfallDialog`] runs an ordered list of steps, one per turn.
//! - [`PromptDialog`] asks for input and ends with the recognized answer
//!   (free text via [`TextPrompt`], a fixed list via [`ChoicePrompt`]).
//! - [`DialogCatalog`] maps dialog ids to definitions and is the engine entry
//!   point ([`DialogCatalog::run`]).

pub mod catalog;
pub mod context;
pub mod instance;
pub mod profile;
pub mod prompt;
pub mod waterfall;

pub use catalog::DialogCatalog;
pub use context::DialogContext;
pub use instance::{DIALOG_STATE, DialogInstance, DialogStack};
pub use prompt::{ChoicePrompt, ChoiceValidation, Prompt, PromptDialog, PromptOptions, TextPrompt};
pub use waterfall::{FnStep, StepContext, StepOutcome, WaterfallDialog, WaterfallStep};

use crate::error::DialogError;

/// Where the dialog stack stands after a dialog operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogTurnStatus {
    /// No dialog was active.
    Empty,
    /// A dialog is suspended, waiting for the next message.
    Waiting,
    /// The outermost dialog ended with this result; the stack is empty.
    Complete(Option<serde_json::Value>),
    /// The stack was cleared without completing.
    Cancelled,
}

/// A dialog definition registered in the [`DialogCatalog`].
///
/// The engine pushes a [`DialogInstance`] before calling `begin`, so the
/// dialog's own instance is always `dc.active_dialog_mut()` inside these
/// methods.
pub trait Dialog: Send + Sync {
    fn id(&self) -> &str;

    /// Start the dialog.
    fn begin(
        &self,
        dc: &mut DialogContext<'_>,
        options: Option<serde_json::Value>,
    ) -> Result<DialogTurnStatus, DialogError>;

    /// Handle a new message while this dialog is the innermost one.
    fn continue_dialog(&self, dc: &mut DialogContext<'_>) -> Result<DialogTurnStatus, DialogError>;

    /// A child dialog this one started has ended with `result`.
    fn resume(
        &self,
        dc: &mut DialogContext<'_>,
        result: Option<serde_json::Value>,
    ) -> Result<DialogTurnStatus, DialogError>;
}
