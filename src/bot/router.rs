//! Turn router — the per-activity entry point.
//!
//! Each message activity goes through one cycle:
//! load state → continue an active dialog, or handle the text as a language
//! command / echo → deliver replies through the channel → flush state.
//!
//! Replies are delivered before state is flushed. A flush failure therefore
//! surfaces after the user has already seen the replies; the turn is not
//! durably completed and may be replayed (at-least-once).

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::channels::{Activity, Channel, Reply};
use crate::config::BotConfig;
use crate::context::TurnContext;
use crate::dialogs::{DialogCatalog, DialogTurnStatus};
use crate::error::{DialogError, Error};
use crate::state::{BotState, Language, LanguagePreferenceStore};
use crate::store::Database;

use super::command::TurnCommand;

/// Result of routing one activity.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Not a message; nothing was loaded or written.
    Ignored,
    /// A message without text.
    Silent,
    /// The preference was switched to this language.
    LanguageChanged(Language),
    /// The requested language was already active; the menu was shown again.
    LanguageMenu,
    /// The text was echoed back.
    Echoed,
    /// An active dialog consumed the message.
    Dialog(DialogTurnStatus),
}

/// Stateless dispatcher over persisted per-user and per-conversation state.
pub struct TurnRouter {
    state: BotState,
    catalog: Arc<DialogCatalog>,
    languages: LanguagePreferenceStore,
    echo_prefix: String,
}

impl TurnRouter {
    pub fn new(db: Arc<dyn Database>, catalog: Arc<DialogCatalog>, config: &BotConfig) -> Self {
        Self {
            state: BotState::new(db),
            catalog,
            languages: LanguagePreferenceStore::new(config.default_language),
            echo_prefix: config.echo_prefix.clone(),
        }
    }

    /// Process one inbound activity to completion.
    pub async fn on_turn(
        &self,
        activity: &Activity,
        channel: &dyn Channel,
    ) -> Result<TurnOutcome, Error> {
        if !activity.is_message() {
            debug!(kind = %activity.kind, "Ignoring non-message activity");
            return Ok(TurnOutcome::Ignored);
        }

        let mut turn = self.state.load_turn(activity.clone()).await?;
        let outcome = self.dispatch(&mut turn)?;
        self.finish_turn(&mut turn, channel).await?;

        debug!(user = %activity.user_id, outcome = ?outcome, "Turn complete");
        Ok(outcome)
    }

    /// Start a registered dialog for the sender of `activity`.
    pub async fn begin_dialog(
        &self,
        activity: &Activity,
        dialog_id: &str,
        options: Option<Value>,
        channel: &dyn Channel,
    ) -> Result<TurnOutcome, Error> {
        let mut turn = self.state.load_turn(activity.clone()).await?;
        let status = self
            .catalog
            .run(&mut turn, |dc| dc.begin_dialog(dialog_id, options))?;
        self.finish_turn(&mut turn, channel).await?;

        info!(dialog = dialog_id, user = %activity.user_id, "Dialog started");
        Ok(TurnOutcome::Dialog(status))
    }

    /// Drop every dialog running in the conversation of `activity`.
    pub async fn cancel_dialogs(
        &self,
        activity: &Activity,
        channel: &dyn Channel,
    ) -> Result<TurnOutcome, Error> {
        let mut turn = self.state.load_turn(activity.clone()).await?;
        let status = self.catalog.run(&mut turn, |dc| Ok(dc.cancel_all_dialogs()))?;
        if status == DialogTurnStatus::Cancelled {
            turn.send(Reply::text("Cancelled."));
        }
        self.finish_turn(&mut turn, channel).await?;

        info!(user = %activity.user_id, status = ?status, "Dialogs cancelled");
        Ok(TurnOutcome::Dialog(status))
    }

    fn dispatch(&self, turn: &mut TurnContext) -> Result<TurnOutcome, Error> {
        match self.catalog.run(turn, |dc| dc.continue_dialog()) {
            Ok(DialogTurnStatus::Empty) => {}
            Ok(status) => return Ok(TurnOutcome::Dialog(status)),
            Err(DialogError::LostDialogState { reason }) => {
                warn!(reason = %reason, "Dialog state lost, handling message as a new command");
            }
            Err(e) => return Err(e.into()),
        }
        self.handle_command(turn)
    }

    fn handle_command(&self, turn: &mut TurnContext) -> Result<TurnOutcome, Error> {
        let Some(text) = turn.activity().text().map(str::to_string) else {
            return Ok(TurnOutcome::Silent);
        };

        let current = self.languages.get(turn)?;
        match TurnCommand::parse(&text) {
            TurnCommand::SelectLanguage(language) if language == current => {
                turn.send(language_menu());
                Ok(TurnOutcome::LanguageMenu)
            }
            TurnCommand::SelectLanguage(language) => {
                self.languages.set(turn, language)?;
                info!(from = %current, to = %language, "Language preference changed");
                turn.send(Reply::text(format!(
                    "Your current language code is: {}",
                    language.code()
                )));
                Ok(TurnOutcome::LanguageChanged(language))
            }
            TurnCommand::Text(text) => {
                turn.send(Reply::text(format!("{}{}", self.echo_prefix, text)));
                Ok(TurnOutcome::Echoed)
            }
        }
    }

    async fn finish_turn(&self, turn: &mut TurnContext, channel: &dyn Channel) -> Result<(), Error> {
        for reply in turn.take_replies() {
            channel.respond(turn.activity(), reply).await?;
        }
        let written = self.state.save_turn(turn).await?;
        if written > 0 {
            debug!(written, "Turn state saved");
        }
        Ok(())
    }
}

/// The "choose your language" payload.
pub fn language_menu() -> Reply {
    Reply::suggested_actions("Choose your language:", Language::codes())
}
