//! Profile dialogs: `who_are_you` captures language and name, `hello_user`
//! greets with what was captured.

use tracing::warn;

use crate::channels::Reply;
use crate::error::DialogError;
use crate::state::{Language, UserProfileStore};

use super::catalog::DialogCatalog;
use super::prompt::{ChoicePrompt, PromptDialog, PromptOptions, TextPrompt};
use super::waterfall::{StepContext, StepOutcome, WaterfallDialog};

pub const WHO_ARE_YOU: &str = "who_are_you";
pub const HELLO_USER: &str = "hello_user";
pub const LANGUAGE_PROMPT: &str = "language_prompt";
pub const NAME_PROMPT: &str = "name_prompt";

const PROFILES: UserProfileStore = UserProfileStore::new();

/// Slash command that starts a profile dialog from the CLI.
pub fn dialog_for_command(text: &str) -> Option<&'static str> {
    match text.trim() {
        "/profile" => Some(WHO_ARE_YOU),
        "/hello" => Some(HELLO_USER),
        _ => None,
    }
}

/// Register both profile dialogs and the prompts they use.
pub fn register(catalog: &mut DialogCatalog) -> Result<(), DialogError> {
    catalog.add(PromptDialog::new(LANGUAGE_PROMPT, ChoicePrompt::exact()))?;
    catalog.add(PromptDialog::new(NAME_PROMPT, TextPrompt))?;
    catalog.add(
        WaterfallDialog::new(WHO_ARE_YOU)
            .step("prompt_for_language_choice", prompt_for_language_choice)
            .step("prompt_for_name", prompt_for_name)
            .step("capture_name_and_end", capture_name_and_end),
    )?;
    catalog.add(
        WaterfallDialog::new(HELLO_USER).step("display_profile_and_end", display_profile_and_end),
    )?;
    Ok(())
}

fn prompt_for_language_choice(_step: &mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError> {
    Ok(StepOutcome::prompt(
        LANGUAGE_PROMPT,
        PromptOptions::new("Which language would you like to use?")
            .with_retry("Please pick one of the offered language codes.")
            .with_choices(Language::codes()),
    ))
}

fn prompt_for_name(step: &mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError> {
    match step.result_str().map(Language::from_code) {
        Some(Some(language)) => {
            PROFILES.record_language(step.turn(), language)?;
        }
        other => warn!(answer = ?other, "Language answer not recognized, profile unchanged"),
    }
    Ok(StepOutcome::prompt(NAME_PROMPT, PromptOptions::new("What is your name?")))
}

fn capture_name_and_end(step: &mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError> {
    let name = step.result_str().unwrap_or_default().to_string();
    let profile = PROFILES.record_name(step.turn(), &name)?;
    let shown = profile.name.as_deref().unwrap_or("stranger");
    step.send(Reply::text(format!("Thanks, {shown}.")));
    Ok(StepOutcome::End(Some(serde_json::to_value(&profile)?)))
}

fn display_profile_and_end(step: &mut StepContext<'_, '_>) -> Result<StepOutcome, DialogError> {
    let profile = PROFILES.get(step.turn())?;
    step.send(Reply::text(profile.greeting()));
    Ok(StepOutcome::End(None))
}
