//! User profile collected by the profile-capture dialog.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::TurnContext;
use crate::error::StateError;

use super::bot_state::StateScope;
use super::language::Language;
use super::property::StateProperty;

/// Per-user profile. Fields are filled independently by dialog steps.
///
/// Stored under the user-scoped property `"user"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_preference: Option<Language>,
}

impl UserProfile {
    /// One-line summary shown by the `hello_user` dialog.
    pub fn greeting(&self) -> String {
        let name = self.name.as_deref().unwrap_or("stranger");
        match self.language_preference {
            Some(language) => format!(
                "Hello {name}! Your selected language is {} ({}).",
                language.display_name(),
                language.code()
            ),
            None => format!("Hello {name}! You have not selected a language yet."),
        }
    }
}

/// Persisted property name for the profile record.
pub const USER_PROFILE: &str = "user";

/// Per-user profile accessor.
#[derive(Debug, Clone, Copy)]
pub struct UserProfileStore {
    property: StateProperty<UserProfile>,
}

impl UserProfileStore {
    pub const fn new() -> Self {
        Self {
            property: StateProperty::new(StateScope::User, USER_PROFILE),
        }
    }

    /// Current profile, created empty if absent.
    pub fn get(&self, turn: &mut TurnContext) -> Result<UserProfile, StateError> {
        self.property.get_or_insert_with(turn, UserProfile::default)
    }

    pub fn set(&self, turn: &mut TurnContext, profile: &UserProfile) -> Result<(), StateError> {
        self.property.set(turn, profile)
    }

    /// Record the user's name as typed. Blank names never replace a stored one.
    pub fn record_name(
        &self,
        turn: &mut TurnContext,
        name: &str,
    ) -> Result<UserProfile, StateError> {
        let mut profile = self.get(turn)?;
        if name.trim().is_empty() {
            warn!("Ignoring empty name for user profile");
            return Ok(profile);
        }
        profile.name = Some(name.to_string());
        self.set(turn, &profile)?;
        Ok(profile)
    }

    /// Record the language chosen inside the profile dialog.
    pub fn record_language(
        &self,
        turn: &mut TurnContext,
        language: Language,
    ) -> Result<UserProfile, StateError> {
        let mut profile = self.get(turn)?;
        profile.language_preference = Some(language);
        self.set(turn, &profile)?;
        Ok(profile)
    }
}

impl Default for UserProfileStore {
    fn default() -> Self {
        Self::new()
    }
}
