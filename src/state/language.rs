//! Supported languages and the per-user language preference.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::TurnContext;
use crate::error::StateError;

use super::bot_state::StateScope;
use super::property::StateProperty;

/// Languages the translation middleware can target.
///
/// Codes are matched exactly and case-sensitively: `"es"` selects Spanish,
/// `"ES"` and `" es"` are ordinary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ko,
    Es,
}

impl Language {
    /// Every supported language, in menu order.
    pub const ALL: [Language; 3] = [Language::En, Language::Ko, Language::Es];

    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ko => "ko",
            Self::Es => "es",
        }
    }

    /// Native display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ko => "한국어",
            Self::Es => "Español",
        }
    }

    /// Exact-match lookup of a language code.
    pub fn from_code(code: &str) -> Option<Language> {
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }

    /// All codes, in menu order.
    pub fn codes() -> Vec<String> {
        Self::ALL.iter().map(|lang| lang.code().to_string()).collect()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unsupported language code: {s:?}"))
    }
}

/// Persisted property name for the scalar preference.
pub const LANGUAGE_PREFERENCE: &str = "languagePreference";

/// Per-user language preference, read with a default and created lazily.
#[derive(Debug, Clone, Copy)]
pub struct LanguagePreferenceStore {
    property: StateProperty<Language>,
    default: Language,
}

impl LanguagePreferenceStore {
    pub const fn new(default: Language) -> Self {
        Self {
            property: StateProperty::new(StateScope::User, LANGUAGE_PREFERENCE),
            default,
        }
    }

    /// Current preference. Absent values are initialised to the default; a
    /// stored code outside the supported set is replaced by it.
    pub fn get(&self, turn: &mut TurnContext) -> Result<Language, StateError> {
        match self.property.get_or_insert_with(turn, || self.default) {
            Ok(language) => Ok(language),
            Err(StateError::Corrupt { reason, .. }) => {
                warn!(%reason, default = %self.default, "Stored language preference unreadable, resetting");
                self.property.set(turn, &self.default)?;
                Ok(self.default)
            }
            Err(e) => Err(e),
        }
    }

    pub fn set(&self, turn: &mut TurnContext, language: Language) -> Result<(), StateError> {
        self.property.set(turn, &language)
    }
}

impl Default for LanguagePreferenceStore {
    fn default() -> Self {
        Self::new(Language::default())
    }
}
