//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::state::Language;

/// Bot configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// Path of the local libSQL database holding bot state.
    pub db_path: PathBuf,
    /// Language assumed for users who never picked one.
    pub default_language: Language,
    /// Prefix put in front of echoed text.
    pub echo_prefix: String,
    /// Identity the CLI channel speaks as.
    pub user_id: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/polyglot-bot.db"),
            default_language: Language::En,
            echo_prefix: "Echo: ".to_string(),
            user_id: "local-user".to_string(),
        }
    }
}

impl BotConfig {
    /// Read `POLYGLOT_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to defaults
    /// for anything unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup("POLYGLOT_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Some(code) = lookup("POLYGLOT_DEFAULT_LANGUAGE") {
            config.default_language =
                Language::from_code(&code).ok_or_else(|| ConfigError::InvalidValue {
                    key: "POLYGLOT_DEFAULT_LANGUAGE".to_string(),
                    message: format!(
                        "unsupported language code '{code}' (expected one of {})",
                        Language::codes().join(", ")
                    ),
                })?;
        }

        if let Some(prefix) = lookup("POLYGLOT_ECHO_PREFIX") {
            config.echo_prefix = prefix;
        }

        if let Some(user_id) = lookup("POLYGLOT_USER_ID") {
            if user_id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "POLYGLOT_USER_ID".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            config.user_id = user_id;
        }

        Ok(config)
    }
}
