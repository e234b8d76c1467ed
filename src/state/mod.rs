//! Per-user and per-conversation state.
//!
//! `BotState` loads a turn's state bags from the `Database` and flushes the
//! buffered changes afterwards. The typed stores (`LanguagePreferenceStore`,
//! `UserProfileStore`) and the dialog stack are all `StateProperty` views over
//! those bags, so nothing below the router touches storage directly.

pub mod bot_state;
pub mod language;
pub mod profile;
pub mod property;

pub use bot_state::{BotState, CachedState, StateKey, StateScope};
pub use language::{LANGUAGE_PREFERENCE, Language, LanguagePreferenceStore};
pub use profile::{USER_PROFILE, UserProfile, UserProfileStore};
pub use property::StateProperty;
