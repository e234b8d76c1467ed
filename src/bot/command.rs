//! Classification of top-level message text.

use crate::state::Language;

/// What a top-level message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnCommand {
    /// The text is exactly a supported language code.
    SelectLanguage(Language),
    /// Anything else; echoed back.
    Text(String),
}

impl TurnCommand {
    /// Classify message text. Matching is exact: no trimming, no case folding.
    pub fn parse(text: &str) -> Self {
        match Language::from_code(text) {
            Some(language) => Self::SelectLanguage(language),
            None => Self::Text(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_codes_select_a_language() {
        assert_eq!(TurnCommand::parse("en"), TurnCommand::SelectLanguage(Language::En));
        assert_eq!(TurnCommand::parse("ko"), TurnCommand::SelectLanguage(Language::Ko));
        assert_eq!(TurnCommand::parse("es"), TurnCommand::SelectLanguage(Language::Es));
    }

    #[test]
    fn near_misses_are_text() {
        for text in ["EN", " es", "ko ", "fr", "english", ""] {
            assert_eq!(TurnCommand::parse(text), TurnCommand::Text(text.to_string()));
        }
    }
}
