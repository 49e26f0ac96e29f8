use crate::chat::fragment::{ChatMessage, Role};
use crate::types::Lang;

/// A language the chat viewer knows how to label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
    /// Page title, when the viewer has one for this language
    pub title: Option<&'static str>,
}

pub const LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo {
        code: "ru",
        name: "Русский",
        flag: "🇷🇺",
        title: Some("История переписки"),
    },
    LanguageInfo {
        code: "en",
        name: "English",
        flag: "🇬🇧",
        title: Some("Chat History"),
    },
    LanguageInfo {
        code: "th",
        name: "ไทย",
        flag: "🇹🇭",
        title: Some("ประวัติการสนทนา"),
    },
    LanguageInfo {
        code: "it",
        name: "Italiano",
        flag: "🇮🇹",
        title: None,
    },
];

pub fn language_info(lang: &Lang) -> Option<&'static LanguageInfo> {
    LANGUAGES.iter().find(|info| info.code == lang.as_str())
}

pub fn title_for(lang: &Lang) -> Option<&'static str> {
    language_info(lang).and_then(|info| info.title)
}

/// Guess the language of a message from its script: Russian or Thai when
/// more than 30% of the characters belong to that script, English otherwise.
pub fn detect_language(text: &str) -> Lang {
    let total = text.chars().count();
    if total == 0 {
        return Lang::new("en");
    }

    let share = |count: usize| count as f64 > total as f64 * 0.3;

    let cyrillic = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| ('а'..='я').contains(c) || *c == 'ё')
        .count();
    if share(cyrillic) {
        return Lang::new("ru");
    }

    let thai = text
        .chars()
        .filter(|c| ('\u{0E00}'..='\u{0E7F}').contains(c))
        .count();
    if share(thai) {
        return Lang::new("th");
    }

    Lang::new("en")
}

/// Language a chat was written in, judged by its first non-empty user message
pub fn detect_chat_language(messages: &[ChatMessage]) -> Lang {
    messages
        .iter()
        .find(|m| m.role == Role::User && !m.text.trim().is_empty())
        .map(|m| detect_language(&m.text))
        .unwrap_or_else(|| Lang::new("en"))
}

/// Entries of the language picker: the chat's own language first, then every
/// other language the viewer has a title for.
pub fn language_picker(original: &Lang) -> Vec<&'static LanguageInfo> {
    let first = language_info(original).or_else(|| language_info(&Lang::new("en")));
    let first_code = first.map(|info| info.code);
    first
        .into_iter()
        .chain(
            LANGUAGES
                .iter()
                .filter(|info| info.title.is_some() && Some(info.code) != first_code),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(title_for(&Lang::new("en")), Some("Chat History"));
        assert_eq!(title_for(&Lang::new("ru")), Some("История переписки"));
        assert_eq!(title_for(&Lang::new("it")), None);
        assert_eq!(title_for(&Lang::new("de")), None);
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("Здравствуйте, хочу заказать").as_str(), "ru");
        assert_eq!(detect_language("สวัสดีครับ").as_str(), "th");
        assert_eq!(detect_language("Hello, I want to order").as_str(), "en");
        assert_eq!(detect_language("").as_str(), "en");
        // Mostly Latin with a couple of Cyrillic letters stays English
        assert_eq!(detect_language("Order #12 for Иван please").as_str(), "en");
    }

    #[test]
    fn test_detect_chat_language_uses_first_user_message() {
        let messages = vec![
            ChatMessage::new(Role::Model, "Hello! How can I help?"),
            ChatMessage::new(Role::User, "  "),
            ChatMessage::new(Role::User, "Хочу заказать манго"),
            ChatMessage::new(Role::User, "thanks"),
        ];
        assert_eq!(detect_chat_language(&messages).as_str(), "ru");
        assert_eq!(detect_chat_language(&[]).as_str(), "en");
    }

    #[test]
    fn test_language_picker() {
        let codes = |lang: &str| -> Vec<&'static str> {
            language_picker(&Lang::new(lang))
                .iter()
                .map(|info| info.code)
                .collect()
        };
        assert_eq!(codes("th"), vec!["th", "ru", "en"]);
        assert_eq!(codes("it"), vec!["it", "ru", "en", "th"]);
        // Unknown languages fall back to English first
        assert_eq!(codes("de"), vec!["en", "ru", "th"]);
    }
}
