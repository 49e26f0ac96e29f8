//! Chat history page: transcript fragments, the message-by-message
//! translation pass and the language switcher.

pub mod fragment;
pub mod i18n;
mod surface;
mod switcher;
mod translate;

pub use fragment::{ChatMessage, Role, parse_fragment, render_fragment};
pub use i18n::{
    LANGUAGES, LanguageInfo, detect_chat_language, detect_language, language_info, language_picker,
    title_for,
};
pub use surface::{ChatSurface, DisplayedMessage, MessageStatus, Transcript};
pub use switcher::{LanguageSwitcher, SwitchOutcome, initial_language, reload_url};
pub use translate::{MessageOutcome, RetryPolicy, TranslationDriver, TranslationReport};
