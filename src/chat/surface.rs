use std::time::Duration;

use crate::chat::fragment::{ChatMessage, parse_fragment, render_fragment};
use crate::chat::i18n;
use crate::types::Lang;

/// What a message slot currently shows besides its text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageStatus {
    Idle,
    Translating,
    Retrying { attempt: u32, wait: Duration },
}

impl MessageStatus {
    /// Placeholder shown instead of the text, if any
    pub fn placeholder(&self) -> Option<String> {
        match self {
            MessageStatus::Idle => None,
            MessageStatus::Translating => Some("Translating...".to_string()),
            MessageStatus::Retrying { wait, .. } => Some(format!(
                "Rate limit exceeded, retrying in {}s...",
                wait.as_secs_f64().ceil() as u64
            )),
        }
    }
}

/// The chat container the translation driver and the language switcher
/// write to.
pub trait ChatSurface {
    fn message_count(&self) -> usize;

    /// Text currently displayed for message `index`
    fn message_text(&self, index: usize) -> Option<String>;

    fn set_status(&mut self, index: usize, status: MessageStatus);

    /// Replace the displayed text; clears any status placeholder
    fn set_text(&mut self, index: usize, text: &str);

    fn set_opacity(&mut self, index: usize, opacity: f32);

    fn set_controls_enabled(&mut self, enabled: bool);

    fn set_active_language(&mut self, lang: &Lang);

    fn set_title(&mut self, title: &str);

    fn set_container_opacity(&mut self, opacity: f32);

    /// Swap the whole transcript for a server-rendered fragment
    fn replace_content(&mut self, fragment: &str);

    /// Inline error panel in place of the transcript
    fn show_error(&mut self, message: &str);

    fn scroll_to_top(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedMessage {
    pub message: ChatMessage,
    pub status: MessageStatus,
    pub opacity: f32,
}

impl DisplayedMessage {
    fn new(message: ChatMessage) -> Self {
        Self {
            message,
            status: MessageStatus::Idle,
            opacity: 1.0,
        }
    }
}

/// In-memory chat page
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub title: String,
    pub active_lang: Lang,
    /// Language the chat was written in; the picker lists it first
    pub original_lang: Lang,
    pub messages: Vec<DisplayedMessage>,
    pub controls_enabled: bool,
    pub container_opacity: f32,
    pub error: Option<String>,
    pub scroll_offset: usize,
}

impl Transcript {
    pub fn new(lang: Lang, messages: Vec<ChatMessage>) -> Self {
        let title = i18n::title_for(&lang).unwrap_or_default().to_string();
        let original_lang = i18n::detect_chat_language(&messages);
        Self {
            title,
            active_lang: lang,
            original_lang,
            messages: messages.into_iter().map(DisplayedMessage::new).collect(),
            controls_enabled: true,
            container_opacity: 1.0,
            error: None,
            scroll_offset: 0,
        }
    }

    pub fn from_fragment(lang: Lang, fragment: &str) -> Self {
        Self::new(lang, parse_fragment(fragment))
    }

    pub fn texts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .map(|m| m.message.text.as_str())
            .collect()
    }

    pub fn to_fragment(&self) -> String {
        let messages: Vec<ChatMessage> = self.messages.iter().map(|m| m.message.clone()).collect();
        render_fragment(&messages)
    }

    /// Flags and names of the picker, the active language in brackets
    pub fn language_bar(&self) -> String {
        i18n::language_picker(&self.original_lang)
            .iter()
            .map(|info| {
                let label = format!("{} {}", info.flag, info.name);
                if info.code == self.active_lang.as_str() {
                    format!("[{label}]")
                } else {
                    label
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    }

    /// Terminal rendering of the page
    pub fn render_text(&self) -> String {
        let mut output = format!("== {} [{}] ==\n", self.title, self.active_lang);
        output.push_str(&self.language_bar());
        output.push('\n');

        if let Some(ref error) = self.error {
            output.push_str(&format!("Error: {error}\n"));
            return output;
        }

        for displayed in &self.messages {
            let body = displayed
                .status
                .placeholder()
                .unwrap_or_else(|| displayed.message.text.clone());
            let time = displayed
                .message
                .time
                .as_deref()
                .map(|t| format!(" {t}"))
                .unwrap_or_default();
            output.push_str(&format!("[{}{time}] {body}\n", displayed.message.role));
        }
        output
    }
}

impl ChatSurface for Transcript {
    fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn message_text(&self, index: usize) -> Option<String> {
        self.messages.get(index).map(|m| m.message.text.clone())
    }

    fn set_status(&mut self, index: usize, status: MessageStatus) {
        if let Some(displayed) = self.messages.get_mut(index) {
            displayed.status = status;
        }
    }

    fn set_text(&mut self, index: usize, text: &str) {
        if let Some(displayed) = self.messages.get_mut(index) {
            displayed.message.text = text.to_string();
            displayed.status = MessageStatus::Idle;
        }
    }

    fn set_opacity(&mut self, index: usize, opacity: f32) {
        if let Some(displayed) = self.messages.get_mut(index) {
            displayed.opacity = opacity;
        }
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    fn set_active_language(&mut self, lang: &Lang) {
        self.active_lang = lang.clone();
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn set_container_opacity(&mut self, opacity: f32) {
        self.container_opacity = opacity;
    }

    fn replace_content(&mut self, fragment: &str) {
        self.messages = parse_fragment(fragment)
            .into_iter()
            .map(DisplayedMessage::new)
            .collect();
        self.error = None;
    }

    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }
}
