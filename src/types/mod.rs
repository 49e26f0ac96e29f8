use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ViewerError;

/// Newtype for language codes (`ru`, `en`, `th`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lang(pub String);

impl Lang {
    /// Create a new Lang, normalised to lowercase
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_lowercase())
    }

    /// Get a string slice of the language code
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Lang {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Lang {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for Lang {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

static CHAT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/chat/history/([^/]+)/([^/]+)/?$").expect("chat path pattern is valid")
});

/// Sender and session a chat page belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatLocation {
    pub sender_id: String,
    pub session_id: String,
}

impl ChatLocation {
    pub fn new(sender_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            session_id: session_id.into(),
        }
    }

    /// Extract the location from a page path like `/chat/history/{sender_id}/{session_id}`
    pub fn from_path(path: &str) -> Result<Self, ViewerError> {
        let captures = CHAT_PATH
            .captures(path)
            .ok_or_else(|| ViewerError::InvalidChatPath(path.to_string()))?;

        Ok(Self::new(&captures[1], &captures[2]))
    }

    /// Path of the per-language message listing for this chat
    pub fn messages_path(&self, lang: &Lang) -> String {
        format!(
            "/chat/api/messages/{}/{}/{}",
            self.sender_id, self.session_id, lang
        )
    }

    /// Path of the chat history page itself
    pub fn page_path(&self) -> String {
        format!("/chat/history/{}/{}", self.sender_id, self.session_id)
    }
}

impl fmt::Display for ChatLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sender_id, self.session_id)
    }
}
