use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message of a chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// `HH:MM`, when the server knew when the message was sent
    pub time: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            time: None,
        }
    }

    pub fn at(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}

static MESSAGE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r#"(?s)<div class="message (user|model)">\s*"#,
        r#"<div class="message-content">(.*?)</div>\s*"#,
        r#"(?:<div class="timestamp">([^<]*)</div>\s*)?"#,
        r#"</div>"#
    ))
    .expect("message block pattern is valid")
});

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"));

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Read the messages out of the server's chat fragment. Markup that is not a
/// message block is ignored.
pub fn parse_fragment(html: &str) -> Vec<ChatMessage> {
    MESSAGE_BLOCK
        .captures_iter(html)
        .map(|caps| {
            let role = if &caps[1] == "user" {
                Role::User
            } else {
                Role::Model
            };
            let content = LINE_BREAK.replace_all(caps[2].trim(), "\n");
            ChatMessage {
                role,
                text: unescape(&content),
                time: caps
                    .get(3)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|t| !t.is_empty()),
            }
        })
        .collect()
}

/// Lay messages out the way the server does
pub fn render_fragment(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|message| {
            let content = escape(&message.text).replace('\n', "<br>");
            let time = message
                .time
                .as_ref()
                .map(|t| format!(r#"<div class="timestamp">{}</div>"#, escape(t)))
                .unwrap_or_default();
            format!(
                r#"<div class="message {}"><div class="message-content">{content}</div>{time}</div>"#,
                message.role
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
