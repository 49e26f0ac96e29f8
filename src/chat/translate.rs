use std::time::Duration;

use tokio::time::sleep;

use crate::chat::i18n;
use crate::chat::surface::{ChatSurface, MessageStatus};
use crate::client::{ChatApi, TranslateReply};
use crate::config::TranslationConfig;
use crate::types::Lang;

/// Bounded exponential backoff for rate-limited translations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(initial_delay: Duration, max_retries: u32) -> Self {
        Self {
            initial_delay,
            max_retries,
        }
    }

    /// Wait before retry number `retry` (1-based): initial, 2x, 4x, ...
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 5)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Translated,
    /// Original text restored after a non-retryable failure
    Failed(String),
    /// Original text restored after running out of retries
    RateLimitExhausted { retries: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationReport {
    pub lang: Lang,
    pub outcomes: Vec<MessageOutcome>,
}

impl TranslationReport {
    pub fn translated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, MessageOutcome::Translated))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.translated()
    }
}

/// Translates a chat in place, one message at a time.
///
/// Messages are never translated concurrently: each one waits for the
/// previous to finish (retries included) plus `message_delay`.
pub struct TranslationDriver<A> {
    api: A,
    policy: RetryPolicy,
    message_delay: Duration,
    fade: Duration,
}

impl<A: ChatApi> TranslationDriver<A> {
    pub fn new(api: A, config: &TranslationConfig) -> Self {
        Self {
            api,
            policy: RetryPolicy::new(config.retry_delay(), config.max_retries),
            message_delay: config.message_delay(),
            fade: config.fade(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn translate_chat<S: ChatSurface>(
        &self,
        surface: &mut S,
        lang: &Lang,
    ) -> TranslationReport {
        let count = surface.message_count();
        tracing::info!("Translating chat to {lang}: {count} messages, one at a time");

        surface.set_controls_enabled(false);
        surface.set_active_language(lang);

        let mut outcomes = Vec::with_capacity(count);
        for index in 0..count {
            if index > 0 {
                sleep(self.message_delay).await;
            }
            outcomes.push(self.translate_message(surface, index, lang).await);
        }

        if let Some(title) = i18n::title_for(lang) {
            surface.set_title(title);
        }
        surface.set_controls_enabled(true);

        let report = TranslationReport {
            lang: lang.clone(),
            outcomes,
        };
        tracing::info!(
            "Chat translation to {lang} finished: {} translated, {} kept original",
            report.translated(),
            report.failed()
        );
        report
    }

    pub async fn translate_message<S: ChatSurface>(
        &self,
        surface: &mut S,
        index: usize,
        lang: &Lang,
    ) -> MessageOutcome {
        let Some(original) = surface.message_text(index) else {
            return MessageOutcome::Failed(format!("no message at index {index}"));
        };

        let mut retries = 0;
        loop {
            surface.set_status(index, MessageStatus::Translating);

            match self.api.translate(&original, lang).await {
                Ok(TranslateReply::Translated(text)) => {
                    surface.set_opacity(index, 0.0);
                    sleep(self.fade).await;
                    surface.set_text(index, &text);
                    surface.set_opacity(index, 1.0);
                    tracing::debug!("Message #{index} translated");
                    return MessageOutcome::Translated;
                }
                Ok(TranslateReply::RateLimited) if retries < self.policy.max_retries => {
                    retries += 1;
                    let wait = self.policy.delay_for(retries);
                    tracing::warn!(
                        "Rate limit exceeded on message #{index}, retry {retries}/{} in {wait:?}",
                        self.policy.max_retries
                    );
                    surface.set_status(
                        index,
                        MessageStatus::Retrying {
                            attempt: retries,
                            wait,
                        },
                    );
                    sleep(wait).await;
                }
                Ok(TranslateReply::RateLimited) => {
                    tracing::error!(
                        "Giving up on message #{index} after {retries} rate-limited retries"
                    );
                    surface.set_text(index, &original);
                    return MessageOutcome::RateLimitExhausted { retries };
                }
                Ok(TranslateReply::Rejected(status)) => {
                    tracing::error!("Translation failed for message #{index}: {status}");
                    surface.set_text(index, &original);
                    return MessageOutcome::Failed(format!("HTTP {status}"));
                }
                Err(e) => {
                    tracing::error!("Translation error for message #{index}: {e}");
                    surface.set_text(index, &original);
                    return MessageOutcome::Failed(e.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::fragment::{ChatMessage, Role};
    use crate::chat::surface::Transcript;
    use crate::chat::testing::ScriptedApi;
    use crate::error::ViewerError;
    use reqwest::StatusCode;
    use tokio::time::Instant;

    fn config() -> TranslationConfig {
        TranslationConfig::default()
    }

    fn transcript(texts: &[&str]) -> Transcript {
        Transcript::new(
            Lang::new("ru"),
            texts
                .iter()
                .map(|t| ChatMessage::new(Role::User, *t))
                .collect(),
        )
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_once_then_translated() {
        let api = ScriptedApi::with_replies(vec![
            Ok(TranslateReply::RateLimited),
            Ok(TranslateReply::Translated("Hello".to_string())),
        ]);
        let driver = TranslationDriver::new(api, &config());
        let mut chat = transcript(&["Привет"]);

        let start = Instant::now();
        let report = driver.translate_chat(&mut chat, &Lang::new("en")).await;

        assert_eq!(report.outcomes, vec![MessageOutcome::Translated]);
        assert_eq!(chat.texts(), vec!["Hello"]);
        assert!(start.elapsed() >= Duration::from_secs(5));

        let calls = driver.api().translate_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "Привет");
        assert_eq!(calls[1].0, "Привет");
        assert!(calls[1].1 - calls[0].1 >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_restores_original_and_continues() {
        let api = ScriptedApi::with_replies(vec![
            Ok(TranslateReply::Rejected(StatusCode::INTERNAL_SERVER_ERROR)),
            Err(ViewerError::Server("connection reset".to_string())),
            Ok(TranslateReply::Translated("Third".to_string())),
        ]);
        let driver = TranslationDriver::new(api, &config());
        let mut chat = transcript(&["Первое", "Второе", "Третье"]);

        let report = driver.translate_chat(&mut chat, &Lang::new("en")).await;

        assert_eq!(chat.texts(), vec!["Первое", "Второе", "Third"]);
        assert!(matches!(report.outcomes[0], MessageOutcome::Failed(ref m) if m.contains("500")));
        assert!(matches!(report.outcomes[1], MessageOutcome::Failed(_)));
        assert_eq!(report.outcomes[2], MessageOutcome::Translated);
        assert_eq!(report.translated(), 1);
        assert_eq!(report.failed(), 2);
        assert!(chat.messages.iter().all(|m| m.status == MessageStatus::Idle));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_are_bounded() {
        let api = ScriptedApi::with_replies(vec![
            Ok(TranslateReply::RateLimited),
            Ok(TranslateReply::RateLimited),
            Ok(TranslateReply::RateLimited),
        ]);
        let config = TranslationConfig {
            max_retries: 2,
            ..config()
        };
        let driver = TranslationDriver::new(api, &config);
        let mut chat = transcript(&["Привет"]);

        let start = Instant::now();
        let report = driver.translate_chat(&mut chat, &Lang::new("th")).await;

        assert_eq!(
            report.outcomes,
            vec![MessageOutcome::RateLimitExhausted { retries: 2 }]
        );
        assert_eq!(chat.texts(), vec!["Привет"]);
        assert_eq!(driver.api().translate_calls().len(), 3);
        // 5s + 10s of backoff
        assert!(start.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_messages_are_paced() {
        let driver = TranslationDriver::new(ScriptedApi::default(), &config());
        let mut chat = transcript(&["один", "два", "три"]);

        let start = Instant::now();
        driver.translate_chat(&mut chat, &Lang::new("en")).await;

        let calls = driver.api().translate_calls();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            // fade of the previous message plus the pause
            assert!(pair[1].1 - pair[0].1 >= Duration::from_millis(2300));
        }
        // No pause after the last message
        assert!(start.elapsed() < Duration::from_millis(3 * 300 + 2 * 2000 + 100));
        assert_eq!(chat.texts(), vec!["[en] один", "[en] два", "[en] три"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_controls_and_title() {
        let driver = TranslationDriver::new(ScriptedApi::default(), &config());
        let mut chat = transcript(&["Привет"]);
        chat.set_controls_enabled(true);

        driver.translate_chat(&mut chat, &Lang::new("en")).await;

        assert!(chat.controls_enabled);
        assert_eq!(chat.title, "Chat History");
        assert_eq!(chat.active_lang, Lang::new("en"));
        assert_eq!(chat.messages[0].opacity, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_controls_disabled_while_translating() {
        struct RecordingSurface {
            inner: Transcript,
            enabled_during_calls: Vec<bool>,
        }

        impl ChatSurface for RecordingSurface {
            fn message_count(&self) -> usize {
                self.inner.message_count()
            }
            fn message_text(&self, index: usize) -> Option<String> {
                self.inner.message_text(index)
            }
            fn set_status(&mut self, index: usize, status: MessageStatus) {
                if status == MessageStatus::Translating {
                    self.enabled_during_calls.push(self.inner.controls_enabled);
                }
                self.inner.set_status(index, status);
            }
            fn set_text(&mut self, index: usize, text: &str) {
                self.inner.set_text(index, text);
            }
            fn set_opacity(&mut self, index: usize, opacity: f32) {
                self.inner.set_opacity(index, opacity);
            }
            fn set_controls_enabled(&mut self, enabled: bool) {
                self.inner.set_controls_enabled(enabled);
            }
            fn set_active_language(&mut self, lang: &Lang) {
                self.inner.set_active_language(lang);
            }
            fn set_title(&mut self, title: &str) {
                self.inner.set_title(title);
            }
            fn set_container_opacity(&mut self, opacity: f32) {
                self.inner.set_container_opacity(opacity);
            }
            fn replace_content(&mut self, fragment: &str) {
                self.inner.replace_content(fragment);
            }
            fn show_error(&mut self, message: &str) {
                self.inner.show_error(message);
            }
            fn scroll_to_top(&mut self) {
                self.inner.scroll_to_top();
            }
        }

        let driver = TranslationDriver::new(ScriptedApi::default(), &config());
        let mut surface = RecordingSurface {
            inner: transcript(&["a", "b"]),
            enabled_during_calls: Vec::new(),
        };

        driver.translate_chat(&mut surface, &Lang::new("en")).await;

        assert_eq!(surface.enabled_during_calls, vec![false, false]);
        assert!(surface.inner.controls_enabled);
    }
}
