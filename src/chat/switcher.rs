use std::time::Duration;

use reqwest::Url;
use tokio::time::sleep;

use crate::chat::surface::{ChatSurface, Transcript};
use crate::client::{ChatApi, MessagesReply};
use crate::error::ViewerError;
use crate::types::{ChatLocation, Lang};

/// What happened after a language was picked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The base language is server-rendered: load this page instead
    Reload(Url),
    /// The transcript was swapped for the per-language listing
    Replaced { messages: usize },
    /// An inline error was shown in place of the transcript
    Failed(String),
}

/// Language requested by the page's `lang` query parameter
pub fn initial_language(page_url: &Url, default: &Lang) -> Lang {
    page_url
        .query_pairs()
        .find(|(key, _)| key == "lang")
        .map(|(_, value)| Lang::new(value.into_owned()))
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| default.clone())
}

/// Same page with `lang` set to the given language, other parameters kept
pub fn reload_url(page_url: &Url, lang: &Lang) -> Url {
    let others: Vec<(String, String)> = page_url
        .query_pairs()
        .filter(|(key, _)| key != "lang")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = page_url.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(others)
        .append_pair("lang", lang.as_str());
    url
}

pub struct LanguageSwitcher<A> {
    api: A,
    base_lang: Lang,
    fade: Duration,
}

impl<A: ChatApi> LanguageSwitcher<A> {
    pub fn new(api: A, base_lang: Lang, fade: Duration) -> Self {
        Self {
            api,
            base_lang,
            fade,
        }
    }

    pub fn base_lang(&self) -> &Lang {
        &self.base_lang
    }

    /// Fetch the transcript of a chat in one language
    pub async fn load(
        &self,
        location: &ChatLocation,
        lang: &Lang,
    ) -> Result<Transcript, ViewerError> {
        match self.api.fetch_messages(location, lang).await? {
            MessagesReply::Messages(fragment) => {
                Ok(Transcript::from_fragment(lang.clone(), &fragment))
            }
            MessagesReply::Error(error) => Err(ViewerError::Server(error)),
        }
    }

    pub async fn select<S: ChatSurface>(
        &self,
        page_url: &Url,
        lang: &Lang,
        surface: &mut S,
    ) -> SwitchOutcome {
        surface.set_active_language(lang);

        if *lang == self.base_lang {
            let url = reload_url(page_url, lang);
            tracing::info!("Switching back to {lang}, reloading {url}");
            return SwitchOutcome::Reload(url);
        }

        let reply = match ChatLocation::from_path(page_url.path()) {
            Ok(location) => self.api.fetch_messages(&location, lang).await,
            Err(e) => Err(e),
        };

        match reply {
            Ok(MessagesReply::Messages(fragment)) => {
                surface.set_container_opacity(0.0);
                sleep(self.fade).await;
                surface.replace_content(&fragment);
                surface.set_container_opacity(1.0);
                surface.scroll_to_top();

                let messages = surface.message_count();
                tracing::info!("Switched chat to {lang}: {messages} messages");
                SwitchOutcome::Replaced { messages }
            }
            Ok(MessagesReply::Error(error)) => {
                tracing::warn!("Server refused messages in {lang}: {error}");
                surface.show_error(&format!("Ошибка загрузки сообщений: {error}"));
                SwitchOutcome::Failed(error)
            }
            Err(e) => {
                tracing::error!("Failed to load messages in {lang}: {e}");
                let message = e.to_string();
                surface.show_error(&format!("Ошибка загрузки сообщений: {message}"));
                SwitchOutcome::Failed(message)
            }
        }
    }
}
