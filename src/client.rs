use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServerConfig;
use crate::error::ViewerError;
use crate::logging::LogEntry;
use crate::types::{ChatLocation, Lang};

/// Header that makes the tunnelling provider skip its interstitial page
pub const SKIP_BROWSER_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

/// Outcome of one `POST /translate` round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateReply {
    Translated(String),
    RateLimited,
    Rejected(StatusCode),
}

/// Outcome of one per-language message listing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagesReply {
    /// HTML fragment with the whole transcript
    Messages(String),
    Error(String),
}

/// The two chat endpoints, as seen by the translation driver and the
/// language switcher.
pub trait ChatApi {
    fn translate(
        &self,
        text: &str,
        lang: &Lang,
    ) -> impl Future<Output = Result<TranslateReply, ViewerError>>;

    fn fetch_messages(
        &self,
        location: &ChatLocation,
        lang: &Lang,
    ) -> impl Future<Output = Result<MessagesReply, ViewerError>>;
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    messages: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogsResponse {
    #[serde(default)]
    logs: Option<Vec<Value>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the chat backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ServerConfig) -> Result<Self, ViewerError> {
        Self::with_base_url(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ViewerError> {
        let base_url = parse_base_url(base_url)?;
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an absolute path like `/api/logs` below the base URL
    pub fn endpoint(&self, path: &str) -> Result<Url, ViewerError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ViewerError::InvalidUrl {
                url: path.to_string(),
                message: e.to_string(),
            })
    }

    /// `GET /api/logs`. Entries that do not decode are skipped.
    pub async fn fetch_logs(&self) -> Result<Vec<LogEntry>, ViewerError> {
        let url = self.endpoint("/api/logs")?;
        tracing::debug!("Fetching logs from {url}");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        let payload: LogsResponse = serde_json::from_str(&body)?;
        if let Some(error) = payload.error {
            return Err(ViewerError::Server(error));
        }

        let logs = payload.logs.unwrap_or_default();
        let total = logs.len();
        let entries: Vec<LogEntry> = logs
            .into_iter()
            .filter_map(|value| match LogEntry::from_value(value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping undecodable log entry: {e}");
                    None
                }
            })
            .collect();

        tracing::info!("Fetched {} of {} log entries", entries.len(), total);
        Ok(entries)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ViewerError> {
    // A trailing slash keeps any path prefix when joining endpoints
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| ViewerError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}

fn error_from_body(status: StatusCode, body: &str) -> ViewerError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ViewerError::Server(parsed.error),
        Err(_) => ViewerError::Status(status),
    }
}

impl ChatApi for ApiClient {
    async fn translate(&self, text: &str, lang: &Lang) -> Result<TranslateReply, ViewerError> {
        let url = self.endpoint("/translate")?;
        tracing::debug!("Translating {} chars to {lang}", text.chars().count());

        let response = self
            .http
            .post(url)
            .json(&TranslateRequest {
                text,
                lang: lang.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(TranslateReply::RateLimited);
        }
        if !status.is_success() {
            return Ok(TranslateReply::Rejected(status));
        }

        let payload: TranslateResponse = response.json().await?;
        payload
            .translated_text
            .map(TranslateReply::Translated)
            .ok_or_else(|| ViewerError::Server("response has no translated_text".to_string()))
    }

    async fn fetch_messages(
        &self,
        location: &ChatLocation,
        lang: &Lang,
    ) -> Result<MessagesReply, ViewerError> {
        let url = self.endpoint(&location.messages_path(lang))?;
        tracing::debug!("Fetching messages from {url}");

        let response = self
            .http
            .get(url)
            .header(SKIP_BROWSER_WARNING_HEADER, "true")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        let payload: MessagesResponse = serde_json::from_str(&body)?;
        match payload {
            MessagesResponse {
                error: Some(error), ..
            } => Ok(MessagesReply::Error(error)),
            MessagesResponse {
                messages: Some(messages),
                ..
            } => Ok(MessagesReply::Messages(messages)),
            _ => Ok(MessagesReply::Error("response has no messages".to_string())),
        }
    }
}
