use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse {var} as {expected_type}: {source}")]
    ParseError {
        var: String,
        expected_type: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Where the backend lives and how long to wait for it
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Pacing of the message-by-message translation pass
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub message_delay_ms: u64,
    pub fade_ms: u64,
    pub retry_delay_ms: u64,
    pub max_retries: u32,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            message_delay_ms: 2000,
            fade_ms: 300,
            retry_delay_ms: 5000,
            max_retries: 5,
        }
    }
}

impl TranslationConfig {
    pub fn message_delay(&self) -> Duration {
        Duration::from_millis(self.message_delay_ms)
    }

    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub base_lang: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_lang: "ru".to_string(),
        }
    }
}

/// Configuration for the viewer's own diagnostics and the log source
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_file: Option<PathBuf>,
    pub rust_log: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_file: None,
            rust_log: "info".to_string(),
        }
    }
}

/// Main configuration container
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub translation: TranslationConfig,
    pub chat: ChatConfig,
    pub log: LogConfig,
}

fn parse_var<T>(var: &str, value: &str, expected_type: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().map_err(|e| ConfigError::ParseError {
        var: var.to_string(),
        expected_type: expected_type.to_string(),
        source: Box::new(e),
    })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // CHATLOG_BASE_URL
        if let Ok(base_url) = std::env::var("CHATLOG_BASE_URL") {
            config.server.base_url = base_url;
        }

        // CHATLOG_HTTP_TIMEOUT
        if let Ok(timeout_str) = std::env::var("CHATLOG_HTTP_TIMEOUT") {
            config.server.timeout_secs = parse_var("CHATLOG_HTTP_TIMEOUT", &timeout_str, "u64")?;
        }

        // CHATLOG_MESSAGE_DELAY_MS
        if let Ok(delay_str) = std::env::var("CHATLOG_MESSAGE_DELAY_MS") {
            config.translation.message_delay_ms =
                parse_var("CHATLOG_MESSAGE_DELAY_MS", &delay_str, "u64")?;
        }

        // CHATLOG_FADE_MS
        if let Ok(fade_str) = std::env::var("CHATLOG_FADE_MS") {
            config.translation.fade_ms = parse_var("CHATLOG_FADE_MS", &fade_str, "u64")?;
        }

        // CHATLOG_RETRY_DELAY_MS
        if let Ok(retry_str) = std::env::var("CHATLOG_RETRY_DELAY_MS") {
            config.translation.retry_delay_ms =
                parse_var("CHATLOG_RETRY_DELAY_MS", &retry_str, "u64")?;
        }

        // CHATLOG_MAX_RETRIES
        if let Ok(retries_str) = std::env::var("CHATLOG_MAX_RETRIES") {
            config.translation.max_retries = parse_var("CHATLOG_MAX_RETRIES", &retries_str, "u32")?;
        }

        // CHATLOG_BASE_LANG
        if let Ok(base_lang) = std::env::var("CHATLOG_BASE_LANG") {
            config.chat.base_lang = base_lang.trim().to_lowercase();
        }

        // CHATLOG_LOG_FILE
        if let Ok(log_file) = std::env::var("CHATLOG_LOG_FILE")
            && !log_file.is_empty()
        {
            config.log.log_file = Some(PathBuf::from(log_file));
        }

        // RUST_LOG
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            config.log.rust_log = rust_log;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if reqwest::Url::parse(&self.server.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                var: "CHATLOG_BASE_URL".to_string(),
                message: format!("{:?} is not an absolute URL", self.server.base_url),
            });
        }

        if self.server.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "CHATLOG_HTTP_TIMEOUT".to_string(),
                message: "timeout must be greater than 0".to_string(),
            });
        }

        if self.translation.retry_delay_ms == 0 {
            return Err(ConfigError::InvalidValue {
                var: "CHATLOG_RETRY_DELAY_MS".to_string(),
                message: "retry delay must be greater than 0".to_string(),
            });
        }

        if self.chat.base_lang.is_empty() {
            return Err(ConfigError::InvalidValue {
                var: "CHATLOG_BASE_LANG".to_string(),
                message: "base language must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
