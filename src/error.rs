use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server returned error: {0}")]
    Server(String),

    #[error("Server returned unexpected status: {0}")]
    Status(StatusCode),

    #[error("Not a chat history path: {0}")]
    InvalidChatPath(String),

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),
}
