use std::path::{Path, PathBuf};

use crate::client::ApiClient;
use crate::error::ViewerError;
use crate::logging::LogEntry;

/// Where the full log set comes from
#[derive(Debug, Clone)]
pub enum LogSource {
    /// `GET /api/logs` on the backend
    Api(ApiClient),
    /// A local JSON Lines file
    File(PathBuf),
}

impl LogSource {
    pub async fn load(&self) -> Result<Vec<LogEntry>, ViewerError> {
        match self {
            LogSource::Api(client) => client.fetch_logs().await,
            LogSource::File(path) => read_jsonl(path).await,
        }
    }

    pub fn file_path(&self) -> Option<&Path> {
        match self {
            LogSource::File(path) => Some(path),
            LogSource::Api(_) => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            LogSource::Api(client) => format!("{}api/logs", client.base_url()),
            LogSource::File(path) => path.display().to_string(),
        }
    }
}

/// Parse JSON Lines, skipping blank and undecodable lines
pub fn parse_jsonl(text: &str) -> Vec<LogEntry> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| {
            match serde_json::from_str(line.trim()).and_then(LogEntry::from_value) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!("Skipping line {}: {e}", index + 1);
                    None
                }
            }
        })
        .collect()
}

pub async fn read_jsonl(path: &Path) -> Result<Vec<LogEntry>, ViewerError> {
    let text = tokio::fs::read_to_string(path).await?;
    let entries = parse_jsonl(&text);
    tracing::info!("Read {} log entries from {}", entries.len(), path.display());
    Ok(entries)
}
