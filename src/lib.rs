pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod run;
pub mod types;
pub mod watcher;

pub use cli::CliOptions;
pub use client::{ApiClient, ChatApi};
pub use config::Config;
pub use error::ViewerError;
