use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::logging::{FilterField, LogFilter};

/// Options parsed from command line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "chatlog-viewer", version, about)]
pub struct CliOptions {
    /// Override the backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch, filter and render function-call logs
    Logs(LogsArgs),

    /// Read and translate chat histories
    #[command(subcommand)]
    Chat(ChatCommand),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Html,
    /// JSON Lines of the filtered entries
    Json,
}

#[derive(Args, Debug, Clone, Default)]
pub struct LogsArgs {
    /// Read a local JSON Lines file instead of the backend
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Case-insensitive text anywhere in the entry
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub module: Option<String>,

    /// function_start, function_end, function_error or any raw event name
    #[arg(long)]
    pub event: Option<String>,

    /// Lower time bound, e.g. 2025-01-10T09:30
    #[arg(long)]
    pub from: Option<String>,

    /// Upper time bound, e.g. 2025-01-10T18:00
    #[arg(long)]
    pub to: Option<String>,

    /// Only the last N minutes (overrides --from/--to)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(i64).range(0..))]
    pub last_minutes: Option<i64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Show parameters, results and errors of every entry
    #[arg(long)]
    pub expand: bool,

    /// List the modules present in the log instead of the entries
    #[arg(long)]
    pub modules: bool,

    /// Re-render whenever the log file changes (requires --file)
    #[arg(long, requires = "file")]
    pub watch: bool,
}

impl LogsArgs {
    /// Filter described by the flags, relative to `now` for --last-minutes
    pub fn filter(&self, now: NaiveDateTime) -> LogFilter {
        let mut filter = LogFilter::default();

        let fields = [
            self.search.clone().map(FilterField::Search),
            self.module.clone().map(FilterField::Module),
            self.event.clone().map(FilterField::Event),
            self.from.clone().map(FilterField::TimeFrom),
            self.to.clone().map(FilterField::TimeTo),
        ];
        for field in fields.into_iter().flatten() {
            filter.apply(field);
        }

        if let Some(minutes) = self.last_minutes {
            filter.set_last_minutes(now, minutes);
        }
        filter
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ChatCommand {
    /// Print a chat history in one language
    Show {
        /// Page URL or path, e.g. /chat/history/{sender_id}/{session_id}?lang=en
        page: String,

        /// Language to show; defaults to the page's lang parameter
        #[arg(long)]
        lang: Option<String>,
    },

    /// Translate a chat message by message through /translate
    Translate {
        page: String,

        #[arg(long)]
        lang: String,
    },

    /// Switch a chat to another language the way the page's language picker does
    Switch {
        page: String,

        #[arg(long)]
        lang: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_logs_command() {
        let opts = CliOptions::parse_from([
            "chatlog-viewer",
            "logs",
            "--search",
            "timeout",
            "--event",
            "function_error",
            "--format",
            "json",
            "--expand",
        ]);
        let Command::Logs(args) = opts.command else {
            panic!("expected logs command");
        };
        assert_eq!(args.search.as_deref(), Some("timeout"));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.expand);
        assert!(!args.watch);
        assert!(opts.base_url.is_none());
    }

    #[test]
    fn test_parse_chat_command_with_global_base_url() {
        let opts = CliOptions::parse_from([
            "chatlog-viewer",
            "chat",
            "translate",
            "/chat/history/s1/x9",
            "--lang",
            "en",
            "--base-url",
            "http://backend.test",
        ]);
        assert_eq!(opts.base_url.as_deref(), Some("http://backend.test"));
        match opts.command {
            Command::Chat(ChatCommand::Translate { page, lang }) => {
                assert_eq!(page, "/chat/history/s1/x9");
                assert_eq!(lang, "en");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_watch_requires_file() {
        let result = CliOptions::try_parse_from(["chatlog-viewer", "logs", "--watch"]);
        assert!(result.is_err());

        let result =
            CliOptions::try_parse_from(["chatlog-viewer", "logs", "--watch", "--file", "a.jsonl"]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_filter_from_args() {
        let args = LogsArgs {
            module: Some("orders".to_string()),
            from: Some("2025-01-10T09:30".to_string()),
            to: Some("not a date".to_string()),
            ..Default::default()
        };
        let filter = args.filter(now());
        assert_eq!(filter.module(), Some("orders"));
        assert!(filter.time_from.is_some());
        assert!(filter.time_to.is_none());
    }

    #[test]
    fn test_last_minutes_flag_range() {
        let result =
            CliOptions::try_parse_from(["chatlog-viewer", "logs", "--last-minutes", "-5"]);
        assert!(result.is_err());

        let opts = CliOptions::parse_from([
            "chatlog-viewer",
            "logs",
            "--last-minutes",
            "1000000000000",
        ]);
        let Command::Logs(args) = opts.command else {
            panic!("expected logs command");
        };
        // Huge spans degrade to "everything up to now"
        let filter = args.filter(now());
        assert_eq!(filter.time_from, None);
        assert_eq!(filter.time_to, Some(now()));
    }

    #[test]
    fn test_last_minutes_overrides_bounds() {
        let args = LogsArgs {
            from: Some("2020-01-01T00:00".to_string()),
            last_minutes: Some(15),
            ..Default::default()
        };
        let filter = args.filter(now());
        assert_eq!(filter.time_to, Some(now()));
        assert_eq!(
            filter.time_from,
            Some(now() - chrono::Duration::minutes(15))
        );
    }
}
