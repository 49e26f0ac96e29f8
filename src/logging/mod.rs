mod entry;
mod filter;
pub mod render;
mod source;
mod storage;

pub use entry::{EventKind, LogEntry, parse_timestamp};
pub use filter::{FilterField, LogFilter};
pub use render::{ExpandedEntries, LogEntryView};
pub use source::{LogSource, parse_jsonl, read_jsonl};
pub use storage::{LogStore, distinct_modules, filter_logs, sort_newest_first};
