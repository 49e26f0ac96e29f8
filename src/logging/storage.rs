use std::collections::BTreeSet;

use crate::logging::{FilterField, LogEntry, LogFilter};

/// Filter the full set and sort the survivors newest first.
///
/// Pure: the same inputs always give the same output and `entries` is left
/// untouched. Unparsable timestamps sort after every parsable one.
pub fn filter_logs(entries: &[LogEntry], filter: &LogFilter) -> Vec<LogEntry> {
    let mut result: Vec<LogEntry> = entries
        .iter()
        .filter(|entry| entry.matches(filter))
        .cloned()
        .collect();

    sort_newest_first(&mut result);
    result
}

/// Stable sort by timestamp descending; `None` orders below any date.
pub fn sort_newest_first(entries: &mut [LogEntry]) {
    entries.sort_by_cached_key(|entry| std::cmp::Reverse(entry.parsed_timestamp()));
}

/// Distinct non-empty module names, sorted
pub fn distinct_modules(entries: &[LogEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| entry.module.as_deref())
        .filter(|module| !module.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The viewer's state: the loaded log set, the current filter and the
/// filtered view derived from both.
#[derive(Debug, Clone, Default)]
pub struct LogStore {
    entries: Vec<LogEntry>,
    filter: LogFilter,
    filtered: Vec<LogEntry>,
    modules: Vec<String>,
}

impl LogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole log set, as on load or refresh
    pub fn replace_all(&mut self, entries: Vec<LogEntry>) {
        self.entries = entries;
        self.modules = distinct_modules(&self.entries);
        self.refilter();
        tracing::info!(
            "Loaded {} log entries ({} modules)",
            self.entries.len(),
            self.modules.len()
        );
    }

    pub fn update_filter(&mut self, field: FilterField) {
        tracing::debug!("Filter update: {field:?}");
        self.filter.apply(field);
        self.refilter();
    }

    pub fn set_filter(&mut self, filter: LogFilter) {
        self.filter = filter;
        self.refilter();
    }

    pub fn clear_filters(&mut self) {
        self.set_filter(LogFilter::default());
    }

    fn refilter(&mut self) {
        self.filtered = filter_logs(&self.entries, &self.filter);
        tracing::debug!(
            "Filtered view: {} of {} entries",
            self.filtered.len(),
            self.entries.len()
        );
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn filter(&self) -> &LogFilter {
        &self.filter
    }

    pub fn filtered(&self) -> &[LogEntry] {
        &self.filtered
    }

    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The filtered view as JSON Lines, or `None` when there is nothing to copy
    pub fn export_jsonl(&self) -> Option<String> {
        if self.filtered.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .filtered
            .iter()
            .map(LogEntry::to_json)
            .collect();
        Some(lines.join("\n"))
    }
}
