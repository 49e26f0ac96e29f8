//! Turning log entries into something to look at.
//!
//! [`LogEntryView`] is the view-model: every display decision (labels,
//! placeholders, which detail sections exist) is made there, without any
//! markup. The `render_*` functions only lay a view out as HTML or as
//! terminal text.

use std::collections::HashSet;

use chrono::{Datelike, Timelike};
use serde_json::Value;

use crate::logging::{LogEntry, parse_timestamp};

pub const UNKNOWN_LABEL: &str = "unknown";
pub const ERROR_TYPE_PLACEHOLDER: &str = "Неизвестно";
pub const ERROR_MESSAGE_PLACEHOLDER: &str = "Нет сообщения";
pub const NO_LOGS_MESSAGE: &str = "Логи не найдены";

const PARAMETERS_TITLE: &str = "Параметры";
const RESULT_TITLE: &str = "Результат";
const ERROR_TITLE: &str = "Ошибка";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub error_type: String,
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntryView {
    pub timestamp: String,
    pub module: String,
    pub function: String,
    /// Raw event value, used as a style class
    pub event: String,
    pub event_label: String,
    pub execution_time: Option<String>,
    pub parameters: Option<String>,
    pub result: Option<String>,
    pub error: Option<ErrorView>,
}

impl LogEntryView {
    pub fn has_details(&self) -> bool {
        self.parameters.is_some() || self.result.is_some() || self.error.is_some()
    }
}

impl From<&LogEntry> for LogEntryView {
    fn from(entry: &LogEntry) -> Self {
        let error = entry.has_error().then(|| ErrorView {
            error_type: entry
                .error_type()
                .unwrap_or(ERROR_TYPE_PLACEHOLDER)
                .to_string(),
            error_message: entry
                .error_message()
                .unwrap_or(ERROR_MESSAGE_PLACEHOLDER)
                .to_string(),
        });

        Self {
            timestamp: format_log_timestamp(&entry.timestamp),
            module: label_or_unknown(entry.module.as_deref()),
            function: label_or_unknown(entry.function.as_deref()),
            event: entry.event_str().unwrap_or_default().to_string(),
            event_label: entry
                .event
                .as_ref()
                .map(|event| event.label().to_string())
                .unwrap_or_default(),
            execution_time: entry
                .execution_time_ms
                .filter(|ms| *ms != 0.0)
                .map(format_execution_time),
            parameters: entry
                .parameters
                .as_ref()
                .filter(|params| has_content(params))
                .map(pretty_json),
            result: entry.result.as_ref().map(pretty_json),
            error,
        }
    }
}

fn label_or_unknown(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}

// Scalars and empty containers carry nothing worth a section
fn has_content(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn format_execution_time(ms: f64) -> String {
    format!("{ms}ms")
}

/// `DD.MM HH:MM:SS` without the year. Unparsable input is shown as-is.
pub fn format_log_timestamp(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match parse_timestamp(raw) {
        Some(ts) => format!(
            "{:02}.{:02} {:02}:{:02}:{:02}",
            ts.day(),
            ts.month(),
            ts.hour(),
            ts.minute(),
            ts.second()
        ),
        None => raw.to_string(),
    }
}

/// Which entries of the current view are expanded. Purely visual; reset
/// whenever the view is rebuilt.
#[derive(Debug, Clone, Default)]
pub struct ExpandedEntries {
    all: bool,
    toggled: HashSet<usize>,
}

impl ExpandedEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_expanded() -> Self {
        Self {
            all: true,
            toggled: HashSet::new(),
        }
    }

    /// Flip one entry; returns its new state
    pub fn toggle(&mut self, index: usize) -> bool {
        if !self.toggled.remove(&index) {
            self.toggled.insert(index);
        }
        self.is_expanded(index)
    }

    pub fn is_expanded(&self, index: usize) -> bool {
        self.all != self.toggled.contains(&index)
    }

    pub fn reset(&mut self) {
        self.toggled.clear();
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn html_section(title: &str, class: &str, body: &str) -> String {
    format!(
        r#"<div class="log-section"><div class="log-section-title">{title}</div><div class="log-section-content {class}">{}</div></div>"#,
        html_escape(body)
    )
}

pub fn render_entry_html(view: &LogEntryView, expanded: bool) -> String {
    let mut details = String::new();
    if let Some(ref parameters) = view.parameters {
        details.push_str(&html_section(PARAMETERS_TITLE, "log-parameters", parameters));
    }
    if let Some(ref result) = view.result {
        details.push_str(&html_section(RESULT_TITLE, "log-result", result));
    }
    if let Some(ref error) = view.error {
        let body = format!(
            "Тип: {}\nСообщение: {}",
            error.error_type, error.error_message
        );
        details.push_str(&html_section(ERROR_TITLE, "log-error", &body));
    }

    let event = html_escape(&view.event);
    let class = if expanded {
        "log-entry expanded"
    } else {
        "log-entry"
    };
    let execution_time = view
        .execution_time
        .as_ref()
        .map(|t| format!(r#"<span class="log-execution-time">{}</span>"#, html_escape(t)))
        .unwrap_or_default();
    let details = if details.is_empty() {
        details
    } else {
        format!(r#"<div class="log-details">{details}</div>"#)
    };

    format!(
        concat!(
            r#"<div class="{class}" data-event="{event}">"#,
            r#"<div class="log-header"><div class="log-meta">"#,
            r#"<span class="log-timestamp">{timestamp}</span>"#,
            r#"<span class="log-module">{module}</span>"#,
            r#"<span class="log-function">{function}</span>"#,
            r#"<span class="log-event {event}">{label}</span>"#,
            r#"</div>{execution_time}</div>{details}</div>"#
        ),
        class = class,
        event = event,
        timestamp = html_escape(&view.timestamp),
        module = html_escape(&view.module),
        function = html_escape(&view.function),
        label = html_escape(&view.event_label),
        execution_time = execution_time,
        details = details,
    )
}

/// Render an already filtered and sorted view
pub fn render_html(entries: &[LogEntry], expanded: &ExpandedEntries) -> String {
    if entries.is_empty() {
        return format!(r#"<div class="no-logs">{NO_LOGS_MESSAGE}</div>"#);
    }
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            render_entry_html(&LogEntryView::from(entry), expanded.is_expanded(index))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_error_html(message: &str) -> String {
    format!(
        r#"<div class="no-logs log-load-error">{}</div>"#,
        html_escape(message)
    )
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_entry_text(view: &LogEntryView, expanded: bool) -> String {
    let marker = match (view.has_details(), expanded) {
        (false, _) => ' ',
        (true, false) => '▸',
        (true, true) => '▾',
    };
    let mut output = format!(
        "{marker} {} | {} | {} | {}",
        view.timestamp, view.module, view.function, view.event_label
    );
    if let Some(ref execution_time) = view.execution_time {
        output.push_str(&format!(" | {execution_time}"));
    }

    if expanded {
        if let Some(ref parameters) = view.parameters {
            output.push_str(&format!("\n    {PARAMETERS_TITLE}:\n{}", indent(parameters, "      ")));
        }
        if let Some(ref result) = view.result {
            output.push_str(&format!("\n    {RESULT_TITLE}:\n{}", indent(result, "      ")));
        }
        if let Some(ref error) = view.error {
            output.push_str(&format!(
                "\n    {ERROR_TITLE}:\n      Тип: {}\n      Сообщение: {}",
                error.error_type, error.error_message
            ));
        }
    }

    output
}

pub fn render_text(entries: &[LogEntry], expanded: &ExpandedEntries) -> String {
    if entries.is_empty() {
        return NO_LOGS_MESSAGE.to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            render_entry_text(&LogEntryView::from(entry), expanded.is_expanded(index))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
