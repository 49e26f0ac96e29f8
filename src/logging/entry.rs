use std::fmt;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::logging::LogFilter;

/// Kind of event a log line records. Unknown kinds keep their raw value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    FunctionStart,
    FunctionEnd,
    FunctionError,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::FunctionStart => "function_start",
            EventKind::FunctionEnd => "function_end",
            EventKind::FunctionError => "function_error",
            EventKind::Other(raw) => raw,
        }
    }

    /// Human label shown in the viewer
    pub fn label(&self) -> &str {
        match self {
            EventKind::FunctionStart => "Начало",
            EventKind::FunctionEnd => "Завершение",
            EventKind::FunctionError => "Ошибка",
            EventKind::Other(raw) => raw,
        }
    }
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "function_start" => EventKind::FunctionStart,
            "function_end" => EventKind::FunctionEnd,
            "function_error" => EventKind::FunctionError,
            _ => EventKind::Other(value),
        }
    }
}

impl From<&str> for EventKind {
    fn from(value: &str) -> Self {
        value.to_string().into()
    }
}

impl From<EventKind> for String {
    fn from(value: EventKind) -> Self {
        match value {
            EventKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One JSON Lines record written by the application logger.
///
/// Decoding is lenient: a field of the wrong JSON type degrades to its JSON
/// text (or to nothing) instead of rejecting the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub module: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub function: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_event",
        skip_serializing_if = "Option::is_none"
    )]
    pub event: Option<EventKind>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    /// `Some(Value::Null)` when the key is present with a null value
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub error_message: Option<String>,
    /// Keys this viewer does not interpret; kept so search sees them
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// The record as it was read, when it came from JSON
    #[serde(skip)]
    pub raw: Option<Value>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

fn value_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| value_text(v).unwrap_or_default())
}

fn lenient_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(value_text)
}

fn lenient_event<'de, D>(deserializer: D) -> Result<Option<EventKind>, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_opt_text(deserializer).map(|text| text.map(EventKind::from))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|v| v.as_f64())
}

impl LogEntry {
    pub fn new(timestamp: impl Into<String>, event: impl Into<EventKind>) -> Self {
        Self {
            timestamp: timestamp.into(),
            module: None,
            function: None,
            event: Some(event.into()),
            execution_time_ms: None,
            parameters: None,
            result: None,
            error_type: None,
            error_message: None,
            extra: Map::new(),
            raw: None,
        }
    }

    /// Decode a record, keeping the source JSON for search and export
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let mut entry: LogEntry = serde_json::from_value(value.clone())?;
        entry.raw = Some(value);
        Ok(entry)
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.timestamp)
    }

    pub fn event_str(&self) -> Option<&str> {
        self.event.as_ref().map(EventKind::as_str)
    }

    /// Error type, when present and non-empty
    pub fn error_type(&self) -> Option<&str> {
        self.error_type.as_deref().filter(|t| !t.is_empty())
    }

    /// Error message, when present and non-empty
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref().filter(|m| !m.is_empty())
    }

    pub fn has_error(&self) -> bool {
        self.error_type().is_some() || self.error_message().is_some()
    }

    /// JSON text of the record: the source as read, or a fresh serialization
    pub fn to_json(&self) -> String {
        match self.raw {
            Some(ref raw) => raw.to_string(),
            None => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// True when the entry passes every active predicate of `filter`
    pub fn matches(&self, filter: &LogFilter) -> bool {
        if let Some(search) = filter.search()
            && !self.matches_search(search)
        {
            return false;
        }

        if let Some(module) = filter.module()
            && self.module.as_deref() != Some(module)
        {
            return false;
        }

        if let Some(event) = filter.event()
            && self.event_str() != Some(event)
        {
            return false;
        }

        if filter.has_time_range() {
            // Unparsable timestamps cannot be placed inside any range
            let Some(timestamp) = self.parsed_timestamp() else {
                return false;
            };
            if let Some(from) = filter.time_from
                && timestamp < from
            {
                return false;
            }
            if let Some(to) = filter.time_to
                && timestamp > to
            {
                return false;
            }
        }

        true
    }

    /// Case-insensitive substring search over the whole serialized entry
    fn matches_search(&self, search: &str) -> bool {
        self.to_json()
            .to_lowercase()
            .contains(&search.to_lowercase())
    }
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp into local wall-clock time.
///
/// Timestamps without an offset are taken as local time already; RFC 3339
/// timestamps with an offset and bare dates (UTC midnight) are converted to
/// the local zone.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.with_timezone(&Local).naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            // A bare date is midnight UTC, shown in the local zone
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc().with_timezone(&Local).naive_local())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    fn parse_entry(value: Value) -> LogEntry {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_event_kind_roundtrip_keeps_unknown_values() {
        assert_eq!(EventKind::from("function_start"), EventKind::FunctionStart);
        assert_eq!(
            EventKind::from("cache_miss"),
            EventKind::Other("cache_miss".to_string())
        );
        assert_eq!(String::from(EventKind::FunctionError), "function_error");
        assert_eq!(EventKind::from("cache_miss").label(), "cache_miss");
        assert_eq!(EventKind::FunctionEnd.label(), "Завершение");
    }

    #[test]
    fn test_result_presence_is_distinguished_from_absence() {
        let with_null = parse_entry(json!({
            "timestamp": "2024-01-15T12:00:00",
            "event": "function_end",
            "result": null
        }));
        assert_eq!(with_null.result, Some(Value::Null));

        let without = parse_entry(json!({
            "timestamp": "2024-01-15T12:00:00",
            "event": "function_end"
        }));
        assert_eq!(without.result, None);

        // Present null survives serialization
        let text = serde_json::to_string(&with_null).unwrap();
        assert!(text.contains("\"result\":null"));
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let entry = parse_entry(json!({
            "timestamp": "2024-01-15T12:00:00",
            "event": "function_start",
            "request_id": "abc-123"
        }));
        assert_eq!(entry.extra.get("request_id"), Some(&json!("abc-123")));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let micro = parse_timestamp("2024-01-15T12:30:45.123456").unwrap();
        assert_eq!((micro.hour(), micro.minute(), micro.second()), (12, 30, 45));

        let minutes = parse_timestamp("2024-01-15T12:30").unwrap();
        assert_eq!(minutes.second(), 0);

        assert!(parse_timestamp("2024-01-15 12:30:45").is_some());
        assert!(parse_timestamp("2024-01-15").is_some());
        assert!(parse_timestamp("2024-01-15T12:30:45Z").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_bare_date_is_utc_midnight() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .with_timezone(&Local)
            .naive_local();
        assert_eq!(parse_timestamp("2024-01-15"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-15"),
            parse_timestamp("2024-01-15T00:00:00Z")
        );
    }

    #[test]
    fn test_filter_by_module() {
        let entry = LogEntry::new("2024-01-15T12:00:00", "function_start").with_module("orders");

        let filter = LogFilter {
            module: Some("orders".to_string()),
            ..Default::default()
        };
        assert!(entry.matches(&filter));

        let filter = LogFilter {
            module: Some("users".to_string()),
            ..Default::default()
        };
        assert!(!entry.matches(&filter));

        // Entries without a module never match a module filter
        let anonymous = LogEntry::new("2024-01-15T12:00:00", "function_start");
        let filter = LogFilter {
            module: Some("orders".to_string()),
            ..Default::default()
        };
        assert!(!anonymous.matches(&filter));
    }

    #[test]
    fn test_filter_by_event() {
        let entry = LogEntry::new("2024-01-15T12:00:00", "function_error");

        let filter = LogFilter {
            event: Some("function_error".to_string()),
            ..Default::default()
        };
        assert!(entry.matches(&filter));

        let filter = LogFilter {
            event: Some("function_end".to_string()),
            ..Default::default()
        };
        assert!(!entry.matches(&filter));
    }

    #[test]
    fn test_search_is_case_insensitive_and_sees_nested_values() {
        let entry = parse_entry(json!({
            "timestamp": "2024-01-15T12:00:00",
            "module": "catalog",
            "event": "function_start",
            "parameters": {"query": {"sku": "Mango-XL"}}
        }));

        let filter = LogFilter {
            search: Some("mango-xl".to_string()),
            ..Default::default()
        };
        assert!(entry.matches(&filter));

        let filter = LogFilter {
            search: Some("CATALOG".to_string()),
            ..Default::default()
        };
        assert!(entry.matches(&filter));

        let filter = LogFilter {
            search: Some("papaya".to_string()),
            ..Default::default()
        };
        assert!(!entry.matches(&filter));
    }

    #[test]
    fn test_time_range_is_inclusive() {
        let entry = LogEntry::new("2024-01-15T12:00:00", "function_start");
        let exact = parse_timestamp("2024-01-15T12:00:00");

        let filter = LogFilter {
            time_from: exact,
            ..Default::default()
        };
        assert!(entry.matches(&filter));

        let filter = LogFilter {
            time_to: exact,
            ..Default::default()
        };
        assert!(entry.matches(&filter));

        let filter = LogFilter {
            time_from: parse_timestamp("2024-01-15T12:00:01"),
            ..Default::default()
        };
        assert!(!entry.matches(&filter));

        let filter = LogFilter {
            time_to: parse_timestamp("2024-01-15T11:59:59"),
            ..Default::default()
        };
        assert!(!entry.matches(&filter));
    }

    #[test]
    fn test_malformed_timestamp_is_excluded_by_time_range() {
        let entry = LogEntry::new("yesterday-ish", "function_start");

        assert!(entry.matches(&LogFilter::default()));

        let filter = LogFilter {
            time_from: parse_timestamp("2000-01-01T00:00"),
            ..Default::default()
        };
        assert!(!entry.matches(&filter));
    }

    #[test]
    fn test_search_sees_the_record_as_written() {
        let entry = LogEntry::from_value(json!({
            "timestamp": "2024-01-15T12:00:00",
            "event": "function_end",
            "execution_time_ms": 150,
            "zone": "north",
            "area": "south"
        }))
        .unwrap();

        let search = |text: &str| LogFilter {
            search: Some(text.to_string()),
            ..Default::default()
        };
        assert!(entry.matches(&search("\"execution_time_ms\":150")));
        assert!(!entry.matches(&search("150.0")));
        // Keys keep their written order
        assert!(entry.matches(&search("\"zone\":\"north\",\"area\"")));
    }

    #[test]
    fn test_empty_error_fields_are_absent() {
        let entry = parse_entry(json!({
            "timestamp": "2024-01-15T12:00:00",
            "event": "function_error",
            "error_type": "",
            "error_message": ""
        }));
        assert!(!entry.has_error());
        assert_eq!(entry.error_type(), None);

        let entry = parse_entry(json!({
            "timestamp": "2024-01-15T12:00:00",
            "event": "function_error",
            "error_type": "",
            "error_message": "boom"
        }));
        assert!(entry.has_error());
        assert_eq!(entry.error_message(), Some("boom"));
    }

    #[test]
    fn test_empty_strings_do_not_filter() {
        let entry = LogEntry::new("2024-01-15T12:00:00", "function_start");
        let filter = LogFilter {
            search: Some(String::new()),
            module: Some(String::new()),
            event: Some(String::new()),
            time_from: None,
            time_to: None,
        };
        assert!(entry.matches(&filter));
    }
}
