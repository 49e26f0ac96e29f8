use chrono::{Duration, NaiveDateTime};

use crate::logging::entry::parse_timestamp;

/// Conjunctive filter over the loaded log set. `None` or an empty string
/// leaves the corresponding predicate inactive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    pub search: Option<String>,
    pub module: Option<String>,
    pub event: Option<String>,
    pub time_from: Option<NaiveDateTime>,
    pub time_to: Option<NaiveDateTime>,
}

/// A single edit of one filter control, as raw input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterField {
    Search(String),
    Module(String),
    Event(String),
    TimeFrom(String),
    TimeTo(String),
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn text_input(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn time_input(field: &str, value: &str) -> Option<NaiveDateTime> {
    if value.trim().is_empty() {
        return None;
    }
    let parsed = parse_timestamp(value);
    if parsed.is_none() {
        tracing::warn!("Ignoring unparsable {field} bound: {value:?}");
    }
    parsed
}

impl LogFilter {
    pub fn search(&self) -> Option<&str> {
        non_empty(&self.search)
    }

    pub fn module(&self) -> Option<&str> {
        non_empty(&self.module)
    }

    pub fn event(&self) -> Option<&str> {
        non_empty(&self.event)
    }

    pub fn has_time_range(&self) -> bool {
        self.time_from.is_some() || self.time_to.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.search().is_none()
            && self.module().is_none()
            && self.event().is_none()
            && !self.has_time_range()
    }

    /// Apply one control edit. Time inputs that do not parse clear the bound.
    pub fn apply(&mut self, field: FilterField) {
        match field {
            FilterField::Search(value) => self.search = text_input(value),
            FilterField::Module(value) => self.module = text_input(value),
            FilterField::Event(value) => self.event = text_input(value),
            FilterField::TimeFrom(value) => self.time_from = time_input("time_from", &value),
            FilterField::TimeTo(value) => self.time_to = time_input("time_to", &value),
        }
    }

    /// Set the time range to the `minutes` leading up to `now`. A span
    /// reaching past the earliest representable time leaves the range open
    /// below.
    pub fn set_last_minutes(&mut self, now: NaiveDateTime, minutes: i64) {
        self.time_from =
            Duration::try_minutes(minutes).and_then(|span| now.checked_sub_signed(span));
        if self.time_from.is_none() {
            tracing::warn!(
                "{minutes} minutes before {now} is out of range, showing everything up to now"
            );
        }
        self.time_to = Some(now);
    }

    pub fn last_minutes(now: NaiveDateTime, minutes: i64) -> Self {
        let mut filter = Self::default();
        filter.set_last_minutes(now, minutes);
        filter
    }
}
