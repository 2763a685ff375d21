//! The classified, source-attributed item that gets persisted.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error_handling::RecordError;

/// One scraped and classified item awaiting persistence.
///
/// Immutable once constructed: fields are private and only readable through
/// accessors. Construction validates the same invariants the `headlines`
/// table relies on.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    source: String,
    text: String,
    category: String,
    raw_label: String,
    confidence: f64,
    scraped_at: DateTime<Utc>,
}

impl Record {
    /// Builds a record, rejecting empty `source`/`text`/`category` and
    /// confidences outside `[0, 1]`.
    pub fn new(
        source: impl Into<String>,
        text: impl Into<String>,
        category: impl Into<String>,
        raw_label: impl Into<String>,
        confidence: f64,
        scraped_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        let source = source.into();
        let text = text.into();
        let category = category.into();
        if source.trim().is_empty() {
            return Err(RecordError::EmptyField("source"));
        }
        if text.trim().is_empty() {
            return Err(RecordError::EmptyField("text"));
        }
        if category.trim().is_empty() {
            return Err(RecordError::EmptyField("category"));
        }
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RecordError::ConfidenceOutOfRange(confidence));
        }
        Ok(Record {
            source,
            text,
            category,
            raw_label: raw_label.into(),
            confidence,
            scraped_at,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The scraped headline or title.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Unfiltered model output; may differ from `category`.
    pub fn raw_label(&self) -> &str {
        &self.raw_label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn scraped_at(&self) -> DateTime<Utc> {
        self.scraped_at
    }
}

/// Hands out `scraped_at` timestamps that never go backwards within a run,
/// even if the wall clock is adjusted.
#[derive(Debug, Default)]
pub struct ScrapeClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ScrapeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time, clamped to be no earlier than the previous value.
    pub fn now(&self) -> DateTime<Utc> {
        self.observe(Utc::now())
    }

    fn observe(&self, candidate: DateTime<Utc>) -> DateTime<Utc> {
        // A poisoned lock only means another worker panicked mid-update; the
        // stored timestamp is still valid.
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let next = match *last {
            Some(prev) if prev > candidate => prev,
            _ => candidate,
        };
        *last = Some(next);
        next
    }
}

/// Shortens `text` to at most `max_chars` characters for log lines.
pub(crate) fn snippet(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
