//! Event log: the append-only record of everything the supervisor and
//! the operator did.
//!
//! Entries are never edited or removed individually. Timestamps are
//! clamped so they never go backwards even if the wall clock does.

use chrono::{DateTime, Utc};

use crate::types::{LogEntry, LogEntryId, LogLevel, Service};

/// In-memory, session-scoped event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
    next_id: LogEntryId,
}

/// Optional query constraints; all set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub level: Option<LogLevel>,
    pub service_id: Option<String>,
    /// Case-insensitive substring of the message or service name.
    pub text: Option<String>,
}

impl LogFilter {
    pub fn level(level: LogLevel) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    pub fn service(service_id: impl Into<String>) -> Self {
        Self {
            service_id: Some(service_id.into()),
            ..Self::default()
        }
    }

    fn matches(&self, entry: &LogEntry, needle: Option<&str>) -> bool {
        if self.level.is_some_and(|level| level != entry.level) {
            return false;
        }
        if let Some(id) = &self.service_id {
            if entry.service_id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        match needle {
            Some(needle) => {
                entry.message.to_lowercase().contains(needle)
                    || entry
                        .service_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(needle))
            }
            None => true,
        }
    }
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry stamped with the current time.
    pub fn append(
        &mut self,
        level: LogLevel,
        message: impl Into<String>,
        service_id: Option<&str>,
        service_name: Option<&str>,
    ) -> LogEntry {
        self.append_at(Utc::now(), level, message, service_id, service_name)
    }

    /// Append an entry about a specific service.
    pub fn append_for(
        &mut self,
        service: &Service,
        level: LogLevel,
        message: impl Into<String>,
    ) -> LogEntry {
        self.append(
            level,
            message,
            Some(service.id.as_str()),
            Some(service.name.as_str()),
        )
    }

    /// Append with an explicit clock reading, clamped to the last entry.
    pub fn append_at(
        &mut self,
        now: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        service_id: Option<&str>,
        service_name: Option<&str>,
    ) -> LogEntry {
        let timestamp = match self.entries.last() {
            Some(last) if last.timestamp > now => last.timestamp,
            _ => now,
        };
        let entry = LogEntry {
            id: self.next_id,
            timestamp,
            level,
            message: message.into(),
            service_id: service_id.map(str::to_string),
            service_name: service_name.map(str::to_string),
        };
        self.next_id += 1;
        self.entries.push(entry.clone());
        entry
    }

    /// Lazily iterate entries matching `filter`, oldest first. Calling
    /// again restarts from the beginning.
    pub fn query<'a>(&'a self, filter: &'a LogFilter) -> impl Iterator<Item = &'a LogEntry> + 'a {
        let needle = filter
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);
        self.entries
            .iter()
            .filter(move |entry| filter.matches(entry, needle.as_deref()))
    }

    pub fn get(&self, id: LogEntryId) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// The newest `n` entries, oldest first.
    pub fn latest(&self, n: usize) -> &[LogEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the whole log. Ids keep increasing across a reset.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}
