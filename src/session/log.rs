//! Append-only session log rendered as the conversation transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who a log entry is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
    System,
    Error,
    Success,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Agent => "agent",
            Sender::System => "system",
            Sender::Error => "error",
            Sender::Success => "success",
        }
    }
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Entries in arrival order. Only [`SessionLog::clear`] removes anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLog {
    entries: Vec<LogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) {
        self.entries.push(LogEntry::new(sender, text));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries appended at or after `index`; empty if `index` is past the end.
    pub fn since(&self, index: usize) -> &[LogEntry] {
        self.entries.get(index..).unwrap_or_default()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, sender: Sender) -> usize {
        self.entries.iter().filter(|e| e.sender == sender).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_arrival_order() {
        let mut log = SessionLog::new();
        log.push(Sender::User, "explore");
        log.push(Sender::Agent, "navigating");
        log.push(Sender::Success, "done");
        let senders: Vec<Sender> = log.entries().iter().map(|e| e.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Agent, Sender::Success]);
        assert!(log.entries()[0].timestamp <= log.entries()[2].timestamp);
    }

    #[test]
    fn test_since_returns_tail() {
        let mut log = SessionLog::new();
        log.push(Sender::System, "a");
        log.push(Sender::System, "b");
        assert_eq!(log.since(1).len(), 1);
        assert_eq!(log.since(1)[0].text, "b");
        assert!(log.since(2).is_empty());
        assert!(log.since(10).is_empty());
    }

    #[test]
    fn test_count_by_sender() {
        let mut log = SessionLog::new();
        log.push(Sender::Error, "x");
        log.push(Sender::Agent, "y");
        log.push(Sender::Error, "z");
        assert_eq!(log.count(Sender::Error), 2);
        assert_eq!(log.count(Sender::Success), 0);
    }

    #[test]
    fn test_sender_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Sender::Success).unwrap(), "\"success\"");
    }
}
