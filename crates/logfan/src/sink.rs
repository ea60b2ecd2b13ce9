//! Local synchronous sink.
//!
//! The local sink is the always-available half of the fan-out: every entry
//! is written here before it ever touches the dispatcher, so an operator
//! keeps a live feed even when the remote endpoint is down. It is a
//! debugging aid, not the durability guarantee — write failures are retried
//! once and then swallowed.

use std::io::Write;

use crate::envelope::{EntryStatus, LogEntry};

/// Severity attached to a local sink write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkLevel {
    Info,
    Error,
}

impl SinkLevel {
    /// Level implied by an entry's recorded outcome.
    #[must_use]
    pub fn for_entry(entry: &LogEntry) -> SinkLevel {
        match entry.status {
            EntryStatus::Success => SinkLevel::Info,
            EntryStatus::Failure => SinkLevel::Error,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            SinkLevel::Info => "INFO",
            SinkLevel::Error => "ERROR",
        }
    }
}

/// A synchronous local writer. Implementations must never block on network
/// I/O and must never panic or return an error to the caller.
pub trait Sink: Send + Sync {
    fn write(&self, entry: &LogEntry, level: SinkLevel);
}

/// Sink writing one JSON line per entry to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    #[must_use]
    pub fn new() -> ConsoleSink {
        ConsoleSink
    }

    fn write_line(line: &str) -> std::io::Result<()> {
        let stderr = std::io::stderr();
        let mut handle = stderr.lock();
        handle.write_all(line.as_bytes())?;
        handle.write_all(b"\n")
    }
}

impl Sink for ConsoleSink {
    fn write(&self, entry: &LogEntry, level: SinkLevel) {
        let Ok(json) = serde_json::to_string(entry) else {
            // Map<String, Value> cannot actually fail to serialize; nothing
            // sensible to do here if it ever does.
            return;
        };
        let line = format!("{} | {} | {}", level.as_str(), entry.stream, json);
        if ConsoleSink::write_line(&line).is_err() {
            let _ = ConsoleSink::write_line(&line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RequestContext;
    use crate::stream::StreamId;

    #[test]
    fn test_level_for_entry_follows_status() {
        let ok = LogEntry::build(
            StreamId::AuditLog,
            &RequestContext::default(),
            "login",
            "u1",
            Some(EntryStatus::Success),
            None,
        );
        let failed = LogEntry::build(
            StreamId::AuditLog,
            &RequestContext::default(),
            "login",
            "u1",
            Some(EntryStatus::Failure),
            None,
        );

        assert_eq!(SinkLevel::for_entry(&ok), SinkLevel::Info);
        assert_eq!(SinkLevel::for_entry(&failed), SinkLevel::Error);
    }

    #[test]
    fn test_console_sink_write_does_not_panic() {
        let entry = LogEntry::build(
            StreamId::SystemErrors,
            &RequestContext::default(),
            "probe",
            "s1",
            None,
            None,
        );
        ConsoleSink::new().write(&entry, SinkLevel::Info);
    }
}
