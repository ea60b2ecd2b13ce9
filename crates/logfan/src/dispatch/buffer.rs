//! Bounded per-stream entry buffer.
//!
//! Entries wait here between enqueue and flush. The buffer never grows past
//! its capacity `C`; when full, the configured [`OverflowPolicy`] decides
//! which entry loses.

use std::collections::VecDeque;
use std::str::FromStr;

use crate::envelope::LogEntry;

/// What to do with an incoming entry when the buffer is full.
///
/// `DropOldest` evicts the front of the queue, keeping the most recent
/// entries; `DropNewest` rejects the incoming entry, keeping the oldest.
/// Neither blocks the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    DropOldest,
    DropNewest,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop-oldest" => Ok(OverflowPolicy::DropOldest),
            "drop-newest" => Ok(OverflowPolicy::DropNewest),
            other => Err(format!("unknown overflow policy '{other}'")),
        }
    }
}

/// FIFO buffer of pending entries, bounded at `capacity`.
#[derive(Debug)]
pub struct EntryBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl EntryBuffer {
    #[must_use]
    pub fn new(capacity: usize, policy: OverflowPolicy) -> EntryBuffer {
        EntryBuffer {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            policy,
        }
    }

    /// Appends an entry, applying the overflow policy when full.
    ///
    /// Returns `true` if an entry (either the evicted oldest or the rejected
    /// incoming one) was dropped.
    pub fn push(&mut self, entry: LogEntry) -> bool {
        if self.entries.len() < self.capacity {
            self.entries.push_back(entry);
            return false;
        }
        match self.policy {
            OverflowPolicy::DropOldest => {
                self.entries.pop_front();
                self.entries.push_back(entry);
            }
            OverflowPolicy::DropNewest => {}
        }
        true
    }

    /// Takes every pending entry in enqueue order, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<LogEntry> {
        self.entries.drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RequestContext;
    use crate::stream::StreamId;

    fn entry(action: &str) -> LogEntry {
        LogEntry::build(
            StreamId::AuditLog,
            &RequestContext::default(),
            action,
            "subject",
            None,
            None,
        )
    }

    #[test]
    fn test_push_below_capacity() {
        let mut buffer = EntryBuffer::new(3, OverflowPolicy::DropOldest);
        assert!(!buffer.push(entry("a")));
        assert!(!buffer.push(entry("b")));
        assert_eq!(buffer.len(), 2);
        assert!(!buffer.is_full());
    }

    #[test]
    fn test_drop_oldest_keeps_most_recent() {
        let mut buffer = EntryBuffer::new(2, OverflowPolicy::DropOldest);
        buffer.push(entry("a"));
        buffer.push(entry("b"));
        assert!(buffer.push(entry("c")));

        let actions: Vec<String> = buffer.drain().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["b", "c"]);
    }

    #[test]
    fn test_drop_newest_keeps_oldest() {
        let mut buffer = EntryBuffer::new(2, OverflowPolicy::DropNewest);
        buffer.push(entry("a"));
        buffer.push(entry("b"));
        assert!(buffer.push(entry("c")));

        let actions: Vec<String> = buffer.drain().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["a", "b"]);
    }

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let mut buffer = EntryBuffer::new(5, OverflowPolicy::DropOldest);
        for action in ["first", "second", "third"] {
            buffer.push(entry(action));
        }

        let actions: Vec<String> = buffer.drain().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["first", "second", "third"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_is_full_at_capacity() {
        let mut buffer = EntryBuffer::new(1, OverflowPolicy::DropOldest);
        assert!(!buffer.is_full());
        buffer.push(entry("a"));
        assert!(buffer.is_full());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "drop-oldest".parse::<OverflowPolicy>().unwrap(),
            OverflowPolicy::DropOldest
        );
        assert_eq!(
            "DROP-NEWEST".parse::<OverflowPolicy>().unwrap(),
            OverflowPolicy::DropNewest
        );
        assert!("block".parse::<OverflowPolicy>().is_err());
    }
}
