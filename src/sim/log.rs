use serde::{Deserialize, Serialize};

/// A single term-stamped command in a node's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub term: u64,
    pub command: String,
}

impl LogEntry {
    pub fn new(term: u64, command: impl Into<String>) -> Self {
        Self {
            term,
            command: command.into(),
        }
    }
}

/// In-memory ordered log. Indices are 0-based; -1 stands for "before the
/// first entry" and is the starting value for commit and match bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Log {
    entries: Vec<LogEntry>,
}

impl Log {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_index(&self) -> i64 {
        self.entries.len() as i64 - 1
    }

    pub fn term_at(&self, index: i64) -> Option<u64> {
        if index < 0 {
            return None;
        }
        self.entries.get(index as usize).map(|e| e.term)
    }

    /// Term of the last entry, or 0 for an empty log.
    pub fn last_term(&self) -> u64 {
        self.term_at(self.last_index()).unwrap_or(0)
    }

    pub fn entry_at(&self, index: i64) -> Option<&LogEntry> {
        if index < 0 {
            return None;
        }
        self.entries.get(index as usize)
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Append a single entry and return its index.
    pub fn append(&mut self, entry: LogEntry) -> i64 {
        self.entries.push(entry);
        self.entries.len() as i64 - 1
    }

    /// Copies of the entries from `start` (inclusive) to the end. A start
    /// past the end yields an empty vector, which is exactly what a
    /// caught-up peer's heartbeat carries.
    pub fn entries_from(&self, start: i64) -> Vec<LogEntry> {
        if start < 0 {
            return self.entries.clone();
        }
        let start = start as usize;
        if start >= self.entries.len() {
            return Vec::new();
        }
        self.entries[start..].to_vec()
    }

    /// Discard `index` and everything after it.
    pub fn truncate_from(&mut self, index: i64) {
        if index < 0 {
            self.entries.clear();
            return;
        }
        self.entries.truncate(index as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_reports_sentinel_indices() {
        let log = Log::new();

        assert_eq!(log.last_index(), -1);
        assert_eq!(log.last_term(), 0);
        assert_eq!(log.term_at(-1), None);
        assert_eq!(log.term_at(0), None);
        assert!(log.entry_at(0).is_none());
    }

    #[test]
    fn append_assigns_sequential_indices() {
        let mut log = Log::new();

        assert_eq!(log.append(LogEntry::new(1, "a")), 0);
        assert_eq!(log.append(LogEntry::new(1, "b")), 1);
        assert_eq!(log.append(LogEntry::new(2, "c")), 2);

        assert_eq!(log.last_index(), 2);
        assert_eq!(log.last_term(), 2);
        assert_eq!(log.term_at(1), Some(1));
        assert_eq!(log.entry_at(2).map(|e| e.command.as_str()), Some("c"));
    }

    #[test]
    fn entries_from_handles_probe_and_full_ranges() {
        let mut log = Log::new();
        for term in 1..=3u64 {
            log.append(LogEntry::new(term, format!("cmd{term}")));
        }

        assert_eq!(log.entries_from(0).len(), 3);
        assert_eq!(log.entries_from(2).len(), 1);
        // A peer that is fully caught up gets a bare heartbeat.
        assert!(log.entries_from(3).is_empty());
        assert!(log.entries_from(100).is_empty());
        assert_eq!(log.entries_from(-1).len(), 3);
    }

    #[test]
    fn truncate_from_discards_suffix() {
        let mut log = Log::new();
        for term in 1..=4u64 {
            log.append(LogEntry::new(term, "x"));
        }

        log.truncate_from(2);
        assert_eq!(log.last_index(), 1);
        assert_eq!(log.term_at(1), Some(2));
        assert_eq!(log.term_at(2), None);

        log.truncate_from(-1);
        assert!(log.is_empty());
        assert_eq!(log.last_index(), -1);
    }
}
