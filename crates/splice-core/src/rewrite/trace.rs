/*!
# Rewrite Trace

Diagnostic log of applied rewrites. Entries survive toggling tracing off and
are only dropped by draining, clearing, or eviction once the log is full.
*/

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::rules::RuleId;
use super::Location;

/// One applied rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub rule: RuleId,
    pub location: Location,
    /// Rendered subtree before the rewrite
    pub before: String,
    /// Rendered replacement
    pub after: String,
}

/// Bounded trace log
#[derive(Debug)]
pub struct TraceLog {
    enabled: bool,
    capacity: usize,
    entries: VecDeque<TraceEntry>,
    evicted: u64,
}

impl TraceLog {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        Self {
            enabled,
            capacity,
            entries: VecDeque::new(),
            evicted: 0,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Append an entry, evicting the oldest when full; ignored when disabled
    pub fn record(&mut self, entry: TraceEntry) {
        if !self.enabled || self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries dropped to stay within capacity
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn snapshot(&self) -> Vec<TraceEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn take(&mut self) -> Vec<TraceEntry> {
        self.entries.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line: u32) -> TraceEntry {
        TraceEntry {
            rule: RuleId(0),
            location: Location {
                origin: "t.php".to_string(),
                line,
            },
            before: "x + 0".to_string(),
            after: "x".to_string(),
        }
    }

    #[test]
    fn test_disabled_log_records_nothing() {
        let mut log = TraceLog::new(false, 8);
        log.record(entry(1));
        assert!(log.is_empty());
    }

    #[test]
    fn test_entries_survive_toggle_off() {
        let mut log = TraceLog::new(true, 8);
        log.record(entry(1));
        log.set_enabled(false);
        log.record(entry(2));
        assert_eq!(log.snapshot(), [entry(1)]);
        assert_eq!(log.take(), [entry(1)]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = TraceLog::new(true, 2);
        for line in 1..=3 {
            log.record(entry(line));
        }
        let lines = log.snapshot().iter().map(|e| e.location.line).collect::<Vec<_>>();
        assert_eq!(lines, [2, 3]);
        assert_eq!(log.evicted(), 1);
        log.clear();
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn test_entry_serializes() {
        let json = serde_json::to_string(&entry(4)).unwrap();
        assert!(json.contains(r#""line":4"#));
        let back: TraceEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry(4));
    }
}
