//! Event Log Store
//!
//! Append-only ordered container of rendered log entries. Insertion order is
//! display order; entries are never edited or removed individually. The only
//! destructive operation is `clear`, which wipes the whole log (callers must
//! retract any annotation overlays derived from it).
//!
//! @module log/store

use super::types::LogEntry;

/// Append-only ordered sequence of log entries
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry at the end of the log, returning its position
    pub fn append(&mut self, entry: LogEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Random-access read by position
    pub fn get(&self, pos: usize) -> Option<&LogEntry> {
        self.entries.get(pos)
    }

    /// Last entry, if any
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in display order
    pub fn iter(&self) -> std::slice::Iter<'_, LogEntry> {
        self.entries.iter()
    }

    /// Discard every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TraceEvent;
    use crate::log::render::Renderer;
    use crate::source::SourceStore;

    fn sample_log(texts: &[&str]) -> EventLog {
        let renderer = Renderer::default();
        let mut sources = SourceStore::for_tests();
        let mut log = EventLog::new();
        for (i, text) in texts.iter().enumerate() {
            let event = TraceEvent::call(*text, "f", i as u32);
            renderer.append(&mut log, &mut sources, &event).unwrap();
        }
        log
    }

    #[test]
    fn test_append_preserves_arrival_order() {
        let log = sample_log(&["(a)", "(b)", "(c)"]);
        assert_eq!(log.len(), 3);
        let texts: Vec<_> = log.iter().map(|e| e.rendered_text.clone()).collect();
        assert!(texts[0].contains("(a)"));
        assert!(texts[1].contains("(b)"));
        assert!(texts[2].contains("(c)"));
    }

    #[test]
    fn test_random_access() {
        let log = sample_log(&["(a)", "(b)"]);
        assert!(log.get(0).is_some());
        assert!(log.get(1).is_some());
        assert!(log.get(2).is_none());
        assert!(log.last().unwrap().rendered_text.contains("(b)"));
    }

    #[test]
    fn test_clear_wipes_everything() {
        let mut log = sample_log(&["(a)", "(b)"]);
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
        assert!(log.get(0).is_none());
    }
}
