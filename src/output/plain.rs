//! Plain text formatter
//!
//! No ANSI codes; suitable for piping, logs, and dumb terminals.
//!
//! @module output/plain

use super::LogFormatter;
use crate::log::LogEntry;

/// Plain text formatter (no ANSI codes)
pub struct PlainFormatter;

impl PlainFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFormatter for PlainFormatter {
    fn format_entry(&self, entry: &LogEntry) -> String {
        entry.rendered_text.clone()
    }

    fn format_position(&self, position: usize, total: usize, entry: &LogEntry) -> String {
        format!("[{}/{}] {}", position + 1, total, entry.rendered_text)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TraceEvent;
    use crate::log::{EventLog, Renderer};
    use crate::source::SourceStore;

    #[test]
    fn test_entry_is_rendered_text_verbatim() {
        let renderer = Renderer::default();
        let mut sources = SourceStore::for_tests();
        let mut log = EventLog::new();
        renderer
            .append(&mut log, &mut sources, &TraceEvent::ret("6", "fact", 2))
            .unwrap();

        let out = PlainFormatter::new().format_entry(log.get(0).unwrap());
        assert_eq!(out, "     ⇒ 6");
    }
}
