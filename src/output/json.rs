//! JSON formatter
//!
//! Machine-readable export of log entries for tooling integration.
//!
//! @module output/json

use super::LogFormatter;
use crate::log::{EventLog, LogEntry};

/// JSON formatter
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFormatter for JsonFormatter {
    fn format_entry(&self, entry: &LogEntry) -> String {
        serde_json::to_string(entry)
            .unwrap_or_else(|e| format!(r#"{{"error": "failed to serialize entry: {}"}}"#, e))
    }

    fn format_position(&self, position: usize, total: usize, _entry: &LogEntry) -> String {
        format!(r#"{{"position": {}, "total": {}}}"#, position + 1, total)
    }

    fn format_log(&self, log: &EventLog) -> String {
        let entries: Vec<&LogEntry> = log.iter().collect();
        serde_json::to_string_pretty(&entries)
            .unwrap_or_else(|e| format!(r#"{{"error": "failed to serialize log: {}"}}"#, e))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{TraceEvent, WireLocation};
    use crate::log::Renderer;
    use crate::source::SourceStore;

    #[test]
    fn test_log_exports_as_json_array() {
        let renderer = Renderer::default();
        let mut sources = SourceStore::for_tests();
        let mut log = EventLog::new();
        let event = TraceEvent::call("(f 1)", "f", 0)
            .with_definition(WireLocation::new("/src/a.el", 3, 0, 20, 10));
        renderer.append(&mut log, &mut sources, &event).unwrap();

        let out = JsonFormatter::new().format_log(&log);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        let entries = parsed.as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["identifier"], "f");
        assert_eq!(entries[0]["level"], 0);
        assert_eq!(entries[0]["xref"]["line"], 3);
    }
}
