//! Output formatters for the trace log
//!
//! Provides multiple output formats for rendered trace entries:
//! - Ansi: level-colored terminal output
//! - Plain: text without ANSI codes (piping/logs)
//! - JSON: machine-readable export (tooling integration)
//!
//! @module output

pub mod ansi;
pub mod json;
pub mod plain;

use crate::log::{EventLog, LogEntry};

// =============================================================================
// TYPES
// =============================================================================

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Level-colored terminal output
    #[default]
    Ansi,
    /// Plain text without ANSI codes
    Plain,
    /// JSON for machine consumption
    Json,
}

// =============================================================================
// FORMATTER TRAIT
// =============================================================================

/// Formats log entries for display or export
pub trait LogFormatter {
    /// Format a single log line
    fn format_entry(&self, entry: &LogEntry) -> String;

    /// Format the position banner shown after navigation
    fn format_position(&self, position: usize, total: usize, entry: &LogEntry) -> String;

    /// Format a complete log
    fn format_log(&self, log: &EventLog) -> String {
        let mut output = String::new();
        for entry in log.iter() {
            output.push_str(&self.format_entry(entry));
            output.push('\n');
        }
        output
    }
}

// =============================================================================
// FACTORY FUNCTION
// =============================================================================

/// Create a formatter for the given output format
pub fn create_formatter(format: OutputFormat) -> Box<dyn LogFormatter> {
    match format {
        OutputFormat::Ansi => Box::new(ansi::AnsiFormatter::new()),
        OutputFormat::Plain => Box::new(plain::PlainFormatter::new()),
        OutputFormat::Json => Box::new(json::JsonFormatter::new()),
    }
}

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use ansi::AnsiFormatter;
pub use json::JsonFormatter;
pub use plain::PlainFormatter;

// =============================================================================
// TESTS
// =============================================================================
