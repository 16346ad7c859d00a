//! ANSI terminal formatter
//!
//! Colors each entry by its nesting level using the renderer's cyclic
//! palette, so depth reads at a glance even in a flat scrollback.
//!
//! @module output/ansi

use super::LogFormatter;
use crate::log::render::{level_color, palette};
use crate::log::LogEntry;

/// Level-colored terminal formatter
pub struct AnsiFormatter;

impl AnsiFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AnsiFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFormatter for AnsiFormatter {
    fn format_entry(&self, entry: &LogEntry) -> String {
        format!(
            "{}{}{}",
            level_color(entry.level),
            entry.rendered_text,
            palette::RESET
        )
    }

    fn format_position(&self, position: usize, total: usize, entry: &LogEntry) -> String {
        format!(
            "{}[{}/{}]{} {}",
            palette::BOLD,
            position + 1,
            total,
            palette::RESET,
            self.format_entry(entry)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
