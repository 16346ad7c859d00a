//! Trace Event Renderer
//!
//! Converts one inbound trace event into one indentation-prefixed log line
//! and appends it to the event log. Indentation depth equals the producer's
//! nesting level; return entries carry the `" ⇒ "` result marker. Styling is
//! a deterministic cyclic color keyed by `level % PALETTE_SIZE`, applied at
//! print time so the stored text stays plain.
//!
//! @module log/render

use chrono::Local;
use compact_str::CompactString;
use tracing::debug;

use super::store::EventLog;
use super::types::LogEntry;
use crate::core::error::Result;
use crate::event::TraceEvent;
use crate::source::SourceStore;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Marker prefixed to the display text of a return/result entry
pub const RETURN_MARKER: &str = " ⇒ ";

/// Number of distinct level colors before the cycle repeats
pub const PALETTE_SIZE: usize = 6;

/// ANSI color codes
pub mod palette {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const CYAN: &str = "\x1b[36m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const GREEN: &str = "\x1b[32m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
}

/// Cyclic level palette; index with `level % PALETTE_SIZE`
const LEVEL_COLORS: [&str; PALETTE_SIZE] = [
    palette::CYAN,
    palette::YELLOW,
    palette::GREEN,
    palette::MAGENTA,
    palette::BLUE,
    palette::RED,
];

/// Color for a nesting level (deterministic, cyclic)
#[inline]
pub fn level_color(level: u32) -> &'static str {
    LEVEL_COLORS[level as usize % PALETTE_SIZE]
}

// =============================================================================
// RENDERER
// =============================================================================

/// Renders inbound trace events into log entries
#[derive(Debug, Clone)]
pub struct Renderer {
    indent_unit: String,
}

impl Renderer {
    /// Create a renderer with the given indent unit
    pub fn new(indent_unit: impl Into<String>) -> Self {
        Self {
            indent_unit: indent_unit.into(),
        }
    }

    /// Produce the indentation-prefixed display text for an event
    pub fn rendered_text(&self, event: &TraceEvent) -> String {
        let mut text = self.indent_unit.repeat(event.level as usize);
        if !event.is_call {
            text.push_str(RETURN_MARKER);
        }
        text.push_str(&event.display_text);
        text
    }

    /// Render a validated event into a log entry
    ///
    /// Interns the event's resource paths through the source store. Fails on
    /// a malformed event without building anything.
    pub fn render(&self, sources: &mut SourceStore, event: &TraceEvent) -> Result<LogEntry> {
        event.validate()?;

        let definition = event.definition_loc.as_ref().map(|l| l.resolve(sources));
        let signature = event.signature_loc.as_ref().map(|l| l.resolve(sources));
        let call_site = event.call_site_loc.as_ref().map(|l| l.resolve(sources));
        let context = event.context_loc.as_ref().map(|l| l.resolve(sources));

        Ok(LogEntry {
            is_call: event.is_call,
            level: event.level,
            display_text: event.display_text.clone(),
            rendered_text: self.rendered_text(event),
            identifier: CompactString::new(&event.identifier_name),
            xref: definition.map(|loc| loc.line_col()),
            signature_span: signature.map(|loc| loc.span()),
            call_site_span: call_site.map(|loc| loc.span()),
            context_span: context.map(|loc| loc.span()),
            arrived_at: Local::now(),
        })
    }

    /// Render an event and append it at the end of the log
    ///
    /// Validation happens before any mutation, so a rejected event never
    /// partially appends. Returns the new entry's position.
    pub fn append(
        &self,
        log: &mut EventLog,
        sources: &mut SourceStore,
        event: &TraceEvent,
    ) -> Result<usize> {
        let entry = self.render(sources, event)?;

        // The producer's level is trusted, but a jump deeper than one past
        // the previous entry usually means a missed event upstream.
        if let Some(prev) = log.last() {
            if event.level > prev.level + 1 {
                debug!(
                    level = event.level,
                    prev_level = prev.level,
                    identifier = %event.identifier_name,
                    "trace level jumped past previous entry"
                );
            }
        } else if event.level > 0 {
            debug!(level = event.level, "trace stream starts below top level");
        }

        Ok(log.append(entry))
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new("  ")
    }
}

// =============================================================================
// TESTS
// =============================================================================
