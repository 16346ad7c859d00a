//! Cross-Reference Resolver
//!
//! Maps a log entry to its recorded definition site. The capability is
//! deliberately narrow: one lookup, answered from what the producer sent
//! when the event was created. An entry without a recorded definition
//! resolves to nothing; that is an answer, not an error.
//!
//! @module xref

use crate::log::types::{LineCol, LogEntry};

// =============================================================================
// RESOLVER
// =============================================================================

/// Definition lookup over log entries
pub trait DefinitionResolver {
    /// Definition site for an entry, if one was recorded
    fn resolve(&self, entry: &LogEntry) -> Option<LineCol>;
}

/// Resolves from the definition captured at event-creation time
#[derive(Debug, Clone, Copy, Default)]
pub struct LogResolver;

impl LogResolver {
    pub fn new() -> Self {
        Self
    }
}

impl DefinitionResolver for LogResolver {
    fn resolve(&self, entry: &LogEntry) -> Option<LineCol> {
        entry.xref
    }
}

// =============================================================================
// TESTS
// =============================================================================
