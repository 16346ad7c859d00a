//! Core Data Structures for the Trace Log
//!
//! Value types shared across the viewer:
//! - Source locations and their derived forms (line/column targets, byte spans)
//! - Rendered log entries with their cross-reference metadata
//!
//! @module log/types

use chrono::{DateTime, Local};
use compact_str::CompactString;
use serde::Serialize;

// =============================================================================
// RESOURCE ID
// =============================================================================

/// Interned handle for a source resource (a file path)
///
/// Paths are interned once by the source store; everything downstream
/// refers to resources by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// Get the raw index into the resource table
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

// =============================================================================
// SOURCE LOCATION
// =============================================================================

/// A location in a source resource
///
/// Immutable once built. `line`/`column` address the definition-jump form,
/// `byte_offset`/`length` the overlay-span form; both derive from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    /// Resource this location points into
    pub resource: ResourceId,
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (0-indexed)
    pub column: u32,
    /// Byte offset from the start of the resource
    pub byte_offset: u32,
    /// Length of the located text in bytes
    pub length: u32,
}

impl SourceLocation {
    /// Create a new source location
    #[inline]
    pub const fn new(resource: ResourceId, line: u32, column: u32, byte_offset: u32, length: u32) -> Self {
        Self {
            resource,
            line,
            column,
            byte_offset,
            length,
        }
    }

    /// Derive the line/column form used for definition jumps
    #[inline]
    pub fn line_col(&self) -> LineCol {
        LineCol {
            resource: self.resource,
            line: self.line,
            column: self.column,
        }
    }

    /// Derive the byte-span form used for overlay placement
    #[inline]
    pub fn span(&self) -> Span {
        Span {
            resource: self.resource,
            begin: self.byte_offset,
            end: self.byte_offset + self.length,
        }
    }
}

/// A line/column target inside a resource (definition jumps)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub resource: ResourceId,
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (0-indexed)
    pub column: u32,
}

/// A half-open byte range inside a resource (overlay placement)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub resource: ResourceId,
    /// First byte of the span
    pub begin: u32,
    /// One past the last byte of the span
    pub end: u32,
}

impl Span {
    /// Create a new span
    #[inline]
    pub const fn new(resource: ResourceId, begin: u32, end: u32) -> Self {
        Self {
            resource,
            begin,
            end,
        }
    }

    /// Length of the span in bytes
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.begin)
    }

    /// Check whether the span is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Exact-position key used for overlay duplicate detection
    #[inline]
    pub fn key(&self) -> (ResourceId, u32, u32) {
        (self.resource, self.begin, self.end)
    }
}

// =============================================================================
// LOG ENTRY
// =============================================================================

/// One rendered line of the trace log
///
/// Created exactly once when its trace event arrives and never mutated;
/// the log is append-only and only `clear` discards entries.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// Call entry (true) or return/result entry (false)
    pub is_call: bool,
    /// Nesting depth supplied by the producer (0 = top-level)
    pub level: u32,
    /// Producer-supplied text: the call form, or the result value
    pub display_text: String,
    /// Indentation-prefixed display text, without styling
    pub rendered_text: String,
    /// Identifier of the traced form (callee name)
    pub identifier: CompactString,
    /// Definition target recorded at event-creation time
    pub xref: Option<LineCol>,
    /// Span of the called definition's parameter list
    pub signature_span: Option<Span>,
    /// Span of the call expression at the caller
    pub call_site_span: Option<Span>,
    /// Span of the enclosing calling context
    pub context_span: Option<Span>,
    /// Arrival timestamp (display/export only)
    pub arrived_at: DateTime<Local>,
}

impl LogEntry {
    /// Cross-reference target: identifier plus its definition location
    pub fn xref_target(&self) -> Option<(&str, LineCol)> {
        self.xref.map(|lc| (self.identifier.as_str(), lc))
    }

    /// Span an excerpt of this entry should center on
    ///
    /// The enclosing context wins over the bare call site; the signature is
    /// the fallback when the producer sent nothing else.
    pub fn focus_span(&self) -> Option<Span> {
        self.context_span
            .or(self.call_site_span)
            .or(self.signature_span)
    }
}

// =============================================================================
// TESTS
// =============================================================================
