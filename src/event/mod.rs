//! Inbound Trace Events
//!
//! The wire model for events emitted by an instrumented program. One JSON
//! object per line; every source location is optional on the wire. Decoding
//! is transport-level; `validate` applies the semantic rules before an event
//! is allowed into the log.
//!
//! @module event

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::{Error, Result};
use crate::log::types::SourceLocation;
use crate::source::SourceStore;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// A source location as carried on the wire (paths, not interned ids)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireLocation {
    pub path: PathBuf,
    /// 1-indexed line
    pub line: u32,
    /// 0-indexed column
    pub column: u32,
    pub byte_offset: u32,
    pub length: u32,
}

impl WireLocation {
    pub fn new(path: impl Into<PathBuf>, line: u32, column: u32, byte_offset: u32, length: u32) -> Self {
        Self {
            path: path.into(),
            line,
            column,
            byte_offset,
            length,
        }
    }

    /// Intern the path and produce the in-memory location
    pub fn resolve(&self, sources: &mut SourceStore) -> SourceLocation {
        let resource = sources.intern(&self.path);
        SourceLocation::new(resource, self.line, self.column, self.byte_offset, self.length)
    }
}

/// One call or return notification from the producer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// true for a call, false for a return carrying a result
    pub is_call: bool,
    /// Pre-rendered text: the call form, or the result value
    pub display_text: String,
    /// Name of the traced function
    pub identifier_name: String,
    /// Nesting depth reported by the producer
    pub level: u32,
    /// Where the traced function is defined (jump target)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_loc: Option<WireLocation>,
    /// The definition's signature form (annotation target)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_loc: Option<WireLocation>,
    /// The call site being executed (annotation target)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_site_loc: Option<WireLocation>,
    /// Enclosing form shown as context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_loc: Option<WireLocation>,
}

impl TraceEvent {
    /// A call event with no locations attached
    pub fn call(display_text: impl Into<String>, identifier: impl Into<String>, level: u32) -> Self {
        Self {
            is_call: true,
            display_text: display_text.into(),
            identifier_name: identifier.into(),
            level,
            definition_loc: None,
            signature_loc: None,
            call_site_loc: None,
            context_loc: None,
        }
    }

    /// A return event carrying a result value
    pub fn ret(display_text: impl Into<String>, identifier: impl Into<String>, level: u32) -> Self {
        Self {
            is_call: false,
            ..Self::call(display_text, identifier, level)
        }
    }

    pub fn with_definition(mut self, loc: WireLocation) -> Self {
        self.definition_loc = Some(loc);
        self
    }

    pub fn with_signature(mut self, loc: WireLocation) -> Self {
        self.signature_loc = Some(loc);
        self
    }

    pub fn with_call_site(mut self, loc: WireLocation) -> Self {
        self.call_site_loc = Some(loc);
        self
    }

    pub fn with_context(mut self, loc: WireLocation) -> Self {
        self.context_loc = Some(loc);
        self
    }

    /// Decode one JSON line into an event (transport level only)
    pub fn decode_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Encode as one JSON line
    pub fn encode_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Semantic validation applied before an event may enter the log
    ///
    /// Rules: non-empty display text; calls name their function; any
    /// location present must have a 1-indexed line and a non-empty span
    /// whose end still fits in the byte range.
    pub fn validate(&self) -> Result<()> {
        if self.display_text.is_empty() {
            return Err(Error::malformed("empty display text"));
        }
        if self.is_call && self.identifier_name.is_empty() {
            return Err(Error::malformed("call event without identifier name"));
        }
        for (name, loc) in [
            ("definition_loc", &self.definition_loc),
            ("signature_loc", &self.signature_loc),
            ("call_site_loc", &self.call_site_loc),
            ("context_loc", &self.context_loc),
        ] {
            if let Some(loc) = loc {
                if loc.line == 0 {
                    return Err(Error::malformed(format!("{} has line 0", name)));
                }
                if loc.length == 0 {
                    return Err(Error::malformed(format!("{} has an empty span", name)));
                }
                if loc.byte_offset.checked_add(loc.length).is_none() {
                    return Err(Error::malformed(format!("{} span end overflows", name)));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
