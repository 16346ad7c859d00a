//! Trace Event Log
//!
//! Append-only store of rendered trace entries plus the renderer that
//! produces them:
//!
//! - **types**: source locations, spans and log entries
//! - **store**: the ordered, append-only event log
//! - **render**: event-to-entry rendering with indentation and level colors
//!
//! @module log

pub mod render;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use render::{level_color, Renderer, PALETTE_SIZE, RETURN_MARKER};
pub use store::EventLog;
pub use types::{LineCol, LogEntry, ResourceId, SourceLocation, Span};
