//! Traceview - Hierarchical trace viewer for instrumented programs
//!
//! Ingests call/return trace events, renders them as an indented log,
//! navigates the call hierarchy, and paints annotations over the source
//! files the events point into.

pub mod annotate;
pub mod cli;
pub mod core;
pub mod event;
pub mod log;
pub mod nav;
pub mod output;
pub mod source;
pub mod viewer;
pub mod watch;
pub mod xref;

pub use crate::core::config::Config;
pub use crate::core::error::{Error, Result};
