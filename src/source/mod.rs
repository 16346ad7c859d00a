//! Source Resource Store
//!
//! Backs trace entries with the source text they point into:
//!
//! - **ResourceTable**: path ⇄ `ResourceId` interning
//! - **SourceText**: cached file content with line-offset index
//! - **SourceStore**: LRU-bounded cache of opened resources
//! - **Excerpt**: annotated context blocks around a focused span
//!
//! Opening is lazy and never displayed by itself; the view layer decides
//! what to print. A resource that cannot be read surfaces as
//! `ResourceUnavailable` and callers degrade gracefully.
//!
//! @module source

use std::collections::HashMap;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::debug;

use crate::core::config::SourceConfig;
use crate::core::error::{Error, Result};
use crate::log::render::{level_color, palette};
use crate::log::types::{ResourceId, Span};

// =============================================================================
// RESOURCE TABLE
// =============================================================================

/// Interned path storage
///
/// Every source path is stored once and referenced by `ResourceId`
/// everywhere else. Ids are stable for the lifetime of the session.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    /// Interned paths, indexed by id
    paths: Vec<PathBuf>,
    /// Map from path to id for deduplication
    lookup: HashMap<PathBuf, ResourceId>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a path, returning its id
    ///
    /// If the path is already interned, returns the existing id.
    pub fn intern(&mut self, path: &Path) -> ResourceId {
        if let Some(&rid) = self.lookup.get(path) {
            return rid;
        }
        let rid = ResourceId(self.paths.len() as u32);
        self.paths.push(path.to_path_buf());
        self.lookup.insert(path.to_path_buf(), rid);
        rid
    }

    /// Path for an id
    pub fn path(&self, rid: ResourceId) -> Option<&Path> {
        self.paths.get(rid.index()).map(PathBuf::as_path)
    }

    /// Id for a path, if interned
    pub fn get(&self, path: &Path) -> Option<ResourceId> {
        self.lookup.get(path).copied()
    }

    /// Number of interned paths
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

// =============================================================================
// SOURCE TEXT
// =============================================================================

/// Loaded content of one resource with a line-offset index
#[derive(Debug, Clone)]
pub struct SourceText {
    text: String,
    /// Byte offset of each line start; always begins with 0
    line_offsets: Vec<u32>,
}

impl SourceText {
    pub fn from_string(text: String) -> Self {
        let mut line_offsets = vec![0u32];
        for (i, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_offsets.push(i as u32 + 1);
            }
        }
        Self { text, line_offsets }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of lines (a trailing newline does not start a new line)
    pub fn line_count(&self) -> u32 {
        match self.line_offsets.last() {
            Some(&last) if last as usize == self.text.len() && !self.text.is_empty() => {
                self.line_offsets.len() as u32 - 1
            }
            _ if self.text.is_empty() => 0,
            _ => self.line_offsets.len() as u32,
        }
    }

    /// 1-indexed line containing the byte offset (clamped past the end)
    pub fn line_of_offset(&self, offset: u32) -> u32 {
        let n = self.line_offsets.partition_point(|&start| start <= offset);
        (n as u32).clamp(1, self.line_count().max(1))
    }

    /// Byte range of a 1-indexed line, excluding the line terminator
    pub fn line_bounds(&self, line: u32) -> Option<(u32, u32)> {
        if line == 0 || line > self.line_count() {
            return None;
        }
        let idx = line as usize - 1;
        let start = self.line_offsets[idx];
        let raw_end = self
            .line_offsets
            .get(idx + 1)
            .copied()
            .unwrap_or(self.text.len() as u32);
        let bytes = self.text.as_bytes();
        let mut end = raw_end;
        if end > start && bytes[end as usize - 1] == b'\n' {
            end -= 1;
            if end > start && bytes[end as usize - 1] == b'\r' {
                end -= 1;
            }
        }
        Some((start, end))
    }

    /// Content of a 1-indexed line
    pub fn line(&self, line: u32) -> Option<&str> {
        let (start, end) = self.line_bounds(line)?;
        Some(self.slice(start, end))
    }

    /// Byte slice as text; empty on out-of-range or non-boundary offsets
    pub fn slice(&self, begin: u32, end: u32) -> &str {
        self.text.get(begin as usize..end as usize).unwrap_or("")
    }
}

// =============================================================================
// EXCERPT
// =============================================================================

/// How painted text renders over a span in an excerpt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoration {
    /// Hide the span and show this text in its place
    Replace(String),
    /// Keep the span and append this text after it
    Trailing(String),
}

/// One visible annotation projected onto an excerpt
#[derive(Debug, Clone)]
pub struct ExcerptMark {
    pub span: Span,
    pub level: u32,
    pub decoration: Decoration,
}

/// Annotated context block around a focused span
#[derive(Debug, Clone)]
pub struct Excerpt {
    /// 1-indexed line the focus span starts on
    pub focus_line: u32,
    /// Formatted rows, one per source line, gutter included
    rows: Vec<String>,
}

impl Excerpt {
    pub fn format(&self) -> String {
        self.rows.join("\n")
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Render one line with every mark that starts on it applied
///
/// Marks are clamped to the line they start on; the compact previews and
/// result markers painted here are single-line in practice.
fn decorate_line(text: &SourceText, line: u32, marks: &[ExcerptMark], color: bool) -> String {
    let Some((start, end)) = text.line_bounds(line) else {
        return String::new();
    };

    let mut line_marks: Vec<&ExcerptMark> = marks
        .iter()
        .filter(|m| m.span.begin >= start && m.span.begin < end)
        .collect();
    line_marks.sort_by_key(|m| m.span.begin);

    let mut out = String::new();
    let mut cursor = start;
    for mark in line_marks {
        if mark.span.begin < cursor {
            // swallowed by a preceding replacement
            continue;
        }
        out.push_str(text.slice(cursor, mark.span.begin));
        let clamped_end = mark.span.end.min(end).max(mark.span.begin);
        match &mark.decoration {
            Decoration::Replace(replacement) => {
                push_styled(&mut out, replacement, mark.level, color);
            }
            Decoration::Trailing(tail) => {
                out.push_str(text.slice(mark.span.begin, clamped_end));
                push_styled(&mut out, tail, mark.level, color);
            }
        }
        cursor = clamped_end;
    }
    out.push_str(text.slice(cursor, end));
    out
}

fn push_styled(out: &mut String, piece: &str, level: u32, color: bool) {
    if color {
        out.push_str(level_color(level));
        out.push_str(piece);
        out.push_str(palette::RESET);
    } else {
        out.push_str(piece);
    }
}

// =============================================================================
// SOURCE STORE
// =============================================================================

/// LRU-bounded store of opened source resources
pub struct SourceStore {
    resources: ResourceTable,
    open: LruCache<ResourceId, SourceText>,
    max_file_size: u64,
}

impl SourceStore {
    pub fn new(config: &SourceConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_open.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            resources: ResourceTable::new(),
            open: LruCache::new(capacity),
            max_file_size: config.max_file_size,
        }
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::new(&SourceConfig::default())
    }

    /// Intern a path, returning its resource id
    pub fn intern(&mut self, path: &Path) -> ResourceId {
        self.resources.intern(path)
    }

    /// Resource id for a path, if already interned
    pub fn resource_id(&self, path: &Path) -> Option<ResourceId> {
        self.resources.get(path)
    }

    /// Path for a resource id
    pub fn path(&self, rid: ResourceId) -> Option<&Path> {
        self.resources.path(rid)
    }

    /// Open a resource into the cache without displaying it
    ///
    /// Reuses cached text when present (refreshing its recency); otherwise
    /// reads the file. Any read failure, including a file over the size cap,
    /// reports the resource as unavailable.
    pub fn ensure_open(&mut self, rid: ResourceId) -> Result<&SourceText> {
        let path = match self.resources.path(rid) {
            Some(p) => p.to_path_buf(),
            None => {
                return Err(Error::ResourceUnavailable {
                    path: PathBuf::from(format!("<unknown {}>", rid)),
                })
            }
        };
        if !self.open.contains(&rid) {
            let text = Self::load(&path, self.max_file_size)?;
            debug!(resource = %rid, path = %path.display(), bytes = text.len(), "opened source resource");
            self.open.put(rid, text);
        }
        match self.open.get(&rid) {
            Some(text) => Ok(text),
            None => Err(Error::ResourceUnavailable { path }),
        }
    }

    /// Whether a resource is currently cached
    pub fn is_open(&self, rid: ResourceId) -> bool {
        self.open.contains(&rid)
    }

    /// Number of cached resources
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    /// Drop cached text after an edit; the next open rereads the file
    pub fn invalidate(&mut self, rid: ResourceId) {
        if self.open.pop(&rid).is_some() {
            debug!(resource = %rid, "invalidated cached source text");
        }
    }

    /// Drop every cached text (interned ids stay stable)
    pub fn clear(&mut self) {
        self.open.clear();
    }

    /// Annotated context block around `focus`
    ///
    /// `context_lines` source lines are shown on each side of the focus
    /// line, with a `>` gutter marker on the focus line itself and every
    /// mark painted in its level color.
    pub fn excerpt(
        &mut self,
        focus: Span,
        marks: &[ExcerptMark],
        context_lines: u32,
        color: bool,
    ) -> Result<Excerpt> {
        let text = self.ensure_open(focus.resource)?;
        let focus_line = text.line_of_offset(focus.begin);
        let first = focus_line.saturating_sub(context_lines).max(1);
        let last = (focus_line + context_lines).min(text.line_count().max(1));

        let mut rows = Vec::with_capacity((last - first + 1) as usize);
        for line in first..=last {
            let body = decorate_line(text, line, marks, color);
            if line == focus_line {
                rows.push(format!("> {:>4}: {}", line, body));
            } else {
                rows.push(format!("  {:>4}: {}", line, body));
            }
        }
        Ok(Excerpt { focus_line, rows })
    }

    fn load(path: &Path, max_file_size: u64) -> Result<SourceText> {
        let meta = fs::metadata(path).map_err(|err| {
            debug!(path = %path.display(), %err, "source resource not readable");
            Error::ResourceUnavailable {
                path: path.to_path_buf(),
            }
        })?;
        if meta.len() > max_file_size {
            debug!(path = %path.display(), size = meta.len(), "source resource over size cap");
            return Err(Error::ResourceUnavailable {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|err| {
            debug!(path = %path.display(), %err, "failed to read source resource");
            Error::ResourceUnavailable {
                path: path.to_path_buf(),
            }
        })?;
        Ok(SourceText::from_string(content))
    }
}

// =============================================================================
// TESTS
// =============================================================================
