//! Navigation Engine
//!
//! Cursor movement over the event log:
//!
//! - **next / previous**: single steps in log order, clamped at the ends
//! - **up_level**: jump to the nearest preceding entry one level shallower
//! - **ancestor_chain**: the full caller chain from the current entry
//! - **track_append**: follow-the-tail placement as new entries arrive
//!
//! Movement never fails; hitting a boundary reports `false` and leaves the
//! cursor where it was.
//!
//! @module nav

use smallvec::SmallVec;

use crate::log::{EventLog, LogEntry};

// =============================================================================
// NAV CURSOR
// =============================================================================

/// Current position in the event log
///
/// `None` until the first entry arrives or after a clear.
#[derive(Debug, Clone, Default)]
pub struct NavCursor {
    position: Option<usize>,
}

impl NavCursor {
    pub fn new() -> Self {
        Self { position: None }
    }

    /// Current log position, if placed
    #[inline]
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Entry under the cursor
    pub fn current<'a>(&self, log: &'a EventLog) -> Option<&'a LogEntry> {
        self.position.and_then(|pos| log.get(pos))
    }

    /// Step one entry forward; returns whether the cursor moved
    pub fn next(&mut self, log: &EventLog) -> bool {
        match self.position {
            None if !log.is_empty() => {
                self.position = Some(0);
                true
            }
            Some(pos) if pos + 1 < log.len() => {
                self.position = Some(pos + 1);
                true
            }
            _ => false,
        }
    }

    /// Step one entry backward; returns whether the cursor moved
    pub fn previous(&mut self, log: &EventLog) -> bool {
        match self.position {
            None if !log.is_empty() => {
                self.position = Some(log.len() - 1);
                true
            }
            Some(pos) if pos > 0 => {
                self.position = Some(pos - 1);
                true
            }
            _ => false,
        }
    }

    /// Jump to the nearest preceding entry exactly one level shallower
    ///
    /// A level-0 entry has no caller; the scan is strictly backward, so a
    /// later shallow entry (the eventual return) is never chosen. Returns
    /// whether the cursor moved.
    pub fn up_level(&mut self, log: &EventLog) -> bool {
        let Some(pos) = self.position else {
            return false;
        };
        let Some(entry) = log.get(pos) else {
            return false;
        };
        if entry.level == 0 {
            return false;
        }
        match parent_of(log, pos, entry.level) {
            Some(parent) => {
                self.position = Some(parent);
                true
            }
            None => false,
        }
    }

    /// Caller chain from the current entry, nearest first
    ///
    /// Each stop is one level shallower than the previous, down to level 0,
    /// so the levels along the chain strictly decrease.
    pub fn ancestor_chain(&self, log: &EventLog) -> SmallVec<[usize; 8]> {
        let mut chain = SmallVec::new();
        let Some(mut pos) = self.position else {
            return chain;
        };
        let Some(mut level) = log.get(pos).map(|e| e.level) else {
            return chain;
        };
        while level > 0 {
            match parent_of(log, pos, level) {
                Some(parent) => {
                    chain.push(parent);
                    pos = parent;
                    level -= 1;
                }
                None => break,
            }
        }
        chain
    }

    /// Follow the tail: after an append at `appended`, move only if the
    /// cursor sat on the previous last entry (or the log was empty)
    pub fn track_append(&mut self, appended: usize) {
        let was_at_end = match self.position {
            None => appended == 0,
            Some(pos) => pos + 1 == appended,
        };
        if was_at_end {
            self.position = Some(appended);
        }
    }

    /// Unplace the cursor (the log was cleared)
    pub fn reset(&mut self) {
        self.position = None;
    }
}

/// Nearest entry before `pos` whose level is exactly `level - 1`
fn parent_of(log: &EventLog, pos: usize, level: u32) -> Option<usize> {
    let want = level.checked_sub(1)?;
    (0..pos).rev().find(|&i| log.get(i).map(|e| e.level) == Some(want))
}

// =============================================================================
// TESTS
// =============================================================================
