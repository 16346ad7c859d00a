//! Resource Watcher
//!
//! Edit notifications for annotated source files. Each resource holding
//! overlays is watched through its parent directory; a content change is
//! forwarded as `ViewerMsg::Edited` into the session queue, where it
//! retracts every overlay in that resource and drops the cached text.
//!
//! Watches are per-resource: added when annotations first land in a file,
//! removed once a retraction pass leaves the file bare.
//!
//! @module watch

use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::core::error::Result;
use crate::viewer::ViewerMsg;

// =============================================================================
// RESOURCE WATCHER
// =============================================================================

/// Watches annotated resources for edits
///
/// The notify backend watches parent directories (editors often replace a
/// file on save, which breaks a watch on the file itself); the callback
/// filters down to exactly the paths currently of interest.
pub struct ResourceWatcher {
    watcher: RecommendedWatcher,
    /// Paths currently of interest; shared with the notify callback
    watched: Arc<RwLock<HashSet<PathBuf>>>,
    /// Directory watch refcounts (several resources may share a parent)
    dirs: HashMap<PathBuf, usize>,
}

impl ResourceWatcher {
    /// Create a watcher forwarding edit notifications into the session queue
    pub fn new(tx: mpsc::Sender<ViewerMsg>, poll_interval: Duration) -> Result<Self> {
        let watched: Arc<RwLock<HashSet<PathBuf>>> = Arc::new(RwLock::new(HashSet::new()));
        let filter = Arc::clone(&watched);

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    if !is_content_change(&event.kind) {
                        return;
                    }
                    for path in &event.paths {
                        if filter.read().contains(path) {
                            debug!(path = %path.display(), "source resource edited");
                            let _ = tx.blocking_send(ViewerMsg::Edited(path.clone()));
                        }
                    }
                }
                Err(e) => error!("watch error: {}", e),
            },
            NotifyConfig::default().with_poll_interval(poll_interval),
        )?;

        Ok(Self {
            watcher,
            watched,
            dirs: HashMap::new(),
        })
    }

    /// Start watching a resource path
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        if !self.watched.write().insert(path.to_path_buf()) {
            return Ok(());
        }
        let dir = parent_dir(path);
        let count = self.dirs.get(&dir).copied().unwrap_or(0);
        if count == 0 {
            if let Err(e) = self.watcher.watch(&dir, RecursiveMode::NonRecursive) {
                self.watched.write().remove(path);
                return Err(e.into());
            }
            debug!(dir = %dir.display(), "watching directory");
        }
        self.dirs.insert(dir, count + 1);
        Ok(())
    }

    /// Stop watching a resource path
    pub fn unwatch(&mut self, path: &Path) {
        if !self.watched.write().remove(path) {
            return;
        }
        let dir = parent_dir(path);
        if let Some(count) = self.dirs.get_mut(&dir) {
            *count -= 1;
            if *count == 0 {
                self.dirs.remove(&dir);
                let _ = self.watcher.unwatch(&dir);
                debug!(dir = %dir.display(), "stopped watching directory");
            }
        }
    }

    /// Unwatch every path not in `keep`
    pub fn retain(&mut self, keep: &HashSet<PathBuf>) {
        let stale: Vec<PathBuf> = self
            .watched
            .read()
            .iter()
            .filter(|p| !keep.contains(*p))
            .cloned()
            .collect();
        for path in stale {
            self.unwatch(&path);
        }
    }

    /// Unwatch everything
    pub fn clear(&mut self) {
        let all: Vec<PathBuf> = self.watched.read().iter().cloned().collect();
        for path in all {
            self.unwatch(&path);
        }
    }

    /// Whether a path is currently watched
    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched.read().contains(path)
    }

    /// Number of watched paths
    pub fn watched_count(&self) -> usize {
        self.watched.read().len()
    }
}

/// Event kinds that mean the file's content may have changed
fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

// =============================================================================
// TESTS
// =============================================================================
