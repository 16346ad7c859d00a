//! Annotation Manager
//!
//! Paints trace entries back onto their source files as overlays:
//!
//! - **Caller** overlays mark the call site of every entry in the active
//!   caller chain; calls replace the span with the live call form, returns
//!   keep it and append the result marker
//! - **Signature** overlays mirror the call over the definition's parameter
//!   list when that file is already open and the span is not taken
//!
//! The manager exclusively owns every overlay it creates. Retraction hides
//! the overlay and recycles its slot through a free pool; a later paint
//! reuses pooled slots before allocating new ones. Overlays never survive
//! an edit: the watcher's first change notification for a resource retracts
//! everything in it.
//!
//! @module annotate

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, warn};

use crate::log::render::RETURN_MARKER;
use crate::log::types::{LogEntry, ResourceId, Span};
use crate::log::EventLog;
use crate::nav::NavCursor;
use crate::source::{Decoration, ExcerptMark, SourceStore};
use crate::watch::ResourceWatcher;

// =============================================================================
// TYPES
// =============================================================================

/// Session-unique overlay identity
///
/// Slot reuse recycles storage, never ids: every paint gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u32);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "o{}", self.0)
    }
}

/// What an overlay marks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    /// A call site in the active caller chain
    Caller,
    /// The called definition's parameter list
    Signature,
}

/// One painted region of source text
#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: OverlayId,
    pub span: Span,
    pub level: u32,
    pub kind: OverlayKind,
    pub decoration: Decoration,
    pub visible: bool,
}

impl Overlay {
    #[inline]
    pub fn resource(&self) -> ResourceId {
        self.span.resource
    }
}

// =============================================================================
// ANNOTATION MANAGER
// =============================================================================

/// Owns every overlay in the session
#[derive(Debug, Default)]
pub struct AnnotationManager {
    /// All slots ever allocated; retracted ones are reused via `free`
    slots: Vec<Overlay>,
    /// Indices of retracted slots available for reuse
    free: Vec<usize>,
    next_id: u32,
}

impl AnnotationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint the current entry and its caller chain
    ///
    /// Every previous overlay is retracted first, so two consecutive calls
    /// leave exactly the later chain visible. Entries are processed root
    /// first and the focused entry last; a resource that cannot be opened
    /// skips its entry without failing. Watches are synced to the set of
    /// resources that ended up holding overlays.
    ///
    /// Returns the number of entries that received a caller overlay.
    pub fn show_context(
        &mut self,
        log: &EventLog,
        cursor: &NavCursor,
        sources: &mut SourceStore,
        watcher: &mut ResourceWatcher,
    ) -> usize {
        self.retract_all();

        let mut painted = 0;
        if let Some(pos) = cursor.position() {
            let chain = cursor.ancestor_chain(log);
            for &idx in chain.iter().rev() {
                if let Some(entry) = log.get(idx) {
                    painted += usize::from(self.paint_entry(entry, sources));
                }
            }
            if let Some(entry) = log.get(pos) {
                painted += usize::from(self.paint_entry(entry, sources));
            }
        }

        self.sync_watches(sources, watcher);
        painted
    }

    /// Paint one entry's call site (and signature when applicable)
    ///
    /// Returns whether a caller overlay was placed.
    fn paint_entry(&mut self, entry: &LogEntry, sources: &mut SourceStore) -> bool {
        let Some(call_site) = entry.call_site_span else {
            return false;
        };
        if let Err(err) = sources.ensure_open(call_site.resource) {
            // annotation never blocks navigation
            debug!(%err, "skipping annotation for unavailable resource");
            return false;
        }

        let decoration = if entry.is_call {
            Decoration::Replace(entry.display_text.clone())
        } else {
            Decoration::Trailing(format!("{}{}", RETURN_MARKER, entry.display_text))
        };
        self.place(call_site, entry.level, OverlayKind::Caller, decoration);

        if entry.is_call {
            if let Some(signature) = entry.signature_span {
                // only annotate definitions already open, and never fight a
                // coincident caller overlay over the same span
                if sources.is_open(signature.resource) && !self.occupied(signature.key()) {
                    self.place(
                        signature,
                        entry.level,
                        OverlayKind::Signature,
                        Decoration::Replace(entry.display_text.clone()),
                    );
                }
            }
        }
        true
    }

    /// Place an overlay, reusing a pooled slot when one is free
    ///
    /// A visible caller overlay at the same exact span is retracted first;
    /// at most one caller per span is ever visible.
    fn place(
        &mut self,
        span: Span,
        level: u32,
        kind: OverlayKind,
        decoration: Decoration,
    ) -> OverlayId {
        if kind == OverlayKind::Caller {
            let key = span.key();
            let dup: Vec<usize> = self
                .slots
                .iter()
                .enumerate()
                .filter(|(_, ov)| {
                    ov.visible && ov.kind == OverlayKind::Caller && ov.span.key() == key
                })
                .map(|(idx, _)| idx)
                .collect();
            for idx in dup {
                self.retract_slot(idx);
            }
        }

        let id = OverlayId(self.next_id);
        self.next_id += 1;
        let overlay = Overlay {
            id,
            span,
            level,
            kind,
            decoration,
            visible: true,
        };
        match self.free.pop() {
            Some(idx) => self.slots[idx] = overlay,
            None => self.slots.push(overlay),
        }
        id
    }

    fn retract_slot(&mut self, idx: usize) {
        if let Some(overlay) = self.slots.get_mut(idx) {
            if overlay.visible {
                overlay.visible = false;
                self.free.push(idx);
            }
        }
    }

    /// Retract every visible overlay
    pub fn retract_all(&mut self) -> usize {
        self.retract_where(|_| true)
    }

    /// Retract every visible overlay in one resource
    pub fn retract_resource(&mut self, rid: ResourceId) -> usize {
        self.retract_where(|ov| ov.span.resource == rid)
    }

    fn retract_where(&mut self, pred: impl Fn(&Overlay) -> bool) -> usize {
        let mut count = 0;
        for idx in 0..self.slots.len() {
            if self.slots[idx].visible && pred(&self.slots[idx]) {
                self.retract_slot(idx);
                count += 1;
            }
        }
        count
    }

    /// Whether any visible overlay sits at this exact span
    fn occupied(&self, key: (ResourceId, u32, u32)) -> bool {
        self.visible_overlays().any(|ov| ov.span.key() == key)
    }

    /// Visible overlays, in slot order
    pub fn visible_overlays(&self) -> impl Iterator<Item = &Overlay> {
        self.slots.iter().filter(|ov| ov.visible)
    }

    /// Number of visible overlays
    pub fn visible_count(&self) -> usize {
        self.visible_overlays().count()
    }

    /// Number of visible overlays in one resource
    pub fn visible_in(&self, rid: ResourceId) -> usize {
        self.visible_overlays()
            .filter(|ov| ov.span.resource == rid)
            .count()
    }

    /// Resources currently holding visible overlays
    pub fn resources(&self) -> HashSet<ResourceId> {
        self.visible_overlays().map(Overlay::resource).collect()
    }

    /// Visible overlays in a resource, projected for excerpt rendering
    pub fn marks_for(&self, rid: ResourceId) -> Vec<ExcerptMark> {
        self.visible_overlays()
            .filter(|ov| ov.span.resource == rid)
            .map(|ov| ExcerptMark {
                span: ov.span,
                level: ov.level,
                decoration: ov.decoration.clone(),
            })
            .collect()
    }

    /// Total slots ever allocated (pool capacity)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Watch every resource holding overlays, unwatch the rest
    fn sync_watches(&self, sources: &SourceStore, watcher: &mut ResourceWatcher) {
        let mut keep = HashSet::new();
        for rid in self.resources() {
            if let Some(path) = sources.path(rid) {
                let path = path.to_path_buf();
                if let Err(err) = watcher.watch(&path) {
                    warn!(path = %path.display(), %err, "failed to watch annotated resource");
                }
                keep.insert(path);
            }
        }
        watcher.retain(&keep);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    use crate::event::{TraceEvent, WireLocation};
    use crate::log::Renderer;

    const MAIN_SRC: &str = "(main)\n(f 1)\n";
    const LIB_SRC: &str = "(defn f (x)\n  (g x))\n(defn g (y)\n  y)\n";

    struct Fixture {
        _dir: TempDir,
        main_path: PathBuf,
        lib_path: PathBuf,
        log: EventLog,
        sources: SourceStore,
        watcher: ResourceWatcher,
        // kept alive so the watcher callback can always send
        _rx: mpsc::Receiver<crate::viewer::ViewerMsg>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let main_path = dir.path().join("main.src");
            let lib_path = dir.path().join("lib.src");
            fs::write(&main_path, MAIN_SRC).unwrap();
            fs::write(&lib_path, LIB_SRC).unwrap();

            let (tx, rx) = mpsc::channel(16);

            Self {
                _dir: dir,
                main_path,
                lib_path,
                log: EventLog::new(),
                sources: SourceStore::for_tests(),
                watcher: ResourceWatcher::new(tx, Duration::from_millis(100)).unwrap(),
                _rx: rx,
            }
        }

        fn loc(path: &Path, line: u32, offset: u32, length: u32) -> WireLocation {
            WireLocation::new(path, line, 0, offset, length)
        }

        /// call f at main.src:2, calling g at lib.src:2, g's params at lib.src:3
        fn ingest_chain(&mut self) {
            let renderer = Renderer::default();
            let events = [
                // "(f 1)" at bytes 7..12 of main.src, f's "(x)" at 8..11 of lib.src
                TraceEvent::call("(f 1)", "f", 0)
                    .with_call_site(Self::loc(&self.main_path, 2, 7, 5))
                    .with_signature(Self::loc(&self.lib_path, 1, 8, 3)),
                // "(g x)" at bytes 14..19 of lib.src, g's "(y)" at 29..32
                TraceEvent::call("(g 1)", "g", 1)
                    .with_call_site(Self::loc(&self.lib_path, 2, 14, 5))
                    .with_signature(Self::loc(&self.lib_path, 3, 29, 3)),
                TraceEvent::ret("1", "g", 1).with_call_site(Self::loc(&self.lib_path, 2, 14, 5)),
                TraceEvent::ret("1", "f", 0).with_call_site(Self::loc(&self.main_path, 2, 7, 5)),
            ];
            for event in &events {
                renderer
                    .append(&mut self.log, &mut self.sources, event)
                    .unwrap();
            }
        }

        fn cursor_at(&self, pos: usize) -> NavCursor {
            let mut cursor = NavCursor::new();
            for _ in 0..=pos {
                cursor.next(&self.log);
            }
            assert_eq!(cursor.position(), Some(pos));
            cursor
        }

        fn rid(&self, path: &Path) -> ResourceId {
            self.sources.resource_id(path).unwrap()
        }
    }

    #[test]
    fn test_show_context_paints_chain_and_focus() {
        let mut fx = Fixture::new();
        fx.ingest_chain();
        let cursor = fx.cursor_at(1); // call g, ancestor is call f

        let mut manager = AnnotationManager::new();
        let painted =
            manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        assert_eq!(painted, 2);

        // f's call site in main, g's call site in lib, g's signature in lib;
        // f's signature was skipped: lib wasn't open when f was painted
        let main_rid = fx.rid(&fx.main_path);
        let lib_rid = fx.rid(&fx.lib_path);
        assert_eq!(manager.visible_in(main_rid), 1);
        assert_eq!(manager.visible_in(lib_rid), 2);

        let kinds: Vec<OverlayKind> = manager.visible_overlays().map(|ov| ov.kind).collect();
        assert_eq!(
            kinds
                .iter()
                .filter(|k| **k == OverlayKind::Signature)
                .count(),
            1
        );
    }

    #[test]
    fn test_return_entry_gets_trailing_decoration() {
        let mut fx = Fixture::new();
        fx.ingest_chain();
        let cursor = fx.cursor_at(2); // return of g

        let mut manager = AnnotationManager::new();
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);

        let lib_rid = fx.rid(&fx.lib_path);
        let trailing = manager
            .marks_for(lib_rid)
            .into_iter()
            .find(|m| matches!(m.decoration, Decoration::Trailing(_)))
            .expect("return entry paints a trailing mark");
        match trailing.decoration {
            Decoration::Trailing(text) => assert_eq!(text, " ⇒ 1"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_consecutive_show_context_supersedes() {
        let mut fx = Fixture::new();
        fx.ingest_chain();
        let mut manager = AnnotationManager::new();

        // open both files up front so repeated paints see the same world
        let main_rid = fx.rid(&fx.main_path);
        let lib_rid = fx.rid(&fx.lib_path);
        fx.sources.ensure_open(main_rid).unwrap();
        fx.sources.ensure_open(lib_rid).unwrap();

        let cursor = fx.cursor_at(1);
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        let first_visible = manager.visible_count();
        assert!(first_visible > 0);

        // same focus again: retract-first leaves exactly one chain visible
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        assert_eq!(manager.visible_count(), first_visible);

        // narrower focus on the level-0 return: exactly one overlay remains
        let cursor = fx.cursor_at(3);
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        assert_eq!(manager.visible_count(), 1);
        assert_eq!(manager.visible_in(main_rid), 1);
        assert_eq!(manager.visible_in(lib_rid), 0);
    }

    #[test]
    fn test_pool_reuses_slots_instead_of_growing() {
        let mut fx = Fixture::new();
        fx.ingest_chain();
        let mut manager = AnnotationManager::new();

        // two warm-up paints reach the steady state (the second one can add
        // a signature overlay once the definition file is cached)
        let cursor = fx.cursor_at(1);
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        let slots_after_warmup = manager.slot_count();

        for _ in 0..4 {
            manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        }
        assert_eq!(manager.slot_count(), slots_after_warmup);
    }

    #[test]
    fn test_caller_overlays_unique_per_span() {
        let mut fx = Fixture::new();
        // recursive shape: both calls share the same call site span
        let renderer = Renderer::default();
        let site = Fixture::loc(&fx.main_path, 2, 7, 5);
        let events = [
            TraceEvent::call("(f 2)", "f", 0).with_call_site(site.clone()),
            TraceEvent::call("(f 1)", "f", 1).with_call_site(site),
        ];
        for event in &events {
            renderer
                .append(&mut fx.log, &mut fx.sources, event)
                .unwrap();
        }

        let cursor = fx.cursor_at(1);
        let mut manager = AnnotationManager::new();
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);

        // the focused entry's paint replaced the ancestor's at the shared span
        assert_eq!(manager.visible_count(), 1);
        let overlay = manager.visible_overlays().next().unwrap();
        assert_eq!(overlay.level, 1);
        match &overlay.decoration {
            Decoration::Replace(text) => assert_eq!(text, "(f 1)"),
            other => panic!("expected Replace, got {:?}", other),
        }
    }

    #[test]
    fn test_unavailable_resource_skips_silently() {
        let mut fx = Fixture::new();
        let renderer = Renderer::default();
        let missing = fx._dir.path().join("gone.src");
        let event = TraceEvent::call("(h 1)", "h", 0)
            .with_call_site(Fixture::loc(&missing, 1, 0, 5));
        renderer
            .append(&mut fx.log, &mut fx.sources, &event)
            .unwrap();

        let cursor = fx.cursor_at(0);
        let mut manager = AnnotationManager::new();
        let painted =
            manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        assert_eq!(painted, 0);
        assert_eq!(manager.visible_count(), 0);
    }

    #[test]
    fn test_edit_retraction_empties_resource() {
        let mut fx = Fixture::new();
        fx.ingest_chain();
        let cursor = fx.cursor_at(1);
        let mut manager = AnnotationManager::new();
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);

        let lib_rid = fx.rid(&fx.lib_path);
        let main_rid = fx.rid(&fx.main_path);
        assert!(manager.visible_in(lib_rid) > 0);

        let retracted = manager.retract_resource(lib_rid);
        assert_eq!(retracted, 2);
        assert_eq!(manager.visible_in(lib_rid), 0);
        assert_eq!(manager.visible_in(main_rid), 1);
    }

    #[test]
    fn test_unplaced_cursor_paints_nothing() {
        let mut fx = Fixture::new();
        fx.ingest_chain();
        let cursor = NavCursor::new();
        let mut manager = AnnotationManager::new();
        let painted =
            manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        assert_eq!(painted, 0);
        assert_eq!(manager.visible_count(), 0);
    }

    #[test]
    fn test_watches_track_annotated_resources() {
        let mut fx = Fixture::new();
        fx.ingest_chain();
        let mut manager = AnnotationManager::new();

        let cursor = fx.cursor_at(1);
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        assert!(fx.watcher.is_watching(&fx.main_path));
        assert!(fx.watcher.is_watching(&fx.lib_path));

        // focus on the level-0 return: lib no longer annotated, watch dropped
        let cursor = fx.cursor_at(3);
        manager.show_context(&fx.log, &cursor, &mut fx.sources, &mut fx.watcher);
        assert!(fx.watcher.is_watching(&fx.main_path));
        assert!(!fx.watcher.is_watching(&fx.lib_path));
    }

    #[test]
    fn test_overlay_ids_never_repeat() {
        let mut manager = AnnotationManager::new();
        let span = Span::new(ResourceId(0), 0, 4);
        let a = manager.place(span, 0, OverlayKind::Signature, Decoration::Replace("x".into()));
        manager.retract_all();
        let b = manager.place(span, 0, OverlayKind::Signature, Decoration::Replace("y".into()));
        assert_ne!(a, b);
        assert_eq!(manager.slot_count(), 1);
    }
}
