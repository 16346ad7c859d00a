//! Viewer Session
//!
//! The single logical thread of the viewer. Every mutation of session state
//! flows through one message queue with one consumer:
//!
//! - **Trace**: validate, render, append, follow the tail
//! - **Command**: operator navigation and log maintenance
//! - **Edited**: a watched source file changed on disk
//!
//! Producers (the event listener, the command reader, the watcher callback)
//! only ever send messages; they never touch the log, cursor, overlays or
//! source cache directly, so handlers run to completion in arrival order
//! without locks.
//!
//! @module viewer

pub mod ingest;

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::annotate::AnnotationManager;
use crate::core::config::Config;
use crate::event::TraceEvent;
use crate::log::types::Span;
use crate::log::{EventLog, Renderer};
use crate::nav::NavCursor;
use crate::output::{create_formatter, LogFormatter, OutputFormat};
use crate::source::SourceStore;
use crate::watch::ResourceWatcher;
use crate::xref::{DefinitionResolver, LogResolver};

// =============================================================================
// MESSAGES
// =============================================================================

/// Everything that can reach the session, in one queue
#[derive(Debug)]
pub enum ViewerMsg {
    /// A trace event arrived from the producer
    Trace(TraceEvent),
    /// The operator issued a command
    Command(Command),
    /// A watched source file changed on disk
    Edited(PathBuf),
}

/// Operator commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Move to the next log entry
    Next,
    /// Move to the previous log entry
    Previous,
    /// Move to the nearest enclosing caller
    UpLevel,
    /// Jump to the current entry's definition
    FindDefinition,
    /// Wipe the log and every annotation
    Clear { force: bool },
    /// Show the command summary
    Help,
    /// End the session
    Quit,
}

impl Command {
    /// Parse one operator input line
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "n" | "next" => Some(Self::Next),
            "p" | "prev" | "previous" => Some(Self::Previous),
            "u" | "up" => Some(Self::UpLevel),
            "d" | "def" | "definition" => Some(Self::FindDefinition),
            "c" | "clear" => Some(Self::Clear { force: false }),
            "c!" | "clear!" => Some(Self::Clear { force: true }),
            "h" | "help" | "?" => Some(Self::Help),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }

    /// One-line-per-command help text
    pub fn help_text() -> &'static str {
        "commands:\n  \
         n, next       next log entry\n  \
         p, prev       previous log entry\n  \
         u, up         enclosing caller\n  \
         d, def        jump to definition\n  \
         c, clear      clear the log (asks first; c! skips the prompt)\n  \
         h, help       this summary\n  \
         q, quit       exit"
    }
}

// =============================================================================
// VIEWER SESSION
// =============================================================================

/// Owns all viewer state; consumes the message queue
pub struct ViewerSession {
    config: Config,
    log: EventLog,
    cursor: NavCursor,
    annotations: AnnotationManager,
    sources: SourceStore,
    watcher: ResourceWatcher,
    renderer: Renderer,
    resolver: LogResolver,
    formatter: Box<dyn LogFormatter>,
    /// Excerpts follow the formatter: no ANSI when piping plain
    color: bool,
    malformed_count: u64,
}

impl ViewerSession {
    pub fn new(config: Config, watcher: ResourceWatcher, format: OutputFormat) -> Self {
        let renderer = Renderer::new(config.view.indent_unit.clone());
        let sources = SourceStore::new(&config.source);
        let color = config.view.color && format == OutputFormat::Ansi;
        Self {
            config,
            log: EventLog::new(),
            cursor: NavCursor::new(),
            annotations: AnnotationManager::new(),
            sources,
            watcher,
            renderer,
            resolver: LogResolver::new(),
            formatter: create_formatter(format),
            color,
            malformed_count: 0,
        }
    }

    /// Consume messages until the queue closes or the operator quits
    pub async fn run(&mut self, mut rx: mpsc::Receiver<ViewerMsg>) {
        info!("viewer session started");
        while let Some(msg) = rx.recv().await {
            if !self.handle(msg) {
                break;
            }
        }
        info!(
            entries = self.log.len(),
            malformed = self.malformed_count,
            "viewer session ended"
        );
    }

    /// Handle one message to completion; returns false to end the session
    pub fn handle(&mut self, msg: ViewerMsg) -> bool {
        match msg {
            ViewerMsg::Trace(event) => {
                self.handle_trace(&event);
                true
            }
            ViewerMsg::Command(command) => self.handle_command(command),
            ViewerMsg::Edited(path) => {
                self.handle_edited(&path);
                true
            }
        }
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    fn handle_trace(&mut self, event: &TraceEvent) {
        match self.renderer.append(&mut self.log, &mut self.sources, event) {
            Ok(appended) => {
                self.cursor.track_append(appended);
                if let Some(entry) = self.log.get(appended) {
                    println!("{}", self.formatter.format_entry(entry));
                }
            }
            Err(err) => {
                self.malformed_count += 1;
                warn!(%err, dropped = self.malformed_count, "dropped malformed trace event");
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Next => {
                if self.cursor.next(&self.log) {
                    self.refresh_context();
                } else {
                    println!("At end of log");
                }
            }
            Command::Previous => {
                if self.cursor.previous(&self.log) {
                    self.refresh_context();
                } else {
                    println!("At start of log");
                }
            }
            Command::UpLevel => {
                if self.cursor.up_level(&self.log) {
                    self.refresh_context();
                } else {
                    println!("No enclosing caller");
                }
            }
            Command::FindDefinition => self.find_definition(),
            Command::Clear { .. } => self.clear(),
            Command::Help => println!("{}", Command::help_text()),
            Command::Quit => return false,
        }
        true
    }

    fn handle_edited(&mut self, path: &Path) {
        let Some(rid) = self.sources.resource_id(path) else {
            return;
        };
        let retracted = self.annotations.retract_resource(rid);
        self.sources.invalidate(rid);
        self.watcher.unwatch(path);
        if retracted > 0 {
            info!(path = %path.display(), retracted, "source edited, annotations retracted");
            println!("{} changed on disk, annotations removed", path.display());
        }
    }

    // -------------------------------------------------------------------------
    // Command implementations
    // -------------------------------------------------------------------------

    /// Repaint the caller chain and print the position plus context block
    fn refresh_context(&mut self) {
        self.annotations.show_context(
            &self.log,
            &self.cursor,
            &mut self.sources,
            &mut self.watcher,
        );

        let Some(pos) = self.cursor.position() else {
            return;
        };
        let Some(entry) = self.log.get(pos) else {
            return;
        };
        println!("{}", self.formatter.format_position(pos, self.log.len(), entry));

        // one annotated line per ancestor, root first
        let chain = self.cursor.ancestor_chain(&self.log);
        let ancestor_spans: Vec<Span> = chain
            .iter()
            .rev()
            .filter_map(|&idx| self.log.get(idx).and_then(|e| e.call_site_span))
            .collect();
        for span in ancestor_spans {
            let marks = self.annotations.marks_for(span.resource);
            if let Ok(excerpt) = self.sources.excerpt(span, &marks, 0, self.color) {
                println!("{}", excerpt.format());
            }
        }

        // the focused entry gets the full excerpt
        if let Some(focus) = entry.focus_span() {
            let marks = self.annotations.marks_for(focus.resource);
            match self
                .sources
                .excerpt(focus, &marks, self.config.view.context_lines, self.color)
            {
                Ok(excerpt) => {
                    if let Some(path) = self.sources.path(focus.resource) {
                        println!("{}:{}", path.display(), excerpt.focus_line);
                    }
                    println!("{}", excerpt.format());
                }
                Err(err) => debug!(%err, "focused entry has no readable source"),
            }
        }
    }

    fn find_definition(&mut self) {
        let Some(entry) = self.cursor.current(&self.log) else {
            println!("Log is empty");
            return;
        };
        let name = entry.identifier.clone();
        let Some(target) = self.resolver.resolve(entry) else {
            println!("No definition recorded for this entry");
            return;
        };

        let path = self
            .sources
            .path(target.resource)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("<unknown>"));
        println!("{} defined at {}:{}:{}", name, path.display(), target.line, target.column);

        // show the definition line in context when the file is readable
        let span = self
            .sources
            .ensure_open(target.resource)
            .ok()
            .and_then(|text| text.line_bounds(target.line))
            .map(|(begin, end)| Span::new(target.resource, begin, end));
        if let Some(span) = span {
            let marks = self.annotations.marks_for(target.resource);
            if let Ok(excerpt) =
                self.sources
                    .excerpt(span, &marks, self.config.view.context_lines, self.color)
            {
                println!("{}", excerpt.format());
            }
        } else {
            debug!(path = %path.display(), "definition source unavailable");
        }
    }

    /// Wipe the log and every piece of state derived from it
    fn clear(&mut self) {
        let entries = self.log.len();
        self.log.clear();
        self.annotations.retract_all();
        self.sources.clear();
        self.watcher.clear();
        self.cursor.reset();
        self.malformed_count = 0;
        info!(entries, "trace log cleared");
        println!("Cleared {} entries", entries);
    }

    // -------------------------------------------------------------------------
    // Accessors (state inspection for the surface and tests)
    // -------------------------------------------------------------------------

    #[inline]
    pub fn log(&self) -> &EventLog {
        &self.log
    }

    #[inline]
    pub fn cursor(&self) -> &NavCursor {
        &self.cursor
    }

    #[inline]
    pub fn annotations(&self) -> &AnnotationManager {
        &self.annotations
    }

    #[inline]
    pub fn malformed_count(&self) -> u64 {
        self.malformed_count
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::event::WireLocation;

    struct Harness {
        session: ViewerSession,
        _rx_keepalive: mpsc::Receiver<ViewerMsg>,
        dir: TempDir,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = mpsc::channel(16);
        let watcher = ResourceWatcher::new(tx, Duration::from_millis(100)).unwrap();
        let mut config = Config::default();
        config.view.color = false;
        Harness {
            session: ViewerSession::new(config, watcher, OutputFormat::Plain),
            _rx_keepalive: rx,
            dir,
        }
    }

    fn feed_scenario(h: &mut Harness) -> PathBuf {
        let src = h.dir.path().join("main.src");
        fs::write(&src, "(main)\n(f 1)\n").unwrap();
        let site = WireLocation::new(&src, 2, 0, 7, 5);
        let events = [
            TraceEvent::call("(f 1)", "f", 0)
                .with_call_site(site.clone())
                .with_definition(WireLocation::new(&src, 1, 0, 0, 6)),
            TraceEvent::call("(g 1)", "g", 1).with_call_site(site.clone()),
            TraceEvent::ret("1", "g", 1).with_call_site(site.clone()),
            TraceEvent::ret("1", "f", 0).with_call_site(site),
        ];
        for event in events {
            assert!(h.session.handle(ViewerMsg::Trace(event)));
        }
        src
    }

    #[test]
    fn test_trace_appends_and_follows_tail() {
        let mut h = harness();
        feed_scenario(&mut h);
        assert_eq!(h.session.log().len(), 4);
        assert_eq!(h.session.cursor().position(), Some(3));
    }

    #[test]
    fn test_malformed_event_dropped_whole() {
        let mut h = harness();
        let bad = TraceEvent::call("", "f", 0);
        assert!(h.session.handle(ViewerMsg::Trace(bad)));
        assert_eq!(h.session.log().len(), 0);
        assert_eq!(h.session.malformed_count(), 1);
        // the session keeps accepting afterwards
        let good = TraceEvent::call("(f)", "f", 0);
        h.session.handle(ViewerMsg::Trace(good));
        assert_eq!(h.session.log().len(), 1);
    }

    #[test]
    fn test_navigation_commands_move_cursor() {
        let mut h = harness();
        feed_scenario(&mut h);

        h.session.handle(ViewerMsg::Command(Command::Previous));
        assert_eq!(h.session.cursor().position(), Some(2));
        h.session.handle(ViewerMsg::Command(Command::Next));
        assert_eq!(h.session.cursor().position(), Some(3));
        // clamped at the end
        h.session.handle(ViewerMsg::Command(Command::Next));
        assert_eq!(h.session.cursor().position(), Some(3));
    }

    #[test]
    fn test_up_level_from_nested_return() {
        let mut h = harness();
        feed_scenario(&mut h);
        // cursor at the tail (level-0 return); go to the level-1 return first
        h.session.handle(ViewerMsg::Command(Command::Previous));
        assert_eq!(h.session.cursor().position(), Some(2));
        h.session.handle(ViewerMsg::Command(Command::UpLevel));
        assert_eq!(h.session.cursor().position(), Some(0));
        assert!(h.session.log().get(0).unwrap().is_call);
    }

    #[test]
    fn test_navigation_paints_annotations() {
        let mut h = harness();
        feed_scenario(&mut h);
        h.session.handle(ViewerMsg::Command(Command::Previous));
        assert!(h.session.annotations().visible_count() > 0);
    }

    #[test]
    fn test_clear_wipes_everything() {
        let mut h = harness();
        feed_scenario(&mut h);
        h.session.handle(ViewerMsg::Command(Command::Previous));
        assert!(h.session.annotations().visible_count() > 0);

        h.session.handle(ViewerMsg::Command(Command::Clear { force: true }));
        assert_eq!(h.session.log().len(), 0);
        assert_eq!(h.session.annotations().visible_count(), 0);
        assert_eq!(h.session.cursor().position(), None);
    }

    #[test]
    fn test_edit_notification_retracts_and_invalidates() {
        let mut h = harness();
        let src = feed_scenario(&mut h);
        h.session.handle(ViewerMsg::Command(Command::Previous));
        assert!(h.session.annotations().visible_count() > 0);

        h.session.handle(ViewerMsg::Edited(src.clone()));
        let rid = h.session.sources.resource_id(&src).unwrap();
        assert_eq!(h.session.annotations().visible_in(rid), 0);
        assert!(!h.session.sources.is_open(rid));
    }

    #[test]
    fn test_edit_notification_for_unknown_path_is_ignored() {
        let mut h = harness();
        feed_scenario(&mut h);
        let unrelated = h.dir.path().join("other.src");
        assert!(h.session.handle(ViewerMsg::Edited(unrelated)));
    }

    #[test]
    fn test_quit_ends_the_session() {
        let mut h = harness();
        assert!(!h.session.handle(ViewerMsg::Command(Command::Quit)));
    }

    #[test]
    fn test_find_definition_handles_both_cases() {
        let mut h = harness();
        feed_scenario(&mut h);
        // tail entry (return of f) recorded no definition
        h.session.handle(ViewerMsg::Command(Command::FindDefinition));
        // first entry recorded one
        while h.session.cursor().position() != Some(0) {
            h.session.handle(ViewerMsg::Command(Command::Previous));
        }
        assert!(h.session.handle(ViewerMsg::Command(Command::FindDefinition)));
    }

    #[test]
    fn test_command_parse_accepts_aliases() {
        assert_eq!(Command::parse("n"), Some(Command::Next));
        assert_eq!(Command::parse("  next "), Some(Command::Next));
        assert_eq!(Command::parse("p"), Some(Command::Previous));
        assert_eq!(Command::parse("u"), Some(Command::UpLevel));
        assert_eq!(Command::parse("def"), Some(Command::FindDefinition));
        assert_eq!(Command::parse("c"), Some(Command::Clear { force: false }));
        assert_eq!(Command::parse("c!"), Some(Command::Clear { force: true }));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("bogus"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[tokio::test]
    async fn test_run_consumes_in_arrival_order() {
        let (tx, rx) = mpsc::channel(16);
        let (wtx, _wrx) = mpsc::channel(16);
        let watcher = ResourceWatcher::new(wtx, Duration::from_millis(100)).unwrap();
        let mut config = Config::default();
        config.view.color = false;
        let mut session = ViewerSession::new(config, watcher, OutputFormat::Plain);

        tx.send(ViewerMsg::Trace(TraceEvent::call("(a)", "a", 0)))
            .await
            .unwrap();
        tx.send(ViewerMsg::Trace(TraceEvent::ret("1", "a", 0)))
            .await
            .unwrap();
        tx.send(ViewerMsg::Command(Command::Quit)).await.unwrap();
        drop(tx);

        session.run(rx).await;
        assert_eq!(session.log().len(), 2);
        assert!(session.log().get(0).unwrap().is_call);
        assert!(!session.log().get(1).unwrap().is_call);
    }
}
