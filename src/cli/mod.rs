//! CLI command definitions and handlers

pub mod render;
pub mod view;

use clap::{Parser, Subcommand};

const LONG_ABOUT: &str = r#"
████████╗██████╗  █████╗  ██████╗███████╗██╗   ██╗██╗███████╗██╗    ██╗
╚══██╔══╝██╔══██╗██╔══██╗██╔════╝██╔════╝██║   ██║██║██╔════╝██║    ██║
   ██║   ██████╔╝███████║██║     █████╗  ██║   ██║██║█████╗  ██║ █╗ ██║
   ██║   ██╔══██╗██╔══██║██║     ██╔══╝  ╚██╗ ██╔╝██║██╔══╝  ██║███╗██║
   ██║   ██║  ██║██║  ██║╚██████╗███████╗ ╚████╔╝ ██║███████╗╚███╔███╔╝
   ╚═╝   ╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝╚══════╝  ╚═══╝  ╚═╝╚══════╝ ╚══╝╚══╝

Hierarchical trace viewer for instrumented programs.

QUICK START:
    1. traceview view               Listen for trace events on the socket
    2. point your tracer at it      One JSON event per line
    3. navigate with n/p/u          Annotations follow the caller chain

VIEWING:
    traceview view                  Interactive viewer (socket ingest)
    traceview view --input f.jsonl  Replay a recorded stream, then browse
    traceview view --plain          No colors (dumb terminals, piping)

IN-SESSION COMMANDS:
    n/next  p/prev  u/up            Move through the call hierarchy
    d/def                           Jump to the entry's definition
    c/clear  c!/clear!              Wipe the log (c! skips the prompt)
    h/help  q/quit

ONE-SHOT RENDERING:
    traceview render --input f.jsonl           Colored log to stdout
    traceview render --input f.jsonl --plain   Plain text
    traceview render --input f.jsonl --json    JSON export for tooling

EXAMPLES:
    traceview view --socket /tmp/tv.sock       Custom socket path
    TRACEVIEW_LOG=debug traceview view         Verbose internal logging
    traceview render --input run.jsonl --json | jq '.[].identifier'
"#;

/// Hierarchical trace viewer
#[derive(Parser, Debug)]
#[command(name = "traceview")]
#[command(author, version)]
#[command(about = "Hierarchical trace viewer for instrumented programs")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the interactive trace viewer
    #[command(visible_alias = "v")]
    View(view::ViewArgs),

    /// Render a recorded event stream to stdout and exit
    #[command(visible_alias = "r")]
    Render(render::RenderArgs),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_view() {
        let cli = Cli::try_parse_from(["traceview", "view", "--plain"]).unwrap();
        match cli.command {
            Commands::View(args) => {
                assert!(args.plain);
                assert!(args.input.is_none());
                assert!(args.socket.is_none());
            }
            _ => panic!("expected view"),
        }
    }

    #[test]
    fn test_cli_parses_render_formats() {
        let cli =
            Cli::try_parse_from(["traceview", "render", "--input", "run.jsonl", "--json"]).unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert!(args.json);
                assert!(!args.plain);
                assert_eq!(args.input.to_str(), Some("run.jsonl"));
            }
            _ => panic!("expected render"),
        }
    }

    #[test]
    fn test_render_requires_input() {
        assert!(Cli::try_parse_from(["traceview", "render"]).is_err());
    }

    #[test]
    fn test_render_formats_conflict() {
        assert!(Cli::try_parse_from([
            "traceview", "render", "--input", "f.jsonl", "--plain", "--json"
        ])
        .is_err());
    }
}
