//! The `render` command: one-shot rendering of a recorded stream

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::core::config::Config;
use crate::core::error::Result;
use crate::event::TraceEvent;
use crate::log::{EventLog, Renderer};
use crate::output::{create_formatter, OutputFormat};
use crate::source::SourceStore;

/// Arguments for the render command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    traceview render --input run.jsonl          Colored log to stdout
    traceview render --input run.jsonl --plain  Plain text (piping)
    traceview render --input run.jsonl --json   JSON export")]
pub struct RenderArgs {
    /// Recorded JSON-lines event stream
    #[arg(short, long)]
    pub input: PathBuf,

    /// Plain text without ANSI codes
    #[arg(long, conflicts_with = "json")]
    pub plain: bool,

    /// JSON export of the rendered log
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: RenderArgs) -> Result<()> {
    let config = Config::load()?;
    let format = if args.json {
        OutputFormat::Json
    } else if args.plain || !config.view.color {
        OutputFormat::Plain
    } else {
        OutputFormat::Ansi
    };

    let renderer = Renderer::new(config.view.indent_unit.clone());
    let mut sources = SourceStore::new(&config.source);
    let mut log = EventLog::new();
    let mut skipped: u64 = 0;

    let file = tokio::fs::File::open(&args.input).await?;
    let mut lines = BufReader::new(file).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event = match TraceEvent::decode_line(&line) {
            Ok(event) => event,
            Err(err) => {
                warn!(%err, "skipping undecodable event line");
                skipped += 1;
                continue;
            }
        };
        if let Err(err) = renderer.append(&mut log, &mut sources, &event) {
            warn!(%err, "skipping malformed event");
            skipped += 1;
        }
    }

    let formatter = create_formatter(format);
    print!("{}", formatter.format_log(&log));
    if skipped > 0 {
        eprintln!("skipped {} unusable lines", skipped);
    }
    Ok(())
}
