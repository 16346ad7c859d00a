//! The `view` command: interactive trace viewing

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::error::Result;
use crate::output::OutputFormat;
use crate::viewer::{ingest, ViewerSession};
use crate::watch::ResourceWatcher;

/// Session queue depth; producers briefly block when the operator lags
const QUEUE_DEPTH: usize = 256;

/// Arguments for the view command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:
    traceview view                       Listen on the default socket
    traceview view --socket /tmp/t.sock  Listen on a specific socket
    traceview view --input run.jsonl     Replay a recording, then browse
    traceview view --plain               No ANSI colors")]
pub struct ViewArgs {
    /// Unix socket to listen on (default: $TRACEVIEW_SOCKET or the config home)
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Replay a recorded JSON-lines stream instead of listening
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Disable ANSI colors
    #[arg(long)]
    pub plain: bool,
}

pub async fn run(args: ViewArgs) -> Result<()> {
    let config = Config::load()?;
    let format = if args.plain {
        OutputFormat::Plain
    } else {
        OutputFormat::Ansi
    };

    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    let watcher = ResourceWatcher::new(
        tx.clone(),
        Duration::from_secs(config.watch.poll_interval_secs),
    )?;
    let mut session = ViewerSession::new(config, watcher, format);

    if let Some(input) = &args.input {
        // the session below is the queue's only consumer; a recording longer
        // than QUEUE_DEPTH must drain concurrently, so the pump is a task
        std::fs::metadata(input)?;
        let input = input.clone();
        let replay_tx = tx.clone();
        tokio::spawn(async move {
            if let Err(err) = ingest::replay_events(&input, &replay_tx).await {
                warn!(%err, "replay stopped");
            }
        });
    } else {
        // first run: the socket's parent directory may not exist yet
        Config::ensure_home()?;
        let socket_path = match &args.socket {
            Some(path) => path.clone(),
            None => Config::socket_path()?,
        };
        let listen_tx = tx.clone();
        tokio::spawn(async move {
            if let Err(err) = ingest::listen_events(socket_path, listen_tx).await {
                warn!(%err, "event listener stopped");
            }
        });
    }

    let _reader = ingest::spawn_command_reader(tx);

    tokio::select! {
        _ = session.run(rx) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
        }
    }
    Ok(())
}
