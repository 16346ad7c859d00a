//! Session producers
//!
//! The three sources that feed the session queue:
//!
//! - **event listener**: a Unix socket accepting JSON-lines trace streams
//! - **replay**: a prerecorded JSON-lines file pushed through the same path
//! - **command reader**: operator input from stdin, one command per line
//!
//! Producers decode and forward; all state changes happen in the session.
//! Undecodable lines are transport noise: logged and skipped here so a
//! misbehaving producer cannot wedge the viewer.
//!
//! @module viewer/ingest

use std::path::{Path, PathBuf};

use dialoguer::Confirm;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Command, ViewerMsg};
use crate::core::error::{Error, Result};
use crate::event::TraceEvent;

// =============================================================================
// EVENT LISTENER
// =============================================================================

/// Accept trace-event connections on a Unix socket
///
/// Each connection streams JSON lines; every decoded event goes into the
/// session queue. Runs until the queue closes.
pub async fn listen_events(socket_path: PathBuf, tx: mpsc::Sender<ViewerMsg>) -> Result<()> {
    // Remove old socket if exists
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    let listener = UnixListener::bind(&socket_path)?;
    info!(socket = %socket_path.display(), "listening for trace events");

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut lines = BufReader::new(stream).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        if !forward_line(&line, &tx).await {
                            break;
                        }
                    }
                    debug!("trace connection closed");
                });
            }
            Err(e) => {
                warn!("accept error: {}", e);
            }
        }
        if tx.is_closed() {
            break;
        }
    }

    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }
    Ok(())
}

/// Replay a recorded JSON-lines event stream into the queue
///
/// Returns the number of events forwarded.
pub async fn replay_events(path: &Path, tx: &mpsc::Sender<ViewerMsg>) -> Result<usize> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut forwarded = 0;
    while let Some(line) = lines.next_line().await? {
        if forward_line(&line, tx).await {
            forwarded += 1;
        } else if tx.is_closed() {
            return Err(Error::ViewerError {
                message: "session queue closed during replay".to_string(),
            });
        }
    }
    info!(count = forwarded, file = %path.display(), "replayed recorded events");
    Ok(forwarded)
}

/// Decode one wire line and send it on; false when nothing was forwarded
async fn forward_line(line: &str, tx: &mpsc::Sender<ViewerMsg>) -> bool {
    if line.trim().is_empty() {
        return false;
    }
    match TraceEvent::decode_line(line) {
        Ok(event) => tx.send(ViewerMsg::Trace(event)).await.is_ok(),
        Err(err) => {
            warn!(%err, "skipping undecodable event line");
            false
        }
    }
}

// =============================================================================
// COMMAND READER
// =============================================================================

/// Read operator commands from stdin on a dedicated thread
///
/// Parsing and the clear confirmation live here, at the surface: the
/// session never prompts. An unforced clear is forwarded only after the
/// operator confirms it.
pub fn spawn_command_reader(tx: mpsc::Sender<ViewerMsg>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            let Some(command) = Command::parse(&line) else {
                println!("Unknown command: {} (h for help)", line.trim());
                continue;
            };
            let command = match command {
                Command::Clear { force: false } => {
                    if confirm_clear() {
                        Command::Clear { force: true }
                    } else {
                        println!("Log kept");
                        continue;
                    }
                }
                other => other,
            };
            let quit = command == Command::Quit;
            if tx.blocking_send(ViewerMsg::Command(command)).is_err() {
                break;
            }
            if quit {
                break;
            }
        }
        debug!("command reader finished");
    })
}

fn confirm_clear() -> bool {
    Confirm::new()
        .with_prompt("Clear the trace log and all annotations?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

// =============================================================================
// TESTS
// =============================================================================
