//! Traceview CLI entry point

use clap::Parser;
use traceview::cli::{Cli, Commands};
use traceview::core::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("TRACEVIEW_LOG"))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::View(args) => traceview::cli::view::run(args).await,
        Commands::Render(args) => traceview::cli::render::run(args).await,
    }
}
