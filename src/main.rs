//! embermon binary entry point.
//!
//! Startup order matters: the watcher is constructed before the terminal
//! enters raw mode so a startup failure prints a normal error and exits 1;
//! once the terminal is acquired, every exit path restores it.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use embermon::cli::Cli;
use embermon::ui::App;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Logs go to stderr; the alternate screen owns stdout.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("embermon=info".parse()?),
        )
        .init();

    let root = std::fs::canonicalize(&args.path)
        .with_context(|| format!("cannot resolve watch path {}", args.path.display()))?;
    let app = App::new(root, &args).context("failed to start watching")?;

    let terminal = ratatui::init();
    let result = app.run(terminal).await;
    ratatui::restore();
    result
}
