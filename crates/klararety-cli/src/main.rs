#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;
mod render;
mod terminal;

use std::process;

use crate::commands::App;
use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "klararety_cli::startup";
pub const TRACING_TARGET_CONFIG: &str = "klararety_cli::config";
pub const TRACING_TARGET_COMMAND: &str = "klararety_cli::command";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    tracing::debug!(
        target: TRACING_TARGET_COMMAND,
        error = ?error,
        "command failed"
    );
    eprintln!("Error: {error:#}");
    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();
    Cli::init_tracing()?;
    cli.log();
    cli.validate()?;

    let app = App::new(&cli)?;
    let result = commands::execute(&app, cli.command).await;
    app.dispose();
    result
}
