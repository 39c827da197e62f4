//! ADW: agent invocation and event notification for AI developer workflows.
//!
//! This is the main entry point for the `adw` CLI. It parses arguments,
//! initializes logging, builds the shared state (settings and event router),
//! dispatches to the appropriate command handler, and handles errors with
//! proper exit codes.

mod cli;
mod commands;

use adw::exit_codes;
use cli::Cli;
use commands::App;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Environment variable overriding the log filter.
const LOG_ENV: &str = "ADW_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    let result = App::load().and_then(|app| commands::dispatch(cli.command, &app));

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);

            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("adw=debug")
        } else {
            EnvFilter::new("adw=info")
        }
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
