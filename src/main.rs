//! taskdb - plain-text task storage CLI
//!
//! Adds, modifies and inspects task records kept in a task data directory.

use clap::Parser;
use taskdb::cli::Cli;
use taskdb::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let command = infer_command_name_from_args();
    let cli = Cli::parse();

    // Tracing is opt-in via RUST_LOG, or the `debug` config flag.
    // Keep startup robust in CI envs: ignore invalid/huge filters.
    let debug = cli.load_config().map(|config| config.debug).unwrap_or(false);
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(if debug { "taskdb=debug" } else { "off" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
