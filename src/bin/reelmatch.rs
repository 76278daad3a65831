//! Reelmatch CLI binary.

use std::io::Write;
use std::process;

use anyhow::Context;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;

use reelmatch::cli::args::*;
use reelmatch::cli::commands::*;
use reelmatch::error::ReelmatchError;

/// Exit status for an error that only concerns the request (unknown title,
/// invalid request).
const EXIT_REQUEST_ERROR: i32 = 2;

fn run(args: ReelmatchArgs) -> anyhow::Result<()> {
    let command = args.command.name();
    execute_command(args).with_context(|| format!("reelmatch {command} failed"))
}

fn main() {
    let args = ReelmatchArgs::parse();

    let log_level = match args.verbosity() {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    Builder::new()
        .filter_level(log_level)
        .parse_env("REELMATCH_LOG")
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        let recoverable = e
            .downcast_ref::<ReelmatchError>()
            .is_some_and(ReelmatchError::is_recoverable);
        process::exit(if recoverable { EXIT_REQUEST_ERROR } else { 1 });
    }
}
