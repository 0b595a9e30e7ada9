//! Parcel store CLI.
//!
//! # Responsibility
//! - Expose parcel store and service operations for local use.
//! - Own the connection lifecycle: open once per invocation, drop on exit.

use clap::{Parser, ValueEnum};
use parcel_core::{default_log_level, init_logging, GuardStrategy};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "parcel")]
#[command(about = "Parcel tracking store", long_about = None, version)]
struct Cli {
    /// SQLite database file, created and migrated on first use
    #[arg(long, global = true, default_value = "parcel.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Guard used for address changes and deletion
    #[arg(long, global = true, value_enum, default_value_t = GuardArg::Atomic)]
    guard: GuardArg,

    #[command(subcommand)]
    command: commands::Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum GuardArg {
    Atomic,
    ReadCheckWrite,
}

impl From<GuardArg> for GuardStrategy {
    fn from(value: GuardArg) -> Self {
        match value {
            GuardArg::Atomic => GuardStrategy::Atomic,
            GuardArg::ReadCheckWrite => GuardStrategy::ReadCheckWrite,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }

    match commands::execute(&cli.db, cli.guard.into(), cli.command) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
