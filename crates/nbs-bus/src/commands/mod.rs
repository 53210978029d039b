//! CLI command dispatch and execution

use anyhow::Result;
use clap::{Parser, Subcommand};

mod ack;
mod ack_all;
mod check;
mod prune;
mod publish;
mod read;
mod status;

/// nbs-bus - priority event queue backed by one file per event
#[derive(Parser, Debug)]
#[command(
    name = "nbs-bus",
    version,
    about = "Priority event queue backed by one file per event",
    long_about = "Publish, list, acknowledge and prune events in a queue directory.\n\n\
                  Exit codes: 0 success, 1 failure, 2 queue directory not found, \
                  3 event not found, 4 invalid arguments, 5 duplicate dropped"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a new event into the queue
    Publish(publish::PublishArgs),

    /// List pending events, most urgent first
    Check(check::CheckArgs),

    /// Print the raw content of a pending event
    Read(read::ReadArgs),

    /// Move a pending event to processed/
    Ack(ack::AckArgs),

    /// Acknowledge every pending event
    AckAll(ack_all::AckAllArgs),

    /// Show queue counts and processed/ usage
    Status(status::StatusArgs),

    /// Delete the oldest processed events to fit a byte budget
    Prune(prune::PruneArgs),
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(self) -> Result<i32> {
        match self.command {
            Commands::Publish(args) => publish::execute(args),
            Commands::Check(args) => check::execute(args),
            Commands::Read(args) => read::execute(args),
            Commands::Ack(args) => ack::execute(args),
            Commands::AckAll(args) => ack_all::execute(args),
            Commands::Status(args) => status::execute(args),
            Commands::Prune(args) => prune::execute(args),
        }
    }
}

/// Byte count as kilobytes with one decimal, e.g. `12.5 KB`.
fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}
