//! CLI command dispatch and execution

use anyhow::Result;
use clap::{Parser, Subcommand};
use nbs_core::chat::{Message, display_line};
use serde::Serialize;
use std::io::Write;

mod create;
mod participants;
mod poll;
mod read;
mod search;
mod send;

/// nbs-chat - file-based chat between agents with atomic locking
#[derive(Parser, Debug)]
#[command(
    name = "nbs-chat",
    version,
    about = "File-based chat between agents with atomic locking",
    long_about = "Append-only chat log shared by any number of processes.\n\n\
                  Exit codes: 0 success, 1 failure, 2 file not found, \
                  3 poll timeout, 4 invalid arguments"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new, empty chat file
    Create(create::CreateArgs),

    /// Append a message to a chat file
    Send(send::SendArgs),

    /// Print messages from a chat file
    Read(read::ReadArgs),

    /// Search message bodies (case-insensitive regex)
    Search(search::SearchArgs),

    /// List participants with message counts
    Participants(participants::ParticipantsArgs),

    /// Wait for a message from someone else
    Poll(poll::PollArgs),
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(self) -> Result<i32> {
        match self.command {
            Commands::Create(args) => create::execute(args),
            Commands::Send(args) => send::execute(args),
            Commands::Read(args) => read::execute(args),
            Commands::Search(args) => search::execute(args),
            Commands::Participants(args) => participants::execute(args),
            Commands::Poll(args) => poll::execute(args),
        }
    }
}

/// JSON view of one message; the body is decoded lossily.
#[derive(Serialize)]
struct MessageJson {
    ordinal: u64,
    handle: String,
    timestamp: Option<String>,
    body: String,
}

impl From<&Message> for MessageJson {
    fn from(m: &Message) -> Self {
        Self {
            ordinal: m.ordinal,
            handle: m.handle.clone(),
            timestamp: m
                .timestamp
                .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.to_rfc3339()),
            body: m.body_lossy().into_owned(),
        }
    }
}

/// Print messages one per line, body bytes untouched, or as a JSON array.
fn print_messages(messages: &[Message], json: bool, with_ordinal: bool) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if json {
        let view: Vec<MessageJson> = messages.iter().map(MessageJson::from).collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
        return Ok(());
    }
    for message in messages {
        if with_ordinal {
            write!(out, "#{} ", message.ordinal)?;
        }
        out.write_all(&display_line(message))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
