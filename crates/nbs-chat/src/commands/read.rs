//! Read command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::chat::{ChatLog, ReadFilter};
use nbs_core::error::exit;
use std::path::PathBuf;

use super::print_messages;

/// Print messages from a chat file
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Chat file
    path: PathBuf,

    /// Show only the last N messages
    #[arg(long, value_name = "N", conflicts_with = "unread")]
    last: Option<usize>,

    /// Show messages after the last message from HANDLE
    #[arg(long, value_name = "HANDLE", conflicts_with_all = ["unread", "peek"])]
    since: Option<String>,

    /// Show messages HANDLE has not read yet and mark them read
    #[arg(long, value_name = "HANDLE", conflicts_with = "peek")]
    unread: Option<String>,

    /// Show messages HANDLE has not read yet without marking them
    #[arg(long, value_name = "HANDLE")]
    peek: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Execute the read command
pub fn execute(args: ReadArgs) -> Result<i32> {
    let log = ChatLog::new(&args.path);

    let messages = if let Some(handle) = &args.unread {
        log.unread(handle)?
    } else if let Some(handle) = &args.peek {
        log.peek(handle)?
    } else {
        log.read_filtered(&ReadFilter {
            last: None,
            since: args.since.clone(),
        })?
    };

    let messages = ReadFilter {
        last: args.last,
        since: None,
    }
    .apply(messages);

    print_messages(&messages, args.json, false)?;
    Ok(exit::OK)
}
