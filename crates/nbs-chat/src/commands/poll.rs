//! Poll command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::error::exit;
use nbs_core::{ChatLog, PollOutcome};
use std::path::PathBuf;
use std::time::Duration;

use super::print_messages;

/// Wait for a message from someone other than HANDLE
#[derive(Args, Debug)]
pub struct PollArgs {
    /// Chat file
    path: PathBuf,

    /// Your own handle; your messages never end the wait
    handle: String,

    /// Seconds to wait before giving up (exit code 3)
    #[arg(long, default_value_t = 10, value_name = "SECONDS")]
    timeout: u64,
}

/// Execute the poll command
pub fn execute(args: PollArgs) -> Result<i32> {
    let log = ChatLog::new(&args.path);
    match log.poll(&args.handle, Duration::from_secs(args.timeout))? {
        PollOutcome::Messages(messages) => {
            print_messages(&messages, false, false)?;
            Ok(exit::OK)
        }
        PollOutcome::TimedOut => Ok(exit::ITEM_NOT_FOUND),
    }
}
