//! Send command implementation

use anyhow::Result;
use clap::Args;
use nbs_core::error::exit;
use nbs_core::{BusBridge, ChatLog};
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

/// Append a message to a chat file
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Chat file
    path: PathBuf,

    /// Sender handle
    handle: String,

    /// Message body (passed through byte for byte; may start with `-`)
    #[arg(allow_hyphen_values = true)]
    message: OsString,

    /// Also signal human input on the event queue
    #[arg(long)]
    human: bool,
}

/// Execute the send command
///
/// When an event queue is found near the chat file, the message and its
/// @mentions are published there. Queue problems never fail the send.
pub fn execute(args: SendArgs) -> Result<i32> {
    let body = args.message.into_encoded_bytes();
    let bridge = BusBridge::discover(&args.path);

    let mut log = ChatLog::new(&args.path);
    if let Some(bridge) = &bridge {
        log = log.with_notifier(Arc::new(bridge.clone()));
    }
    let message = log.send(&args.handle, &body)?;
    tracing::debug!(ordinal = message.ordinal, "sent");

    if args.human {
        if let Some(Err(e)) = bridge.map(|b| b.human_input(&args.handle, &body)) {
            tracing::warn!(error = %e, "human-input event not published");
        }
    }
    Ok(exit::OK)
}
